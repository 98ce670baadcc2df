//! # Corpus Chat
//!
//! A retrieval-backed chat assistant for a scraped website corpus.
//!
//! Corpus Chat loads scraped pages and research notes from disk, chunks and
//! embeds them into an in-memory vector index, and answers questions about
//! the organization over a WebSocket chat endpoint. Every answer is grounded
//! in retrieved corpus text: the question is expanded into several query
//! variants, each variant is searched concurrently, the hits are fused, and
//! a chat model synthesizes an answer from the fused evidence only.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────┐
//! │   Corpus    │──▶│  Pipeline   │──▶│ In-memory │
//! │ pages+notes │   │ Chunk+Embed │   │ vec index │
//! └─────────────┘   └─────────────┘   └─────┬─────┘
//!                                           │
//!                 ┌────────────┬────────────┤
//!                 ▼            ▼            ▼
//!            ┌─────────┐ ┌──────────┐ ┌───────────┐
//!            │ Expand  │▶│ Retrieve │▶│ Synthesis │
//!            └─────────┘ └──────────┘ └───────────┘
//!                                           │
//!                         ┌─────────────────┤
//!                         ▼                 ▼
//!                    ┌──────────┐     ┌───────────┐
//!                    │   CLI    │     │ WebSocket │
//!                    │ (cchat)  │     │   (/ws)   │
//!                    └──────────┘     └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GOOGLE_API_KEY=...         # or put it in .env
//! cchat corpus                      # inspect the scraped corpus
//! cchat ask "What services do you offer?"
//! cchat serve                      # start the WebSocket chat server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and fixed chat texts |
//! | [`corpus`] | Scraped corpus loading |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Chat model abstraction |
//! | [`index`] | In-memory cosine-similarity vector index |
//! | [`expand`] | Multi-query expansion |
//! | [`retrieve`] | Concurrent retrieval and evidence fusion |
//! | [`synthesis`] | Grounded answer synthesis |
//! | [`pipeline`] | End-to-end question answering |
//! | [`session`] | Per-connection chat sessions |
//! | [`server`] | WebSocket and health HTTP server |

pub mod ask;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod expand;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod server;
pub mod session;
pub mod stats;
pub mod synthesis;
