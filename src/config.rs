use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the Gemini API key. Read by both the
/// embedding and chat providers; also satisfied by a `.env` file.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Directory of formatted scrape records, one JSON object per file.
    pub pages_dir: PathBuf,
    /// Optional curated research summary appended to the corpus.
    #[serde(default)]
    pub research_file: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_chars: default_window_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_window_chars() -> usize {
    1500
}
fn default_overlap_chars() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of paraphrased query variants to request on top of the
    /// original question. Zero disables expansion.
    #[serde(default = "default_variants")]
    pub variants: usize,
    /// Top-k chunks fetched per variant before fusion.
    #[serde(default = "default_per_variant_k")]
    pub per_variant_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            variants: default_variants(),
            per_variant_k: default_per_variant_k(),
        }
    }
}

fn default_variants() -> usize {
    3
}
fn default_per_variant_k() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            embed_model: default_embed_model(),
            chat_model: default_chat_model(),
            dims: default_dims(),
            temperature: default_temperature(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embed_model() -> String {
    "embedding-001".to_string()
}
fn default_chat_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_dims() -> usize {
    768
}
fn default_temperature() -> f64 {
    0.1
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// Organization the assistant speaks for. Substituted into the
    /// grounding prompt wherever the original question says "the company".
    pub org_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.window_chars == 0 {
        anyhow::bail!("chunking.window_chars must be > 0");
    }

    if config.chunking.overlap_chars >= config.chunking.window_chars {
        anyhow::bail!(
            "chunking.overlap_chars ({}) must be < chunking.window_chars ({})",
            config.chunking.overlap_chars,
            config.chunking.window_chars
        );
    }

    // Validate retrieval
    if config.retrieval.per_variant_k == 0 {
        anyhow::bail!("retrieval.per_variant_k must be >= 1");
    }

    // Validate gemini
    if config.gemini.dims == 0 {
        anyhow::bail!("gemini.dims must be > 0");
    }

    if config.gemini.batch_size == 0 {
        anyhow::bail!("gemini.batch_size must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.gemini.temperature) {
        anyhow::bail!("gemini.temperature must be in [0.0, 2.0]");
    }

    // Validate synthesis
    if config.synthesis.org_name.trim().is_empty() {
        anyhow::bail!("synthesis.org_name must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Smallest config that passes validation: only the required fields.
    const MINIMAL: &str = r#"
[corpus]
pages_dir = "./pages"

[synthesis]
org_name = "Acme Advisory"
"#;

    fn load(toml_body: &str) -> Result<Config> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cchat.toml");
        fs::write(&path, toml_body).unwrap();
        load_config(&path)
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.corpus.include_globs, vec!["*.json".to_string()]);
        assert!(config.corpus.research_file.is_none());
        assert_eq!(config.chunking.window_chars, 1500);
        assert_eq!(config.chunking.overlap_chars, 300);
        assert_eq!(config.retrieval.variants, 3);
        assert_eq!(config.retrieval.per_variant_k, 6);
        assert_eq!(config.gemini.embed_model, "embedding-001");
        assert_eq!(config.gemini.chat_model, "gemini-2.0-flash");
        assert_eq!(config.gemini.dims, 768);
        assert_eq!(config.gemini.temperature, 0.1);
        assert_eq!(config.gemini.batch_size, 64);
        assert_eq!(config.gemini.timeout_secs, 30);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_zero_variants_accepted() {
        let config = load(&format!("{MINIMAL}[retrieval]\nvariants = 0\n")).unwrap();
        assert_eq!(config.retrieval.variants, 0);
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = load(&format!("{MINIMAL}[chunking]\nwindow_chars = 0\n")).unwrap_err();
        assert!(err.to_string().contains("window_chars"));
    }

    #[test]
    fn test_overlap_must_stay_below_window() {
        let err = load(&format!(
            "{MINIMAL}[chunking]\nwindow_chars = 200\noverlap_chars = 200\n"
        ))
        .unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }

    #[test]
    fn test_zero_per_variant_k_rejected() {
        let err = load(&format!("{MINIMAL}[retrieval]\nper_variant_k = 0\n")).unwrap_err();
        assert!(err.to_string().contains("per_variant_k"));
    }

    #[test]
    fn test_zero_dims_rejected() {
        let err = load(&format!("{MINIMAL}[gemini]\ndims = 0\n")).unwrap_err();
        assert!(err.to_string().contains("dims"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = load(&format!("{MINIMAL}[gemini]\nbatch_size = 0\n")).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_temperature_outside_range_rejected() {
        let err = load(&format!("{MINIMAL}[gemini]\ntemperature = 2.5\n")).unwrap_err();
        assert!(err.to_string().contains("temperature"));

        let err = load(&format!("{MINIMAL}[gemini]\ntemperature = -0.1\n")).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_blank_org_name_rejected() {
        let err = load(
            r#"
[corpus]
pages_dir = "./pages"

[synthesis]
org_name = "   "
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("org_name"));
    }
}
