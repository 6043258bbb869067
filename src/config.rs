use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_geocoding_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Fixed place → country answers, consulted before the provider.
    #[serde(default)]
    pub places: HashMap<String, String>,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_geocoding_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            min_interval_ms: default_min_interval_ms(),
            places: HashMap::new(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_geocoding_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_user_agent() -> String {
    "de_cricsheet".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_min_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Abort the whole sync on the first record that fails to parse.
    #[serde(default)]
    pub fail_fast: bool,
    /// Parsed matches buffered between the parser and the sink writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    16
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate geocoding
    match config.geocoding.provider.as_str() {
        "disabled" | "static" | "nominatim" => {}
        other => anyhow::bail!(
            "Unknown geocoding provider: '{}'. Must be disabled, static, or nominatim.",
            other
        ),
    }

    if config.geocoding.provider == "nominatim" && config.geocoding.user_agent.trim().is_empty() {
        anyhow::bail!("geocoding.user_agent must be set when provider is 'nominatim'");
    }

    if config.geocoding.timeout_secs == 0 {
        anyhow::bail!("geocoding.timeout_secs must be > 0");
    }

    // Validate ingest
    if config.ingest.channel_capacity == 0 {
        anyhow::bail!("ingest.channel_capacity must be > 0");
    }

    if config.source.include_globs.is_empty() {
        anyhow::bail!("source.include_globs must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let file = write_config(
            r#"
[db]
path = "./data/cricsheet.sqlite"

[source]
root = "./data/matches"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.source.include_globs, vec!["**/*.json"]);
        assert_eq!(config.geocoding.provider, "disabled");
        assert_eq!(config.geocoding.user_agent, "de_cricsheet");
        assert!(config.geocoding.places.is_empty());
        assert!(!config.ingest.fail_fast);
        assert_eq!(config.ingest.channel_capacity, 16);
    }

    #[test]
    fn test_static_places_table() {
        let file = write_config(
            r#"
[db]
path = "x.sqlite"

[source]
root = "."

[geocoding]
provider = "static"

[geocoding.places]
"Nairobi" = "Kenya"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.geocoding.provider, "static");
        assert_eq!(config.geocoding.places["Nairobi"], "Kenya");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let file = write_config(
            r#"
[db]
path = "x.sqlite"

[source]
root = "."

[geocoding]
provider = "google"
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown geocoding provider"));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_config(Path::new("/nope/crick.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
