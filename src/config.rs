use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DossierConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub primary_db_path: String,
    pub mirror_db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub api_base: String,
    pub path: String,
    pub model: String,
    /// Env var holding the API key. Read at provider construction, not stored.
    pub api_key_env: String,
    pub dimensions: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_results: usize,
    pub profile_limit: usize,
}

/// Static bearer tokens mapped to user ids. Authentication proper is an
/// external collaborator; this is only the consumption side.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: HashMap<String, String>,
}

impl Default for DossierConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7040,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_dossier_dir();
        Self {
            primary_db_path: dir.join("primary.db").to_string_lossy().into_owned(),
            mirror_db_path: dir.join("mirror.db").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "remote".into(),
            api_base: "https://api.openai.com".into(),
            path: "/v1/embeddings".into(),
            model: "text-embedding-3-small".into(),
            api_key_env: "DOSSIER_EMBED_API_KEY".into(),
            dimensions: 768,
            timeout_ms: 10_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            profile_limit: 5,
        }
    }
}

/// Returns `~/.dossier/`
pub fn default_dossier_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".dossier")
}

/// Returns the default config file path: `~/.dossier/config.toml`
pub fn default_config_path() -> PathBuf {
    default_dossier_dir().join("config.toml")
}

impl DossierConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            DossierConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (DOSSIER_PRIMARY_DB, DOSSIER_MIRROR_DB,
    /// DOSSIER_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOSSIER_PRIMARY_DB") {
            self.storage.primary_db_path = val;
        }
        if let Ok(val) = std::env::var("DOSSIER_MIRROR_DB") {
            self.storage.mirror_db_path = val;
        }
        if let Ok(val) = std::env::var("DOSSIER_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the primary store path, expanding `~` if needed.
    pub fn resolved_primary_path(&self) -> PathBuf {
        expand_tilde(&self.storage.primary_db_path)
    }

    /// Resolve the mirror store path, expanding `~` if needed.
    pub fn resolved_mirror_path(&self) -> PathBuf {
        expand_tilde(&self.storage.mirror_db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DossierConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.retrieval.max_results, 10);
        assert_eq!(config.retrieval.profile_limit, 5);
        assert!(config.storage.primary_db_path.ends_with("primary.db"));
        assert!(config.storage.mirror_db_path.ends_with("mirror.db"));
        assert!(config.auth.tokens.is_empty());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"
port = 9000

[storage]
primary_db_path = "/tmp/p.db"
mirror_db_path = "/tmp/m.db"

[embedding]
model = "text-embedding-3-large"
dimensions = 1536

[auth.tokens]
"secret-token" = "user-1"
"#;
        let config: DossierConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.primary_db_path, "/tmp/p.db");
        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.auth.tokens["secret-token"], "user-1");
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.max_results, 10);
        assert_eq!(config.embedding.provider, "remote");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = DossierConfig::default();
        std::env::set_var("DOSSIER_PRIMARY_DB", "/tmp/override-p.db");
        std::env::set_var("DOSSIER_MIRROR_DB", "/tmp/override-m.db");
        std::env::set_var("DOSSIER_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.primary_db_path, "/tmp/override-p.db");
        assert_eq!(config.storage.mirror_db_path, "/tmp/override-m.db");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("DOSSIER_PRIMARY_DB");
        std::env::remove_var("DOSSIER_MIRROR_DB");
        std::env::remove_var("DOSSIER_LOG_LEVEL");
    }
}
