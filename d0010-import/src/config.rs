use serde::Deserialize;
use std::{fs, path::Path};

pub const CONFIG_ENV: &str = "D0010_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "d0010-import.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    /// Process-local store; nothing outlives the run.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    pub uri: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Extension (without the dot) of files picked up in directory mode.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Files imported concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

fn default_max_connections() -> u32 {
    5
}

fn default_extension() -> String {
    "uff".to_string()
}

fn default_workers() -> usize {
    1
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            uri: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            workers: default_workers(),
        }
    }
}

impl AppConfig {
    /// Reads `$D0010_CONFIG`, else `d0010-import.toml`. Without an explicit
    /// path and without the default file, built-in defaults apply.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let (path, explicit) = match env::var(CONFIG_ENV) {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };
        if !explicit && !Path::new(&path).exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.import.workers == 0 {
            anyhow::bail!("import.workers must be at least 1");
        }
        if self.import.extension.is_empty() {
            anyhow::bail!("import.extension must not be empty");
        }
        if self.store.kind == StoreKind::Postgres {
            if self.store.uri.is_none() {
                anyhow::bail!("store.uri is required when store.kind = \"postgres\"");
            }
            // Each worker holds a transaction connection and resolves meters
            // on another one.
            if (self.store.max_connections as usize) <= self.import.workers {
                anyhow::bail!(
                    "store.max_connections ({}) must exceed import.workers ({})",
                    self.store.max_connections,
                    self.import.workers
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [store]
            kind = "postgres"
            uri = "postgres://localhost/meter_readings"
            max_connections = 5

            [import]
            extension = "dat"
            workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(cfg.store.kind, StoreKind::Postgres);
        assert_eq!(cfg.store.uri.as_deref(), Some("postgres://localhost/meter_readings"));
        assert_eq!(cfg.store.max_connections, 5);
        assert_eq!(cfg.import.extension, "dat");
        assert_eq!(cfg.import.workers, 4);
    }

    #[test]
    fn memory_store_needs_no_uri() {
        let cfg = AppConfig::from_toml_str("[store]\nkind = \"memory\"\n").unwrap();

        assert_eq!(cfg.store.kind, StoreKind::Memory);
        assert_eq!(cfg.import.extension, "uff");
        assert_eq!(cfg.import.workers, 1);
    }

    #[test]
    fn postgres_store_requires_uri() {
        assert!(AppConfig::from_toml_str("[store]\nkind = \"postgres\"\n").is_err());
    }

    #[test]
    fn postgres_pool_must_exceed_workers() {
        let toml = "[store]\nuri = \"postgres://localhost/db\"\nmax_connections = 4\n[import]\nworkers = 4\n";
        assert!(AppConfig::from_toml_str(toml).is_err());

        let toml = "[store]\nuri = \"postgres://localhost/db\"\nmax_connections = 5\n[import]\nworkers = 4\n";
        assert!(AppConfig::from_toml_str(toml).is_ok());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let toml = "[store]\nkind = \"memory\"\n[import]\nworkers = 0\n";
        assert!(AppConfig::from_toml_str(toml).is_err());
    }
}
