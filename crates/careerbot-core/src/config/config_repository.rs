use std::path::{Path, PathBuf};

use tracing::debug;

use super::client_config::ClientConfig;
use super::error::{ConfigError, ConfigResult};
use crate::BoxFuture;

pub trait ConfigRepository: Send + Sync + 'static {
    /// Load the configuration, falling back to defaults when nothing is stored
    fn load(&self) -> BoxFuture<'static, ConfigResult<ClientConfig>>;

    /// Save the configuration
    fn save(&self, config: ClientConfig) -> BoxFuture<'static, ConfigResult<()>>;

    /// Get the storage path (for diagnostics)
    fn storage_path(&self) -> String;
}

pub struct JsonConfigRepository {
    file_path: PathBuf,
}

impl JsonConfigRepository {
    /// Create repository with XDG-compliant path
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Path("Cannot determine config directory".into()))?;

        Ok(Self {
            file_path: config_dir.join("careerbot").join("config.json"),
        })
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigRepository for JsonConfigRepository {
    fn load(&self) -> BoxFuture<'static, ConfigResult<ClientConfig>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            if !tokio::fs::try_exists(&path).await? {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(ClientConfig::default());
            }

            let contents = tokio::fs::read_to_string(&path).await?;
            let config: ClientConfig = serde_json::from_str(&contents)?;
            config.validate()?;

            debug!(path = %path.display(), base_url = %config.base_url, "Loaded config");
            Ok(config)
        })
    }

    fn save(&self, config: ClientConfig) -> BoxFuture<'static, ConfigResult<()>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            config.validate()?;
            let json = serde_json::to_string_pretty(&config)?;

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            // Write atomically using temp file + rename
            let temp_path = path.with_extension("json.tmp");
            tokio::fs::write(&temp_path, &json).await?;
            tokio::fs::rename(&temp_path, &path).await?;

            Ok(())
        })
    }

    fn storage_path(&self) -> String {
        self.file_path.display().to_string()
    }
}
