use crate::config::error::ConfigError;
use log::info;
use std::io;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "chillhours";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .ok_or(ConfigError::ConfigDirResolution)
        .map(|p| p.join(CONFIG_DIR_NAME))
}

pub fn get_config_file() -> Result<PathBuf, ConfigError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

pub async fn ensure_dir_exists(path: &Path) -> Result<(), ConfigError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::ConfigDirCreation(
            path.to_path_buf(),
            io::Error::new(io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating configuration directory: {}", path.display());
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| ConfigError::ConfigDirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(ConfigError::ConfigDirCreation(path.to_path_buf(), e)),
    }
}
