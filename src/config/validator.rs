use crate::config::{Config, HttpConfig, MinecraftConfig};
use crate::error::{Error, Result};

/// Validates the Minecraft template settings
pub fn validate_minecraft_config(config: &MinecraftConfig) -> Result<()> {
    if config.download_url.trim().is_empty() {
        return Err(Error::ConfigInvalid("minecraft.downloadUrl is empty".to_string()));
    }

    if config.java_command.trim().is_empty() {
        return Err(Error::ConfigInvalid("minecraft.javaCommand is empty".to_string()));
    }

    if config.stop_timeout_secs == 0 {
        return Err(Error::ConfigInvalid(
            "minecraft.stopTimeoutSecs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates the HTTP API settings
pub fn validate_http_config(config: &HttpConfig) -> Result<()> {
    if config.port == 0 {
        return Err(Error::ConfigInvalid("http.port must not be 0".to_string()));
    }

    if config.workers == Some(0) {
        return Err(Error::ConfigInvalid("http.workers must not be 0".to_string()));
    }

    if let Some(token) = config.bearer_token() {
        if token.trim().is_empty() {
            return Err(Error::ConfigInvalid(
                "http.authenticate.bearer.token is empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    if config.servers_dir.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("serversDir is empty".to_string()));
    }

    if config.state_file.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("stateFile is empty".to_string()));
    }

    if config.reconcile_interval_secs == 0 {
        return Err(Error::ConfigInvalid(
            "reconcileIntervalSecs must be greater than zero".to_string(),
        ));
    }

    validate_minecraft_config(&config.minecraft)?;
    validate_http_config(&config.http)?;

    Ok(())
}
