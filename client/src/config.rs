use std::env::VarError;
#[cfg(not(unix))]
use std::fs::File;
#[cfg(unix)]
use std::fs::{DirBuilder, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dirs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthInfo {
    token: Option<String>,
    refresh_token: Option<String>,
    #[serde(skip)]
    env_token: Option<String>,
}

impl AuthInfo {
    pub fn new(token: Option<String>, refresh_token: Option<String>) -> Self {
        Self { token, refresh_token, env_token: None }
    }

    /// Access token applied to requests. A token set in the environment wins
    /// over the persisted one.
    pub fn token(&self) -> Option<&str> {
        let env_token = self.env_token.as_deref().filter(|token| !token.is_empty());
        let token = self.token.as_deref().filter(|token| !token.is_empty());
        env_token.or(token)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }

    pub fn set_tokens(&mut self, token: String, refresh_token: String) {
        self.token = Some(token);
        self.refresh_token = Some(refresh_token);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub connection: ConnectionInfo,
    pub auth_info: AuthInfo,
    #[serde(skip)]
    ignore_certs_cli: bool,
    #[serde(deserialize_with = "default_option_bool")]
    ignore_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connection: ConnectionInfo { uri: "http://localhost:8989".into() },
            auth_info: AuthInfo::default(),
            ignore_certs_cli: false,
            ignore_certs: false,
        }
    }
}

impl Config {
    /// Check if certificates should be ignored.
    pub fn ignore_certs(&self) -> bool {
        self.ignore_certs_cli || self.ignore_certs
    }

    /// Set the caller's `--no-check-certificate` override value.
    pub fn set_ignore_certs_cli(&mut self, ignore_certs_cli: bool) {
        self.ignore_certs_cli = ignore_certs_cli;
    }
}

fn default_option_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// Atomically overwrite the configuration file.
#[cfg(unix)]
pub fn save_config<T>(path: &Path, config: &T) -> Result<()>
where
    T: Serialize,
{
    let yaml = serde_yaml::to_string(config)?;

    // Ensure config directory and its parents exist.
    let config_dir = path.parent().ok_or_else(|| anyhow!("config path is a directory"))?;
    DirBuilder::new().recursive(true).mode(0o700).create(config_dir)?;

    // The temporary file must live in the target directory; fs::rename fails
    // when the settings directory sits on a different device than tmpfs.
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("invalid config name"))?;
    let tmp_path = config_dir.join(format!(".{file_name}.new"));

    // Create the temporary file for the new config.
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(&tmp_path)?;

    // Write new config to the temporary file.
    file.write_all(yaml.as_bytes())?;

    // Atomically move the new config into place.
    fs::rename(tmp_path, path)?;

    Ok(())
}

/// Unatomically overwrite the configuration file.
#[cfg(not(unix))]
pub fn save_config<T>(path: &Path, config: &T) -> Result<()>
where
    T: Serialize,
{
    let yaml = serde_yaml::to_string(config)?;

    // Ensure config directory and its parents exist.
    let config_dir = path.parent().ok_or_else(|| anyhow!("config path is a directory"))?;
    fs::create_dir_all(config_dir)?;

    // Write new configuration to the file.
    let mut file = File::create(path)?;
    file.write_all(yaml.as_bytes())?;

    Ok(())
}

pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str::<T>(&contents)?)
}

pub fn read_configuration(path: &Path) -> Result<Config> {
    let mut config: Config = match parse_config(path) {
        Ok(c) => c,
        Err(orig_err) => match orig_err.downcast_ref::<io::Error>() {
            Some(e) if e.kind() == io::ErrorKind::NotFound => Config::default(),
            _ => return Err(orig_err),
        },
    };

    // Store API token set in environment.
    match env::var("YEMA_TOKEN") {
        Ok(token) if !token.is_empty() => {
            config.auth_info.env_token = Some(token);
        },
        Ok(_) => log::warn!("Ignoring empty YEMA_TOKEN"),
        Err(VarError::NotUnicode(_)) => log::warn!("Ignoring invalid YEMA_TOKEN"),
        Err(VarError::NotPresent) => (),
    }

    Ok(config)
}

pub fn get_home_settings_path() -> Result<PathBuf> {
    let config_path = dirs::config_dir()?.join("yema").join("settings.yaml");
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    const CONFIG_TOKEN: &str = "FAKE TOKEN";
    const ENV_TOKEN: &str = "ENV TOKEN";

    fn write_test_config(path: &Path) {
        let con = ConnectionInfo { uri: "http://127.0.0.1".into() };

        let auth = AuthInfo {
            token: Some(CONFIG_TOKEN.into()),
            refresh_token: Some("FAKE REFRESH TOKEN".into()),
            env_token: Some(ENV_TOKEN.into()),
        };

        let config = Config {
            connection: con,
            auth_info: auth,
            ignore_certs_cli: false,
            ignore_certs: false,
        };
        save_config(path, &config).unwrap();
    }

    #[test]
    fn write_config_works() {
        let tempfile = NamedTempFile::new().unwrap();
        write_test_config(tempfile.path());
    }

    #[test]
    fn write_parses_identical() {
        let tempfile = NamedTempFile::new().unwrap();
        write_test_config(tempfile.path());
        let config: Config = parse_config(tempfile.path()).unwrap();
        assert_eq!(config.connection.uri, "http://127.0.0.1");
    }

    #[test]
    fn write_ignores_env() {
        let tempfile = NamedTempFile::new().unwrap();
        write_test_config(tempfile.path());
        let config: Config = parse_config(tempfile.path()).unwrap();
        assert_eq!(config.auth_info.token(), Some(CONFIG_TOKEN));
        assert_eq!(config.auth_info.env_token, None);
    }

    #[test]
    fn prefer_env_token() {
        let auth = AuthInfo {
            token: Some(CONFIG_TOKEN.into()),
            refresh_token: None,
            env_token: Some(ENV_TOKEN.into()),
        };
        assert_eq!(auth.token(), Some(ENV_TOKEN));
    }

    #[test]
    fn empty_tokens_count_as_absent() {
        let auth = AuthInfo { token: Some(String::new()), refresh_token: None, env_token: None };
        assert_eq!(auth.token(), None);
        assert_eq!(auth.refresh_token(), None);
    }
}
