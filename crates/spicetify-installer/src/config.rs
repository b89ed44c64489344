// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fs;
use std::path::PathBuf;

use libspicetify_installer::{Config, Error, Result, Verbosity};
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "spicetify-installer.toml";

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    installer_repo: Option<String>,
    tool_repo: Option<String>,
    tool_name: Option<String>,
    faq_url: Option<String>,
    check_online: Option<bool>,
    verbosity: Option<String>,
}

impl TomlConfig {
    fn into_config(self) -> Config {
        let verbosity = match self.verbosity.as_deref() {
            Some("quiet") => Verbosity::Quiet,
            Some("verbose") => Verbosity::Verbose,
            _ => Verbosity::Normal,
        };

        let mut config = Config::new().with_verbosity(verbosity);

        if let Some(repo) = self.installer_repo {
            config = config.with_installer_repo(repo);
        }
        if let Some(repo) = self.tool_repo {
            config = config.with_tool_repo(repo);
        }
        if let Some(name) = self.tool_name {
            config = config.with_tool_name(name);
        }
        if let Some(url) = self.faq_url {
            config = config.with_faq_url(url);
        }
        if let Some(online) = self.check_online {
            config = config.with_check_online(online);
        }

        config
    }
}

/// cli configuration: the library's config as read from the toml file.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub inner: Config,
}

impl std::ops::Deref for CliConfig {
    type Target = Config;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl CliConfig {
    pub fn load() -> Result<Self> {
        let inner = Self::load_toml_config()?.into_config();
        Ok(Self { inner })
    }

    fn load_toml_config() -> Result<TomlConfig> {
        let Some(path) = config_path() else {
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            return Ok(TomlConfig::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            Error::config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    pub fn edit_config() -> Result<()> {
        let Some(path) = config_path() else {
            return Err(Error::config("could not determine config directory"));
        };

        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|e| {
                    Error::config(format!(
                        "failed to create config directory {}: {e}",
                        dir.display()
                    ))
                })?;
            }

            let default_content = r#"# spicetify-installer configuration
# installer_repo = "FIREPAWER07/SpicetifyInstaller"
# tool_repo = "spicetify/cli"
# tool_name = "spicetify"
# faq_url = "https://spicetify.app/docs/faq/"
# check_online = true
# verbosity = "normal"  # quiet, normal, verbose
"#;
            fs::write(&path, default_content).map_err(|e| {
                Error::config(format!(
                    "failed to create config file {}: {e}",
                    path.display()
                ))
            })?;
        }

        let editor = std::env::var("EDITOR").unwrap_or_else(|_| {
            if cfg!(windows) { "notepad" } else { "nano" }.to_string()
        });
        std::process::Command::new(&editor)
            .arg(&path)
            .status()
            .map_err(|e| Error::other(format!("failed to open editor {editor}: {e}")))?;

        Ok(())
    }
}
