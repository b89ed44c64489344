// SPDX-License-Identifier: MIT OR Apache-2.0

pub const DEFAULT_INSTALLER_REPO: &str = "FIREPAWER07/SpicetifyInstaller";
pub const DEFAULT_TOOL_REPO: &str = "spicetify/cli";
pub const DEFAULT_TOOL_NAME: &str = "spicetify";
pub const DEFAULT_FAQ_URL: &str = "https://spicetify.app/docs/faq/";

/// verbosity level for operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}

/// configuration for installer operations.
///
/// front-ends construct this directly; only the cli reads it from a file.
#[derive(Debug, Clone)]
pub struct Config {
    /// github `owner/name` publishing releases of this installer.
    pub installer_repo: String,

    /// github `owner/name` publishing releases of the managed tool.
    pub tool_repo: String,

    /// executable name of the managed tool.
    pub tool_name: String,

    /// page opened for help.
    pub faq_url: String,

    /// when false, version checks skip github and report no updates.
    pub check_online: bool,

    /// verbosity level for output.
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            installer_repo: DEFAULT_INSTALLER_REPO.to_string(),
            tool_repo: DEFAULT_TOOL_REPO.to_string(),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            faq_url: DEFAULT_FAQ_URL.to_string(),
            check_online: true,
            verbosity: Verbosity::Normal,
        }
    }
}

impl Config {
    /// creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installer_repo(mut self, repo: impl Into<String>) -> Self {
        self.installer_repo = repo.into();
        self
    }

    pub fn with_tool_repo(mut self, repo: impl Into<String>) -> Self {
        self.tool_repo = repo.into();
        self
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    pub fn with_faq_url(mut self, url: impl Into<String>) -> Self {
        self.faq_url = url.into();
        self
    }

    pub fn with_check_online(mut self, check_online: bool) -> Self {
        self.check_online = check_online;
        self
    }

    /// creates a config with the given verbosity level.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert_eq!(config.tool_repo, "spicetify/cli");
        assert_eq!(config.tool_name, "spicetify");
        assert!(config.check_online);
        assert_eq!(config.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::new()
            .with_installer_repo("me/fork")
            .with_check_online(false)
            .with_verbosity(Verbosity::Quiet);

        assert_eq!(config.installer_repo, "me/fork");
        assert!(!config.check_online);
        assert_eq!(config.verbosity.to_string(), "quiet");
    }
}
