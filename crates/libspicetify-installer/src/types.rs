// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Config, Error, paths};

/// the four maintenance operations offered for the managed tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Install,
    Repair,
    Backup,
    Uninstall,
}

/// one host command run as part of an operation, optionally announced first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: Option<String>,
    pub command: String,
    /// a failure is reported but the following steps still run.
    pub continue_on_error: bool,
}

impl Step {
    fn new(command: impl Into<String>) -> Self {
        Self {
            label: None,
            command: command.into(),
            continue_on_error: false,
        }
    }

    fn labeled(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new(command)
        }
    }

    fn tolerant(mut self) -> Self {
        self.continue_on_error = true;
        self
    }
}

impl Operation {
    pub const fn all() -> &'static [Operation] {
        &[
            Operation::Install,
            Operation::Repair,
            Operation::Backup,
            Operation::Uninstall,
        ]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install => "INSTALL",
            Self::Repair => "REPAIR",
            Self::Backup => "BACKUP",
            Self::Uninstall => "UNINSTALL",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Install => "Installs or updates Spicetify CLI on your system",
            Self::Repair => "Restores from backup and applies Spicetify",
            Self::Backup => "Creates a backup of your Spotify installation",
            Self::Uninstall => {
                "Completely removes Spicetify and restores Spotify to its original state"
            }
        }
    }

    /// the command line shown to the user when the operation is selected.
    pub fn command(&self, config: &Config) -> String {
        match self {
            Self::Repair => format!("{} restore backup apply", config.tool_name),
            _ => self
                .steps(config)
                .into_iter()
                .map(|s| s.command)
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    /// the host commands that carry out the operation, in order.
    pub fn steps(&self, config: &Config) -> Vec<Step> {
        let tool = &config.tool_name;

        match self {
            Self::Install => vec![Step::new(install_command(&config.tool_repo))],
            Self::Repair => vec![
                Step::labeled("Step 1: Restoring from backup...", format!("{tool} restore")),
                Step::labeled("Step 2: Creating a new backup...", format!("{tool} backup")),
                Step::labeled(
                    "Step 3: Applying Spicetify customizations...",
                    format!("{tool} apply"),
                ),
            ],
            Self::Backup => vec![Step::new(format!("{tool} backup"))],
            // restore fails on an unpatched client; the data dirs must go regardless
            Self::Uninstall => vec![
                Step::new(format!("{tool} restore")).tolerant(),
                Step::new(remove_dirs_command(tool)),
            ],
        }
    }
}

fn install_command(tool_repo: &str) -> String {
    if cfg!(windows) {
        format!("iwr -useb https://raw.githubusercontent.com/{tool_repo}/main/install.ps1 | iex")
    } else {
        format!("curl -fsSL https://raw.githubusercontent.com/{tool_repo}/main/install.sh | sh")
    }
}

fn remove_dirs_command(tool: &str) -> String {
    let dirs = paths::tool_data_dirs(tool);

    if cfg!(windows) {
        dirs.iter()
            .map(|d| {
                format!(
                    "Remove-Item -Path \"{}\" -Recurse -Force -ErrorAction SilentlyContinue",
                    d.display()
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    } else {
        let quoted: Vec<String> = dirs.iter().map(|d| format!("\"{}\"", d.display())).collect();
        format!("rm -rf {}", quoted.join(" "))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::all()
            .iter()
            .find(|op| op.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::other(format!("unknown operation: {s}")))
    }
}

/// version record reported by the host. field names match the web view's contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub installer_version: String,
    #[serde(rename = "spicetifyVersion")]
    pub tool_version: Option<String>,
    pub has_installer_update: bool,
    #[serde(rename = "hasSpicetifyUpdate")]
    pub has_tool_update: bool,
    #[serde(default)]
    pub latest_installer_version: Option<String>,
    #[serde(default)]
    pub latest_installer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_tool_version: Option<String>,
}

/// one downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// latest published release of a github repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    /// tag with any leading `v` trimmed.
    pub version: String,
    pub page_url: String,
    pub assets: Vec<ReleaseAsset>,
}

/// JSON output structures for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_from_str_ignores_case() {
        assert_eq!("install".parse::<Operation>().unwrap(), Operation::Install);
        assert_eq!(" Repair ".parse::<Operation>().unwrap(), Operation::Repair);
        assert!("reinstall".parse::<Operation>().is_err());
    }

    #[test]
    fn test_repair_runs_three_labeled_steps() {
        let config = Config::new();
        let steps = Operation::Repair.steps(&config);
        let commands: Vec<_> = steps.iter().map(|s| s.command.as_str()).collect();

        assert_eq!(
            commands,
            ["spicetify restore", "spicetify backup", "spicetify apply"]
        );
        assert!(steps.iter().all(|s| s.label.is_some()));
        assert_eq!(
            Operation::Repair.command(&config),
            "spicetify restore backup apply"
        );
    }

    #[test]
    fn test_uninstall_restores_before_removing() {
        let config = Config::new();
        let steps = Operation::Uninstall.steps(&config);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].command, "spicetify restore");
        assert!(steps[0].continue_on_error);
        assert!(!steps[1].continue_on_error);
        assert!(Operation::Repair.steps(&config).iter().all(|s| !s.continue_on_error));
        assert!(Operation::Uninstall.command(&config).starts_with("spicetify restore; "));
    }

    #[test]
    fn test_install_uses_tool_repo() {
        let config = Config::new().with_tool_repo("someone/cli");
        assert!(
            Operation::Install
                .command(&config)
                .contains("raw.githubusercontent.com/someone/cli/main/install")
        );
    }

    #[test]
    fn test_version_info_wire_names() {
        let json = r#"{
            "installerVersion": "1.0.2",
            "spicetifyVersion": "2.38.4",
            "hasInstallerUpdate": true,
            "hasSpicetifyUpdate": false,
            "latestInstallerVersion": "1.0.3",
            "latestInstallerUrl": null
        }"#;

        let info: VersionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.tool_version.as_deref(), Some("2.38.4"));
        assert!(info.has_installer_update);
        assert_eq!(info.latest_installer_version.as_deref(), Some("1.0.3"));
        assert_eq!(info.latest_tool_version, None);

        let out = serde_json::to_value(&info).unwrap();
        assert_eq!(out["hasSpicetifyUpdate"], false);
        assert!(out.get("latestToolVersion").is_none());
    }
}
