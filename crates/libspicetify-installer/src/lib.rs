// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod ansi;
pub mod api;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod host;
pub mod installer;
pub(crate) mod paths;
pub mod progress;
pub mod resolver;
pub mod types;
pub mod version;

pub use ansi::{AnsiRenderer, Color, Declaration, Rendered, Segment, Style, StyleRun};
pub use api::ReleaseClient;
pub use config::{Config, Verbosity};
pub use controller::{
    Controller, ExecutionReport, InstallerBadge, ToolBadge, ToolState, UpdateAction, UpdateNotice,
};
pub use discovery::{LocationCheck, LocationReport};
pub use error::{Error, Result};
pub use host::{Host, SystemHost};
pub use progress::{ProgressHub, ProgressListener, SubscriptionId};
pub use resolver::select_download_url;
pub use types::{JsonOutput, Operation, Release, ReleaseAsset, Step, VersionInfo};
pub use version::{
    UpdateStatus, VersionComparator, compare as compare_versions, is_update_available,
};

/// checks the installed tool and, when enabled, the latest published releases.
pub fn check_versions(config: &Config) -> Result<VersionInfo> {
    SystemHost::new(config.clone())?.check_versions()
}

/// reports where the managed tool is installed, if anywhere.
pub fn locate_tool(config: &Config) -> LocationReport {
    discovery::locate_tool(&config.tool_name)
}

/// fetches the latest release of this installer.
pub fn latest_installer_release(config: &Config) -> Result<Release> {
    ReleaseClient::new()?.latest_release(&config.installer_repo)
}
