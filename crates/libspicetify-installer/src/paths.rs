// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

/// gets the user's home directory, honoring HOME before asking the platform.
pub(crate) fn user_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default())
}

/// roaming config dir on windows (%APPDATA%), XDG config home elsewhere.
pub(crate) fn config_home() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| user_home().join(".config"))
}

/// %LOCALAPPDATA% on windows, XDG data home elsewhere.
pub(crate) fn local_data_home() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| user_home().join(".local/share"))
}

/// scratch space for downloaded updates.
pub(crate) fn temp_dir() -> PathBuf {
    std::env::temp_dir().join("spicetify-installer")
}

/// directories the tool keeps its binary, config and themes in.
pub fn tool_data_dirs(tool: &str) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![
            local_data_home().join(tool),
            user_home().join(format!("{tool}-cli")),
            config_home().join(tool),
        ]
    } else {
        vec![user_home().join(format!(".{tool}")), config_home().join(tool)]
    }
}
