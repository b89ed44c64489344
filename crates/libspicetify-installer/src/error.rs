// SPDX-License-Identifier: MIT OR Apache-2.0

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("github api rate limited, retry after backoff")]
    RateLimited,

    #[error("github api returned error status: {0}")]
    ApiError(u16),

    #[error("failed to parse json: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to execute command: {0}")]
    SpawnFailed(String),

    #[error("command failed with status code {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("no suitable installer found in release assets: {0}")]
    AssetNotFound(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("update failed: {0}")]
    UpdateFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

macro_rules! error_ctor {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $name(msg: impl Into<String>) -> Self {
                Self::$variant(msg.into())
            }
        )*
    };
}

impl Error {
    error_ctor!(
        spawn => SpawnFailed,
        asset_not_found => AssetNotFound,
        download => DownloadFailed,
        update => UpdateFailed,
        config => Config,
        other => Other,
    );

    pub fn command_failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            status: status.into(),
            stderr: stderr.into(),
        }
    }
}
