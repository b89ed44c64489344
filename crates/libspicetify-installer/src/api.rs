// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{thread, time::Duration};

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{Error, Release, ReleaseAsset, Result};

const API_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("spicetify-installer/", env!("CARGO_PKG_VERSION"));
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 250;

/// thread-safe github releases client that can be shared across threads.
#[derive(Clone)]
pub struct ReleaseClient {
    client: reqwest::blocking::Client,
}

impl ReleaseClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// fetches the latest non-draft release of `repo` (`owner/name`).
    pub fn latest_release(&self, repo: &str) -> Result<Release> {
        let url = format!("{API_BASE_URL}/repos/{repo}/releases/latest");
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        for attempt in 0..MAX_RETRIES {
            match self.fetch_release(&url) {
                Ok(release) => return Ok(release),
                // client errors other than rate limiting will not improve on retry
                Err(Error::ApiError(status)) => return Err(Error::ApiError(status)),
                Err(e) if attempt + 1 < MAX_RETRIES => {
                    log::debug!("**api:** retrying {url} after error: {e}");
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::other("max retries exceeded"))
    }

    fn fetch_release(&self, url: &str) -> Result<Release> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN && rate_limit_exhausted(&response))
        {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::ApiError(status.as_u16()));
        }

        parse_release(&response.text()?)
    }
}

fn rate_limit_exhausted(response: &reqwest::blocking::Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0")
}

#[derive(Debug, Deserialize)]
struct ReleaseJson {
    tag_name: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

pub(crate) fn parse_release(json: &str) -> Result<Release> {
    let raw: ReleaseJson = serde_json::from_str(json)?;

    Ok(Release {
        version: raw.tag_name.trim_start_matches(['v', 'V']).to_string(),
        page_url: raw.html_url,
        assets: raw.assets,
    })
}
