// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::{Error, ProgressHub, Result, paths};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// anything smaller than this is almost certainly an error page, not an installer.
const SUSPICIOUS_SIZE_BYTES: u64 = 1024 * 1024;
/// extensions handed to the system opener instead of being executed.
const OPEN_WITH_SYSTEM: &[&str] = &["dmg", "deb", "zip", "msi"];

/// creates a shared HTTP client for downloads.
pub fn create_download_client() -> Result<reqwest::blocking::Client> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .user_agent(concat!("spicetify-installer/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("spicetify-installer-update")
        .to_string()
}

/// downloads a new installer build into the temp dir.
/// progress moves from 10 to 80 while bytes arrive.
pub fn download_update(
    client: &reqwest::blocking::Client,
    url: &str,
    progress: &ProgressHub,
) -> Result<PathBuf> {
    let temp = paths::temp_dir();
    fs::create_dir_all(&temp)?;

    let dest = temp.join(file_name_from_url(url));
    log::info!("**update:** downloading {url} to {}", dest.display());
    progress.publish(10);

    let response = client
        .get(url)
        .send()
        .map_err(|e| Error::download(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::download(format!(
            "http status {}",
            response.status()
        )));
    }

    let total = response.content_length().filter(|&t| t > 0);
    let mut file = File::create(&dest)?;
    let mut reader = response;
    let mut buffer = [0u8; 8192];
    let mut downloaded: u64 = 0;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| Error::download(format!("read error: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;

        if let Some(total) = total {
            progress.publish((10 + downloaded.min(total) * 70 / total) as u32);
        }
    }

    if downloaded < SUSPICIOUS_SIZE_BYTES {
        log::warn!("**update:** downloaded file seems too small: {downloaded} bytes");
    }

    progress.publish(80);
    Ok(dest)
}

/// starts the downloaded installer detached from this process.
pub fn launch_update(installer: &Path) -> Result<()> {
    let extension = installer
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if OPEN_WITH_SYSTEM.contains(&extension.as_str()) {
        return open_with_system(&installer.to_string_lossy());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(installer, fs::Permissions::from_mode(0o755))?;
    }

    log::info!("**update:** launching {}", installer.display());
    Command::new(installer)
        .spawn()
        .map_err(|e| Error::update(format!("failed to start updater: {e}")))?;

    Ok(())
}

/// opens a url or file with the platform's default handler.
pub fn open_with_system(target: &str) -> Result<()> {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/c", "start", "", target]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(target);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(target);
        c
    };

    command
        .spawn()
        .map_err(|e| Error::spawn(format!("failed to open {target}: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://github.com/o/r/releases/download/v1.0.3/App_1.0.3_x64-setup.exe"),
            "App_1.0.3_x64-setup.exe"
        );
        assert_eq!(
            file_name_from_url("https://example.invalid/app.AppImage?token=abc"),
            "app.AppImage"
        );
        assert_eq!(
            file_name_from_url("https://example.invalid/"),
            "spicetify-installer-update"
        );
    }
}
