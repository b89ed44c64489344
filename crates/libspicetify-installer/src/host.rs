// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    process::{Command, Output},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use crate::{
    Config, Error, ProgressHub, Release, ReleaseClient, Result, VersionInfo,
    discovery::{self, LocationReport},
    installer,
    progress::{ProgressListener, SubscriptionId},
    resolver,
    version::{self, extract_semver},
};

const PROGRESS_TICK: Duration = Duration::from_millis(300);
/// simulated progress stops here until the command really finishes.
const PROGRESS_CEILING: u32 = 90;

/// everything the controller needs from the surrounding desktop shell.
pub trait Host {
    /// runs a shell command to completion and returns its combined output.
    fn run_command(&self, command: &str) -> Result<String>;

    fn subscribe_progress(&self, listener: ProgressListener) -> SubscriptionId;

    fn unsubscribe_progress(&self, id: SubscriptionId);

    fn check_versions(&self) -> Result<VersionInfo>;

    /// downloads and starts a new build of this application.
    fn request_self_update(&self, url: &str) -> Result<()>;
}

/// host backed by real processes and the github api.
pub struct SystemHost {
    config: Config,
    progress: ProgressHub,
    releases: ReleaseClient,
}

impl SystemHost {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            progress: ProgressHub::new(),
            releases: ReleaseClient::new()?,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn progress(&self) -> &ProgressHub {
        &self.progress
    }

    pub fn locate_tool(&self) -> LocationReport {
        discovery::locate_tool(&self.config.tool_name)
    }

    pub fn open_url(&self, url: &str) -> Result<()> {
        installer::open_with_system(url)
    }

    pub fn open_faq(&self) -> Result<()> {
        self.open_url(&self.config.faq_url)
    }

    /// asks the tool for its version, first directly and then through the shell.
    fn tool_version(&self) -> Option<String> {
        let tool = &self.config.tool_name;

        let direct = Command::new(tool).arg("-v").output();
        if let Some(version) = direct.ok().and_then(|o| successful_stdout(&o)) {
            log::debug!("**host:** direct check found {tool} {version}");
            return Some(version);
        }

        let fallback = shell_command(&format!("{tool} -v")).output();
        match fallback.ok().and_then(|o| successful_stdout(&o)) {
            Some(version) => {
                log::debug!("**host:** shell fallback found {tool} {version}");
                Some(version)
            }
            None => {
                log::debug!("**host:** {tool} is not installed or not on PATH");
                None
            }
        }
    }

    fn fill_installer_release(&self, info: &mut VersionInfo) {
        match self.releases.latest_release(&self.config.installer_repo) {
            Ok(release) => apply_installer_release(info, release),
            Err(e) => log::warn!("**host:** installer release check failed: {e}"),
        }
    }

    fn fill_tool_release(&self, info: &mut VersionInfo) {
        let Some(installed) = info.tool_version.as_deref() else {
            return;
        };
        let installed = extract_semver(installed).unwrap_or(installed);

        match self.releases.latest_release(&self.config.tool_repo) {
            Ok(release) => {
                info.has_tool_update = version::is_update_available(installed, &release.version);
                info.latest_tool_version = Some(release.version);
            }
            Err(e) => log::warn!("**host:** {} release check failed: {e}", self.config.tool_name),
        }
    }
}

/// records the latest installer release. the download url stays empty when no
/// asset is an installer for this platform.
fn apply_installer_release(info: &mut VersionInfo, release: Release) {
    info.has_installer_update =
        version::is_update_available(&info.installer_version, &release.version);
    info.latest_installer_url = resolver::select_download_url(&release);

    if info.latest_installer_url.is_none() {
        log::warn!(
            "**host:** no installer asset in release {}, see {}",
            release.version,
            release.page_url
        );
    }

    info.latest_installer_version = Some(release.version);
}

fn successful_stdout(output: &Output) -> Option<String> {
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("powershell");
        cmd.args([
            "-NoProfile",
            "-NonInteractive",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            command,
        ]);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// eases towards the ceiling so long commands keep moving without reaching it.
fn next_tick(value: u32) -> u32 {
    if value >= PROGRESS_CEILING {
        return PROGRESS_CEILING;
    }
    (value + ((PROGRESS_CEILING - value) / 8).max(1)).min(PROGRESS_CEILING)
}

impl Host for SystemHost {
    fn run_command(&self, command: &str) -> Result<String> {
        log::info!("**host:** executing: {command}");
        self.progress.publish(0);

        let mut cmd = shell_command(command);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(cmd.output());
        });

        let mut value = 0;
        let output = loop {
            match rx.recv_timeout(PROGRESS_TICK) {
                Ok(result) => break result.map_err(|e| Error::spawn(e.to_string()))?,
                Err(RecvTimeoutError::Timeout) => {
                    value = next_tick(value);
                    self.progress.publish(value);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::spawn("command runner exited unexpectedly"));
                }
            }
        };

        self.progress.publish(100);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            log::debug!("**host:** stderr: {stderr}");
        }

        if output.status.success() {
            Ok(format!("{stdout}\n{stderr}"))
        } else {
            Err(Error::command_failed(
                output.status.to_string(),
                stderr.into_owned(),
            ))
        }
    }

    fn subscribe_progress(&self, listener: ProgressListener) -> SubscriptionId {
        self.progress.subscribe(listener)
    }

    fn unsubscribe_progress(&self, id: SubscriptionId) {
        self.progress.unsubscribe(id);
    }

    fn check_versions(&self) -> Result<VersionInfo> {
        let mut info = VersionInfo {
            installer_version: env!("CARGO_PKG_VERSION").to_string(),
            tool_version: self.tool_version(),
            ..VersionInfo::default()
        };

        if self.config.check_online {
            self.fill_installer_release(&mut info);
            self.fill_tool_release(&mut info);
        }

        log::info!(
            "**host:** installer={}, {}={:?}, installer_update={}, tool_update={}",
            info.installer_version,
            self.config.tool_name,
            info.tool_version,
            info.has_installer_update,
            info.has_tool_update
        );

        Ok(info)
    }

    fn request_self_update(&self, url: &str) -> Result<()> {
        let client = installer::create_download_client()?;
        let path = installer::download_update(&client, url, &self.progress)?;
        self.progress.publish(90);
        installer::launch_update(&path)?;
        self.progress.publish(100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::ReleaseAsset;

    #[test]
    fn test_next_tick_approaches_ceiling() {
        let mut value = 0;
        let mut previous = 0;
        for _ in 0..200 {
            value = next_tick(value);
            assert!(value >= previous);
            previous = value;
        }
        assert_eq!(value, PROGRESS_CEILING);
        assert_eq!(next_tick(95), PROGRESS_CEILING);
    }

    #[test]
    fn test_release_without_installer_asset_has_no_url() {
        let mut info = VersionInfo {
            installer_version: "1.0.2".to_string(),
            ..VersionInfo::default()
        };
        let release = Release {
            version: "1.0.3".to_string(),
            page_url: "https://github.com/FIREPAWER07/SpicetifyInstaller/releases/tag/v1.0.3"
                .to_string(),
            assets: Vec::new(),
        };

        apply_installer_release(&mut info, release);

        assert!(info.has_installer_update);
        assert_eq!(info.latest_installer_version.as_deref(), Some("1.0.3"));
        assert_eq!(info.latest_installer_url, None);
    }

    #[test]
    fn test_release_with_installer_asset_sets_url() {
        let mut info = VersionInfo {
            installer_version: "1.0.2".to_string(),
            ..VersionInfo::default()
        };
        let release = Release {
            version: "1.0.3".to_string(),
            page_url: String::new(),
            assets: vec![ReleaseAsset {
                name: "SpicetifyInstaller-setup.exe".to_string(),
                download_url: "https://example.invalid/SpicetifyInstaller-setup.exe".to_string(),
                size: 0,
            }],
        };

        apply_installer_release(&mut info, release);

        assert_eq!(
            info.latest_installer_url.as_deref(),
            Some("https://example.invalid/SpicetifyInstaller-setup.exe")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_collects_output_and_progress() {
        let host = SystemHost::new(Config::new().with_check_online(false)).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = host.subscribe_progress(Box::new(move |v: u8| sink.lock().push(v)));

        let output = host.run_command("echo hello; echo oops 1>&2").unwrap();
        host.unsubscribe_progress(id);

        assert_eq!(output, "hello\n\noops\n");
        let seen = seen.lock();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_failure_carries_stderr() {
        let host = SystemHost::new(Config::new().with_check_online(false)).unwrap();
        let err = host.run_command("echo broken 1>&2; exit 3").unwrap_err();

        match err {
            Error::CommandFailed { stderr, .. } => assert_eq!(stderr, "broken\n"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
