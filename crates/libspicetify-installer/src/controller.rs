// SPDX-License-Identifier: MIT OR Apache-2.0

//! the installer screen without its widgets: selection, execution, output and
//! version notifications, driven through a [`Host`].

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use serde::Serialize;

use crate::{
    AnsiRenderer, Config, Error, Host, Operation, Result, VersionInfo,
    ansi::{self, Color, Declaration, Style, StyleRun, XTERM_PALETTE},
    version::{UpdateStatus, VersionComparator, extract_semver},
};

/// shown when the host cannot report the installer's own version.
pub const FALLBACK_INSTALLER_VERSION: &str = "1.0.2-Alpha";
const TOOL_DISPLAY_NAME: &str = "Spicetify";
const SUCCESS_LINE: &str = "[SUCCESS] Command executed successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Success,
    Error,
}

impl LineKind {
    fn style(self) -> Style {
        let color = match self {
            Self::Success => XTERM_PALETTE[2],
            Self::Error => XTERM_PALETTE[1],
        };
        Style::new().with(Declaration::Foreground(Color::Palette(color)))
    }
}

/// result of one finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub operation: Operation,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}

/// the installer's own version badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallerBadge {
    pub label: String,
    /// `None` while the latest release is unknown.
    pub status: Option<UpdateStatus>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    UpToDate,
    UpdateAvailable,
    NotInstalled,
    Unknown,
}

/// the managed tool's version badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolBadge {
    pub label: String,
    pub state: ToolState,
}

/// the notification banner; absent when there is nothing to announce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UpdateNotice {
    UnreleasedVersion,
    BothUpdates,
    /// `latest` is `None` when the host flagged an update without naming it.
    InstallerUpdate { latest: Option<String> },
    ToolUpdate,
}

impl fmt::Display for UpdateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreleasedVersion => write!(f, "Warning: Unreleased Version"),
            Self::BothUpdates => write!(f, "Installer & {TOOL_DISPLAY_NAME} Updates Available!"),
            Self::InstallerUpdate { latest: Some(latest) } => {
                write!(f, "Update Available: v{latest}")
            }
            Self::InstallerUpdate { latest: None } => write!(f, "Update Available!"),
            Self::ToolUpdate => write!(f, "{TOOL_DISPLAY_NAME} Update Available!"),
        }
    }
}

/// what clicking the banner should lead to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UpdateAction {
    /// the local build is ahead of the latest stable release.
    ShowUnreleasedWarning { current: String, latest: String },
    OfferInstallerUpdate { latest: String, url: Option<String> },
    OfferToolUpdate,
    Nothing,
}

pub struct Controller<H: Host> {
    host: H,
    config: Config,
    comparator: VersionComparator,
    renderer: AnsiRenderer,
    selected: Option<Operation>,
    executing: bool,
    progress: Arc<AtomicU8>,
    output: Vec<StyleRun>,
    versions: Option<VersionInfo>,
    version_check_failed: bool,
}

impl<H: Host> Controller<H> {
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            comparator: VersionComparator::new(),
            renderer: AnsiRenderer::new(),
            selected: None,
            executing: false,
            progress: Arc::new(AtomicU8::new(0)),
            output: Vec::new(),
            versions: None,
            version_check_failed: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn select(&mut self, operation: Operation) {
        log::debug!("**controller:** selected {operation}");
        self.selected = Some(operation);
    }

    pub fn selected(&self) -> Option<Operation> {
        self.selected
    }

    /// the `> command` line displayed for the current selection.
    pub fn command_line(&self) -> Option<String> {
        self.selected
            .map(|op| format!("> {}", op.command(&self.config)))
    }

    pub fn can_execute(&self) -> bool {
        self.selected.is_some() && !self.executing
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn output(&self) -> &[StyleRun] {
        &self.output
    }

    pub fn output_markup(&self) -> String {
        ansi::markup_from_runs(&self.output)
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    pub fn versions(&self) -> Option<&VersionInfo> {
        self.versions.as_ref()
    }

    /// runs the selected operation, streaming each new piece of output to `sink`.
    /// returns `None` when nothing is selected or an operation is already running.
    pub fn execute(&mut self, sink: &mut dyn FnMut(&[StyleRun])) -> Option<ExecutionReport> {
        let operation = self.selected?;
        if self.executing {
            return None;
        }

        self.executing = true;
        self.output.clear();
        self.progress.store(0, Ordering::Relaxed);

        let header = format!("> {}\n\n", operation.command(&self.config));
        self.append_text(&header, sink);

        let progress = Arc::clone(&self.progress);
        let subscription = self
            .host
            .subscribe_progress(Box::new(move |v: u8| progress.store(v, Ordering::Relaxed)));

        let result = self.run_operation(operation, sink);
        self.progress.store(100, Ordering::Relaxed);

        let report = match result {
            Ok(()) => {
                self.append_line(LineKind::Success, &format!("\n{SUCCESS_LINE}\n"), sink);
                ExecutionReport {
                    operation,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                let message = self.renderer.render(&e.to_string()).plain_text();
                log::warn!("**controller:** {operation} failed: {message}");
                self.append_line(LineKind::Error, &format!("\n[ERROR] {message}\n"), sink);
                ExecutionReport {
                    operation,
                    success: false,
                    error: Some(message),
                }
            }
        };

        self.host.unsubscribe_progress(subscription);
        self.executing = false;

        if report.success {
            self.refresh_versions();
        }

        Some(report)
    }

    fn run_operation(
        &mut self,
        operation: Operation,
        sink: &mut dyn FnMut(&[StyleRun]),
    ) -> Result<()> {
        let result = self.run_steps(operation, sink);

        match (operation, result) {
            (Operation::Repair, Err(e)) => {
                Err(Error::other(format!("Repair process failed: {e}")))
            }
            (_, result) => result,
        }
    }

    fn run_steps(&mut self, operation: Operation, sink: &mut dyn FnMut(&[StyleRun])) -> Result<()> {
        for (i, step) in operation.steps(&self.config).into_iter().enumerate() {
            if let Some(label) = &step.label {
                let separator = if i == 0 { "" } else { "\n" };
                self.append_text(&format!("{separator}{label}\n"), sink);
            }

            let output = match self.host.run_command(&step.command) {
                Ok(output) => output,
                Err(e) if step.continue_on_error => {
                    log::warn!("**controller:** `{}` failed, continuing: {e}", step.command);
                    e.to_string()
                }
                Err(e) => return Err(e),
            };
            self.append_text(&format!("[Output]\n{output}\n"), sink);
        }

        Ok(())
    }

    /// renders host text through the sgr renderer and appends it.
    fn append_text(&mut self, text: &str, sink: &mut dyn FnMut(&[StyleRun])) {
        let runs = self.renderer.render(text).runs();
        self.push_runs(runs, sink);
    }

    fn append_line(&mut self, kind: LineKind, text: &str, sink: &mut dyn FnMut(&[StyleRun])) {
        self.push_runs(vec![StyleRun::styled(kind.style(), text)], sink);
    }

    fn push_runs(&mut self, runs: Vec<StyleRun>, sink: &mut dyn FnMut(&[StyleRun])) {
        if runs.is_empty() {
            return;
        }
        sink(&runs);

        for run in runs {
            match self.output.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => self.output.push(run),
            }
        }
    }

    /// asks the host for fresh version information.
    pub fn refresh_versions(&mut self) {
        match self.host.check_versions() {
            Ok(info) => {
                self.versions = Some(info);
                self.version_check_failed = false;
            }
            Err(e) => {
                log::warn!("**controller:** error checking versions: {e}");
                self.versions = Some(VersionInfo {
                    installer_version: FALLBACK_INSTALLER_VERSION.to_string(),
                    ..VersionInfo::default()
                });
                self.version_check_failed = true;
            }
        }
    }

    fn installer_version(info: &VersionInfo) -> &str {
        if info.installer_version.is_empty() {
            FALLBACK_INSTALLER_VERSION
        } else {
            &info.installer_version
        }
    }

    pub fn installer_badge(&mut self) -> Option<InstallerBadge> {
        let info = self.versions.as_ref()?;
        let version = Self::installer_version(info);
        let latest = info.latest_installer_version.as_deref();

        let status =
            latest.map(|l| self.comparator.classify(version, info.has_installer_update, Some(l)));

        let title = match (status, latest) {
            (Some(UpdateStatus::UnreleasedLocalBuild), Some(latest)) => Some(format!(
                "Warning: Your version (v{version}) is higher than the latest release (v{latest})"
            )),
            (Some(UpdateStatus::UpdateAvailable), Some(latest)) => {
                Some(format!("Latest version: v{latest}"))
            }
            (Some(UpdateStatus::UpToDate), _) => Some("You have the latest version".to_string()),
            _ => None,
        };

        Some(InstallerBadge {
            label: format!("App v{version}"),
            status,
            title,
        })
    }

    pub fn tool_badge(&self) -> ToolBadge {
        if self.version_check_failed {
            return ToolBadge {
                label: "Version check failed".to_string(),
                state: ToolState::Unknown,
            };
        }

        let Some(info) = &self.versions else {
            return ToolBadge {
                label: format!("Checking {TOOL_DISPLAY_NAME} version..."),
                state: ToolState::Unknown,
            };
        };

        match info.tool_version.as_deref() {
            Some(raw) => {
                let label = match extract_semver(raw) {
                    Some(v) => format!("{TOOL_DISPLAY_NAME} v{v}"),
                    None => "Unknown version".to_string(),
                };
                let state = if info.has_tool_update {
                    ToolState::UpdateAvailable
                } else {
                    ToolState::UpToDate
                };
                ToolBadge { label, state }
            }
            None => ToolBadge {
                label: format!("{TOOL_DISPLAY_NAME} not installed"),
                state: ToolState::NotInstalled,
            },
        }
    }

    fn is_unreleased(&mut self) -> bool {
        let Some(info) = &self.versions else {
            return false;
        };
        let version = Self::installer_version(info);

        info.latest_installer_version
            .as_deref()
            .is_some_and(|latest| self.comparator.is_newer(version, latest))
    }

    pub fn update_notice(&mut self) -> Option<UpdateNotice> {
        let unreleased = self.is_unreleased();
        let info = self.versions.as_ref()?;

        if unreleased {
            return Some(UpdateNotice::UnreleasedVersion);
        }

        match (info.has_installer_update, info.has_tool_update) {
            (true, true) => Some(UpdateNotice::BothUpdates),
            (true, false) => Some(UpdateNotice::InstallerUpdate {
                latest: info.latest_installer_version.clone(),
            }),
            (false, true) => Some(UpdateNotice::ToolUpdate),
            (false, false) => None,
        }
    }

    /// re-checks versions and decides how to respond to the banner being clicked.
    pub fn update_action(&mut self) -> UpdateAction {
        let info = match self.host.check_versions() {
            Ok(info) => info,
            Err(e) => {
                let text = format!("Error checking for updates: {e}\n");
                self.append_text(&text, &mut |_| {});
                return UpdateAction::Nothing;
            }
        };

        let current = Self::installer_version(&info).to_string();
        let latest = info.latest_installer_version.clone();
        self.versions = Some(info);
        self.version_check_failed = false;

        if self.is_unreleased() {
            return UpdateAction::ShowUnreleasedWarning {
                current,
                latest: latest.unwrap_or_default(),
            };
        }

        let Some(info) = &self.versions else {
            return UpdateAction::Nothing;
        };

        if info.has_installer_update {
            UpdateAction::OfferInstallerUpdate {
                latest: latest.unwrap_or_else(|| FALLBACK_INSTALLER_VERSION.to_string()),
                url: info.latest_installer_url.clone(),
            }
        } else if info.has_tool_update {
            UpdateAction::OfferToolUpdate
        } else {
            UpdateAction::Nothing
        }
    }

    /// downloads and starts the latest installer release through the host.
    pub fn apply_self_update(&mut self) -> Result<()> {
        let url = self
            .versions
            .as_ref()
            .and_then(|info| info.latest_installer_url.clone())
            .ok_or_else(|| {
                let version = self
                    .versions
                    .as_ref()
                    .and_then(|info| info.latest_installer_version.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                Error::asset_not_found(version)
            })?;

        let progress = Arc::clone(&self.progress);
        let subscription = self
            .host
            .subscribe_progress(Box::new(move |v: u8| progress.store(v, Ordering::Relaxed)));

        let result = self.host.request_self_update(&url);
        self.host.unsubscribe_progress(subscription);
        result
    }
}
