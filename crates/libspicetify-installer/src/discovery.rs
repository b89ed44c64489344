// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCheck {
    pub path: PathBuf,
    pub exists: bool,
}

/// where the managed tool was (or was not) found on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationReport {
    pub tool: String,
    pub checked: Vec<LocationCheck>,
    pub on_path: Option<PathBuf>,
}

impl LocationReport {
    pub fn is_installed(&self) -> bool {
        self.on_path.is_some() || self.checked.iter().any(|c| c.exists)
    }
}

impl fmt::Display for LocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Checking for {} in common locations:", self.tool)?;
        for check in &self.checked {
            let state = if check.exists { "FOUND" } else { "Not found" };
            writeln!(f, "{state}: {}", check.path.display())?;
        }

        writeln!(f)?;
        match &self.on_path {
            Some(path) => writeln!(f, "{} found in PATH: {}", self.tool, path.display()),
            None => writeln!(f, "{} NOT found in PATH", self.tool),
        }
    }
}

/// checks the well-known install directories and PATH for the tool.
pub fn locate_tool(tool: &str) -> LocationReport {
    let checked = paths::tool_data_dirs(tool)
        .into_iter()
        .map(|path| LocationCheck {
            exists: path.exists(),
            path,
        })
        .collect();

    let on_path = std::env::var_os("PATH").and_then(|p| find_in_path_list(tool, &p));

    if on_path.is_none() {
        log::debug!("**discovery:** {tool} not found in PATH");
    }

    LocationReport {
        tool: tool.to_string(),
        checked,
        on_path,
    }
}

fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{tool}.exe")
    } else {
        tool.to_string()
    }
}

/// searches a PATH-style list for the tool's executable.
pub(crate) fn find_in_path_list(tool: &str, path_list: &OsStr) -> Option<PathBuf> {
    let name = executable_name(tool);
    std::env::split_paths(path_list)
        .map(|dir| dir.join(&name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        metadata.is_file()
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!(
            "spicetify-installer-test-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_find_in_path_list() {
        let empty = scratch_dir("empty");
        let bin = scratch_dir("bin");
        let exe = bin.join(executable_name("faketool"));
        fs::write(&exe, "#!/bin/sh\n").unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let list = env::join_paths([&empty, &bin]).unwrap();
        assert_eq!(find_in_path_list("faketool", &list), Some(exe));
        assert_eq!(find_in_path_list("othertool", &list), None);

        fs::remove_dir_all(&empty).ok();
        fs::remove_dir_all(&bin).ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_skipped() {
        let bin = scratch_dir("noexec");
        fs::write(bin.join("faketool"), "data").unwrap();

        let list = env::join_paths([&bin]).unwrap();
        assert_eq!(find_in_path_list("faketool", &list), None);

        fs::remove_dir_all(&bin).ok();
    }

    #[test]
    fn test_report_display() {
        let report = LocationReport {
            tool: "spicetify".to_string(),
            checked: vec![
                LocationCheck {
                    path: PathBuf::from("/a"),
                    exists: true,
                },
                LocationCheck {
                    path: PathBuf::from("/b"),
                    exists: false,
                },
            ],
            on_path: None,
        };

        let text = report.to_string();
        assert!(text.contains("FOUND: /a"));
        assert!(text.contains("Not found: /b"));
        assert!(text.contains("spicetify NOT found in PATH"));
        assert!(report.is_installed());
    }
}
