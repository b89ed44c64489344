// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Release, ReleaseAsset};

/// installer file extensions for the platform this binary was built for,
/// most preferred first.
fn platform_extensions() -> &'static [&'static str] {
    if cfg!(windows) {
        &[".exe", ".msi"]
    } else if cfg!(target_os = "macos") {
        &[".dmg"]
    } else {
        &[".appimage", ".deb"]
    }
}

/// picks the asset to download for a self-update.
/// priority order:
/// 1. platform installer extension
/// 2. any asset named like a setup or installer
pub fn select_asset(release: &Release) -> Option<&ReleaseAsset> {
    select_asset_for(release, platform_extensions())
}

pub(crate) fn select_asset_for<'a>(
    release: &'a Release,
    extensions: &[&str],
) -> Option<&'a ReleaseAsset> {
    resolve_by_extension(release, extensions).or_else(|| resolve_by_name(release))
}

fn resolve_by_extension<'a>(release: &'a Release, extensions: &[&str]) -> Option<&'a ReleaseAsset> {
    extensions.iter().find_map(|ext| {
        release
            .assets
            .iter()
            .find(|a| a.name.to_lowercase().ends_with(ext))
    })
}

fn resolve_by_name(release: &Release) -> Option<&ReleaseAsset> {
    release.assets.iter().find(|a| {
        let name = a.name.to_lowercase();
        name.contains("setup") || name.contains("installer")
    })
}

/// download url of the asset [`select_asset`] picks.
pub fn select_download_url(release: &Release) -> Option<String> {
    select_asset(release).map(|a| a.download_url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            download_url: format!("https://example.invalid/{name}"),
            size: 0,
        }
    }

    fn release(names: &[&str]) -> Release {
        Release {
            version: "1.0.3".to_string(),
            page_url: String::new(),
            assets: names.iter().map(|n| asset(n)).collect(),
        }
    }

    #[test]
    fn test_extension_order_wins() {
        let r = release(&["notes.txt", "App_1.0.3_x64.msi", "App_1.0.3_x64-setup.exe"]);
        let picked = select_asset_for(&r, &[".exe", ".msi"]).unwrap();
        assert_eq!(picked.name, "App_1.0.3_x64-setup.exe");
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let r = release(&["app_1.0.3_amd64.AppImage"]);
        assert!(select_asset_for(&r, &[".appimage"]).is_some());
    }

    #[test]
    fn test_falls_back_to_installer_name() {
        let r = release(&["checksums.txt", "spicetify-installer-universal.zip"]);
        let picked = select_asset_for(&r, &[".dmg"]).unwrap();
        assert_eq!(picked.name, "spicetify-installer-universal.zip");
    }

    #[test]
    fn test_no_suitable_asset() {
        let r = release(&["source.tar.gz"]);
        assert!(select_asset_for(&r, &[".exe"]).is_none());
        assert!(select_asset_for(&release(&[]), &[".exe"]).is_none());
    }
}
