//! Desktop-integration icon lookup: `.desktop` entries plus icon-theme
//! directories, for systems where executables carry no embedded icon.
//!
//! The executable is matched against desktop entries for an `Icon=` name;
//! failing that, its file stem (then the lowercased stem) is used as the
//! icon name. Names are resolved through [`SearchPaths::load_icon`].

pub mod entry;
pub mod theme;

use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{Config, SearchPaths};
use crate::error::{IconError, Result};
use crate::process;
use crate::provider::IconProvider;

#[derive(Debug, Clone)]
pub struct DesktopIconProvider {
    paths: SearchPaths,
}

impl DesktopIconProvider {
    pub fn new(paths: SearchPaths) -> Self {
        DesktopIconProvider { paths }
    }

    /// Uses `$HOME` for home-relative directories in `config`.
    pub fn from_config(config: &Config) -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::new(config.search_paths(home.as_deref()))
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.paths
    }

    pub fn resolve_icon(&self, exe_path: &Path) -> Result<RgbaImage> {
        let not_found = || IconError::IconNotFound {
            path: exe_path.to_path_buf(),
        };
        let abs = std::path::absolute(exe_path).map_err(|_| not_found())?;

        let from_entry = entry::find_icon_name(&self.paths.application_dirs, &abs);
        let stem = abs
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);
        let lower = stem
            .as_ref()
            .map(|s| s.to_lowercase())
            .filter(|l| Some(l) != stem.as_ref());

        for name in [from_entry, stem, lower].into_iter().flatten() {
            debug!(exe = %abs.display(), icon = %name, "trying icon name");
            if let Some((file, img)) = self.paths.load_icon(&name) {
                info!(
                    exe = %abs.display(),
                    icon = %file.display(),
                    "Icon OK ({}x{})",
                    img.width(),
                    img.height()
                );
                return Ok(img);
            }
        }
        Err(not_found())
    }
}

impl IconProvider for DesktopIconProvider {
    fn icon_from_pid(&self, pid: u32) -> Result<RgbaImage> {
        let exe = process::executable_path(pid)?;
        self.resolve_icon(&exe)
    }

    fn icon_from_path(&self, path: &Path) -> Result<RgbaImage> {
        self.resolve_icon(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::png_bytes;
    use std::fs;

    struct Fixture {
        _root: tempfile::TempDir,
        provider: DesktopIconProvider,
        apps: PathBuf,
        icons: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let apps = root.path().join("applications");
        let icons = root.path().join("icons");
        fs::create_dir_all(&apps).unwrap();
        fs::create_dir_all(&icons).unwrap();
        let provider = DesktopIconProvider::new(SearchPaths {
            application_dirs: vec![apps.clone()],
            icon_dirs: vec![icons.clone()],
            themes: vec!["hicolor".to_string()],
            sizes: vec![256, 48],
        });
        Fixture { _root: root, provider, apps, icons }
    }

    fn put(path: PathBuf, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn desktop_entry_icon_is_preferred() {
        let fx = fixture();
        put(
            fx.apps.join("app.desktop"),
            b"[Desktop Entry]\nExec=env FOO=1 /usr/bin/app --flag\nIcon=app-icon\n",
        );
        put(fx.icons.join("hicolor/256x256/apps/app-icon.png"), &png_bytes(256, 256));
        put(fx.icons.join("app.png"), &png_bytes(16, 16));

        let img = fx.provider.icon_from_path(Path::new("/usr/bin/app")).unwrap();
        assert_eq!(img.dimensions(), (256, 256));
    }

    #[test]
    fn falls_back_to_stem_when_entry_icon_missing() {
        let fx = fixture();
        put(
            fx.apps.join("app.desktop"),
            b"[Desktop Entry]\nExec=/usr/bin/app\nIcon=missing-icon\n",
        );
        put(fx.icons.join("app.png"), &png_bytes(16, 16));

        let img = fx.provider.icon_from_path(Path::new("/usr/bin/app")).unwrap();
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[test]
    fn lowercase_stem_fallback() {
        let fx = fixture();
        put(fx.icons.join("hicolor/48x48/apps/mytool.png"), &png_bytes(48, 48));

        let img = fx.provider.icon_from_path(Path::new("/opt/MyTool.AppImage")).unwrap();
        assert_eq!(img.dimensions(), (48, 48));
    }

    #[test]
    fn exhausted_search_is_icon_not_found() {
        let fx = fixture();
        let err = fx.provider.icon_from_path(Path::new("/usr/bin/ghost")).unwrap_err();
        assert!(matches!(err, IconError::IconNotFound { .. }));
    }
}
