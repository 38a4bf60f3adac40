//! Icon-theme directory search.

use image::RgbaImage;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::SearchPaths;
use crate::decode;

pub static CONTEXTS: [&str; 2] = ["apps", "applications"];
pub static THEMED_EXTENSIONS: [&str; 3] = ["png", "ico", "bmp"];
pub static PIXMAP_EXTENSIONS: [&str; 4] = ["png", "ico", "bmp", "xpm"];

impl SearchPaths {
    /// Every file tried for `name`, in order.
    ///
    /// Themed candidates come first (base dir, theme, size, context,
    /// extension), then flat files directly under each base dir with the
    /// extension varying slowest.
    pub fn candidates<'a>(&'a self, name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        let themed = self.icon_dirs.iter().flat_map(move |base| {
            self.themes.iter().flat_map(move |theme| {
                self.sizes.iter().flat_map(move |size| {
                    CONTEXTS.iter().flat_map(move |context| {
                        THEMED_EXTENSIONS.iter().map(move |ext| {
                            base.join(theme)
                                .join(format!("{size}x{size}"))
                                .join(context)
                                .join(format!("{name}.{ext}"))
                        })
                    })
                })
            })
        });
        let flat = PIXMAP_EXTENSIONS.iter().flat_map(move |ext| {
            self.icon_dirs
                .iter()
                .map(move |base| base.join(format!("{name}.{ext}")))
        });
        themed.chain(flat)
    }

    /// Resolves an icon name (or absolute path) to the first decodable file.
    pub fn load_icon(&self, name: &str) -> Option<(PathBuf, RgbaImage)> {
        if name.is_empty() {
            return None;
        }
        let path = Path::new(name);
        if path.is_absolute() {
            return load_icon_file(path).map(|img| (path.to_path_buf(), img));
        }
        self.candidates(name)
            .find_map(|p| load_icon_file(&p).map(|img| (p, img)))
    }
}

fn load_icon_file(path: &Path) -> Option<RgbaImage> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "icon candidate unreadable");
            return None;
        }
    };
    match decode::decode(&data) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "icon candidate failed to decode");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::png_bytes;

    fn paths(dirs: &[&Path]) -> SearchPaths {
        SearchPaths {
            application_dirs: Vec::new(),
            icon_dirs: dirs.iter().map(|d| d.to_path_buf()).collect(),
            themes: vec!["hicolor".to_string()],
            sizes: vec![512, 256, 128, 96, 64, 48],
        }
    }

    fn put(path: PathBuf, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn candidate_order() {
        let sp = paths(&[Path::new("/a"), Path::new("/b")]);
        let all: Vec<PathBuf> = sp.candidates("x").collect();
        assert_eq!(all.len(), 2 * 6 * 2 * 3 + 4 * 2);
        assert_eq!(all[0], PathBuf::from("/a/hicolor/512x512/apps/x.png"));
        assert_eq!(all[1], PathBuf::from("/a/hicolor/512x512/apps/x.ico"));
        assert_eq!(all[3], PathBuf::from("/a/hicolor/512x512/applications/x.png"));
        assert_eq!(all[6], PathBuf::from("/a/hicolor/256x256/apps/x.png"));
        assert_eq!(all[72], PathBuf::from("/a/x.png"));
        assert_eq!(all[73], PathBuf::from("/b/x.png"));
        assert_eq!(all[79], PathBuf::from("/b/x.xpm"));
    }

    #[test]
    fn themed_beats_pixmap() {
        let local = tempfile::tempdir().unwrap();
        let pixmaps = tempfile::tempdir().unwrap();
        put(local.path().join("hicolor/48x48/apps/name.png"), &png_bytes(48, 48));
        put(pixmaps.path().join("name.png"), &png_bytes(16, 16));

        let sp = paths(&[local.path(), pixmaps.path()]);
        let (path, img) = sp.load_icon("name").unwrap();
        assert_eq!(path, local.path().join("hicolor/48x48/apps/name.png"));
        assert_eq!(img.dimensions(), (48, 48));
    }

    #[test]
    fn larger_bucket_wins() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path().join("hicolor/48x48/apps/name.png"), &png_bytes(48, 48));
        put(dir.path().join("hicolor/128x128/applications/name.png"), &png_bytes(128, 128));

        let (_, img) = paths(&[dir.path()]).load_icon("name").unwrap();
        assert_eq!(img.dimensions(), (128, 128));
    }

    #[test]
    fn undecodable_candidate_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path().join("hicolor/256x256/apps/name.png"), b"not a png");
        put(dir.path().join("name.xpm"), b"/* XPM */");
        put(dir.path().join("name.bmp"), &{
            let mut out = std::io::Cursor::new(Vec::new());
            RgbaImage::new(5, 3)
                .write_to(&mut out, image::ImageFormat::Bmp)
                .unwrap();
            out.into_inner()
        });

        let (path, img) = paths(&[dir.path()]).load_icon("name").unwrap();
        assert_eq!(path, dir.path().join("name.bmp"));
        assert_eq!(img.dimensions(), (5, 3));
    }

    #[test]
    fn absolute_name_is_loaded_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.png");
        put(file.clone(), &png_bytes(9, 9));

        let sp = paths(&[]);
        let (path, _) = sp.load_icon(file.to_str().unwrap()).unwrap();
        assert_eq!(path, file);
        assert!(sp.load_icon("/nonexistent/icon.png").is_none());
        assert!(sp.load_icon("").is_none());
    }
}
