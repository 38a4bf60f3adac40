use image::{ImageFormat, Rgba, RgbaImage};
use procicon::config::{Config, SearchPaths};
use procicon::decode::{self, EntryLayout, IconDir};
use procicon::desktop::DesktopIconProvider;
use procicon::{IconError, IconProvider};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn png(size: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(size, size, Rgba([200, 100, 50, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn ico(sizes: &[u32]) -> Vec<u8> {
    let payloads: Vec<Vec<u8>> = sizes.iter().map(|s| png(*s)).collect();
    let mut out = vec![0, 0, 1, 0];
    out.extend_from_slice(&(sizes.len() as u16).to_le_bytes());
    let mut offset = 6 + 16 * sizes.len() as u32;
    for (size, payload) in sizes.iter().zip(&payloads) {
        let dim = if *size >= 256 { 0 } else { *size as u8 };
        out.extend_from_slice(&[dim, dim, 0, 0, 1, 0, 32, 0]);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        offset += payload.len() as u32;
    }
    for payload in &payloads {
        out.extend_from_slice(payload);
    }
    out
}

fn write(path: PathBuf, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

#[test]
fn ico_selection_prefers_256() {
    let data = ico(&[16, 32, 48, 256]);
    let dir = IconDir::parse(&data, EntryLayout::Disk).unwrap();
    let best = dir.best_entry().unwrap();
    assert_eq!((best.width, best.height), (0, 0));
    assert_eq!(decode::decode(&data).unwrap().dimensions(), (256, 256));
}

#[test]
fn desktop_lookup_end_to_end() {
    let home = tempfile::tempdir().unwrap();
    let system = tempfile::tempdir().unwrap();

    let config = Config {
        application_dirs: vec!["~/.local/share/applications".into()],
        icon_dirs: vec![
            "~/.local/share/icons".into(),
            system.path().join("pixmaps").to_string_lossy().into_owned(),
        ],
        ..Config::default()
    };
    let paths: SearchPaths = config.search_paths(Some(home.path()));

    write(
        home.path().join(".local/share/applications/app.desktop"),
        b"[Desktop Entry]\nType=Application\nExec=env FOO=1 /usr/bin/app --flag\nIcon=app-icon\n",
    );
    write(
        home.path().join(".local/share/icons/hicolor/48x48/apps/app-icon.ico"),
        &ico(&[16, 48]),
    );
    write(system.path().join("pixmaps/app-icon.png"), &png(24));

    let provider = DesktopIconProvider::new(paths);
    let img = provider.icon_from_path(Path::new("/usr/bin/app")).unwrap();
    assert_eq!(img.dimensions(), (48, 48));

    let err = provider.icon_from_path(Path::new("/usr/bin/unknown")).unwrap_err();
    assert!(matches!(err, IconError::IconNotFound { .. }));
}

#[cfg(target_os = "linux")]
#[test]
fn dead_pid_is_process_not_found() {
    let err = procicon::from_pid(u32::MAX - 1).unwrap_err();
    assert!(matches!(err, IconError::ProcessNotFound { .. }));
}
