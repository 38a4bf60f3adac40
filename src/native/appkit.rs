use image::RgbaImage;
use objc2::rc::{Retained, autoreleasepool};
use objc2_app_kit::{NSImage, NSRunningApplication, NSWorkspace};
use objc2_foundation::NSString;
use std::path::Path;
use tracing::info;

use super::{copy_representation, decode_representation};
use crate::config::DEFAULT_MAX_REPRESENTATION_BYTES;
use crate::error::{IconError, Result};
use crate::provider::IconProvider;

/// [`IconProvider`] backed by AppKit.
///
/// Every framework object is held as a `Retained` and released when it goes
/// out of scope, after the representation bytes have been copied.
#[derive(Debug, Clone, Copy)]
pub struct NativeIconProvider {
    max_representation_bytes: usize,
}

impl Default for NativeIconProvider {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REPRESENTATION_BYTES)
    }
}

impl NativeIconProvider {
    pub fn new(max_representation_bytes: usize) -> Self {
        NativeIconProvider {
            max_representation_bytes,
        }
    }

    fn tiff_bytes(&self, icon: &NSImage) -> Result<Vec<u8>> {
        let data = unsafe { icon.TIFFRepresentation() }
            .ok_or_else(|| IconError::ResourceReadError("icon has no TIFF representation".into()))?;
        copy_representation(data.length(), self.max_representation_bytes, || data.to_vec())
    }
}

fn running_application(pid: u32) -> Result<Retained<NSRunningApplication>> {
    let pid_t = i32::try_from(pid).map_err(|_| IconError::ProcessNotFound { pid })?;
    unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(pid_t) }
        .ok_or(IconError::ProcessNotFound { pid })
}

impl IconProvider for NativeIconProvider {
    fn icon_from_pid(&self, pid: u32) -> Result<RgbaImage> {
        let bytes = autoreleasepool(|_| {
            let app = running_application(pid)?;
            let icon = unsafe { app.icon() }.ok_or(IconError::NoIconResource)?;
            self.tiff_bytes(&icon)
        })?;
        let img = decode_representation(&bytes)?;
        info!(pid, "Icon OK ({}x{}) [appkit]", img.width(), img.height());
        Ok(img)
    }

    fn icon_from_path(&self, path: &Path) -> Result<RgbaImage> {
        let bytes = autoreleasepool(|_| {
            let ns_path = NSString::from_str(&path.to_string_lossy());
            let workspace = unsafe { NSWorkspace::sharedWorkspace() };
            let icon = unsafe { workspace.iconForFile(&ns_path) };
            self.tiff_bytes(&icon)
        })?;
        let img = decode_representation(&bytes)?;
        info!(path = %path.display(), "Icon OK ({}x{}) [appkit]", img.width(), img.height());
        Ok(img)
    }
}
