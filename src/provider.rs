//! The platform seam: one capability, one implementation per host OS.

use image::RgbaImage;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// Looks up the application icon for a process or an executable.
pub trait IconProvider {
    fn icon_from_pid(&self, pid: u32) -> Result<RgbaImage>;
    fn icon_from_path(&self, path: &Path) -> Result<RgbaImage>;
}

#[cfg(target_os = "windows")]
pub type PlatformProvider = crate::resource::ResourceIconProvider<crate::resource::win32::Win32Modules>;

#[cfg(target_os = "macos")]
pub type PlatformProvider = crate::native::NativeIconProvider;

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub type PlatformProvider = crate::desktop::DesktopIconProvider;

/// Builds the provider for the host this crate was compiled for.
#[cfg(target_os = "windows")]
pub fn platform_provider(_config: &Config) -> PlatformProvider {
    crate::resource::ResourceIconProvider::new(crate::resource::win32::Win32Modules)
}

#[cfg(target_os = "macos")]
pub fn platform_provider(config: &Config) -> PlatformProvider {
    crate::native::NativeIconProvider::new(config.max_representation_bytes)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn platform_provider(config: &Config) -> PlatformProvider {
    crate::desktop::DesktopIconProvider::from_config(config)
}
