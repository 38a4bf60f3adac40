//! Retrieve the application icon of a running process or an executable and
//! decode it into an RGBA image.
//!
//! One backend is compiled per host:
//!
//! - **Windows**: the first `RT_GROUP_ICON` of the executable's resource
//!   section ([`resource`]).
//! - **macOS**: the running application's icon via AppKit ([`native`]).
//! - **Linux and other Unix**: `.desktop` entries and icon-theme
//!   directories ([`desktop`]).
//!
//! ```no_run
//! let icon = procicon::from_pid(std::process::id())?;
//! println!("{}x{}", icon.width(), icon.height());
//! # Ok::<(), procicon::IconError>(())
//! ```

pub mod config;
pub mod decode;
pub mod desktop;
pub mod error;
pub mod native;
pub mod process;
pub mod provider;
pub mod resource;

use image::RgbaImage;
use std::path::Path;

pub use config::{Config, load_config};
pub use error::{IconError, Result};
pub use provider::{IconProvider, PlatformProvider, platform_provider};

/// Icon of the application running as `pid`.
pub fn from_pid(pid: u32) -> Result<RgbaImage> {
    platform_provider(&Config::default()).icon_from_pid(pid)
}

/// Icon of the executable or bundle at `path`.
pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    platform_provider(&Config::default()).icon_from_path(path.as_ref())
}
