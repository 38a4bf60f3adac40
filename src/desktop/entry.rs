//! `.desktop` file matching.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";

/// The keys of a `[Desktop Entry]` group that matter for icon lookup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    pub icon: Option<String>,
    pub exec: Option<String>,
    pub try_exec: Option<String>,
}

impl DesktopEntry {
    /// Parses the `[Desktop Entry]` group, ignoring every other group.
    pub fn parse(content: &str) -> Self {
        let mut entry = DesktopEntry::default();
        let mut in_entry = false;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                in_entry = line == DESKTOP_ENTRY_GROUP;
                continue;
            }
            if !in_entry {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "Icon" => entry.icon = Some(value),
                "Exec" => entry.exec = Some(value),
                "TryExec" => entry.try_exec = Some(value),
                _ => {}
            }
        }
        entry
    }

    /// True when `Exec` or `TryExec` names `exe_path` or its file name.
    pub fn launches(&self, exe_path: &Path) -> bool {
        let exec = self.exec.as_deref().and_then(exec_program);
        let try_exec = self.try_exec.as_deref();
        [exec, try_exec]
            .into_iter()
            .flatten()
            .any(|program| same_program(program, exe_path))
    }
}

/// Program token of an `Exec` line, skipping an `env VAR=val ...` prefix.
pub fn exec_program(exec: &str) -> Option<&str> {
    let mut fields = exec.split_whitespace().peekable();
    if fields.peek() == Some(&"env") {
        fields.next();
        while fields.peek().is_some_and(|f| f.contains('=')) {
            fields.next();
        }
    }
    fields.next().map(|f| f.trim_matches('"'))
}

fn same_program(program: &str, exe_path: &Path) -> bool {
    let program = Path::new(program);
    program == exe_path || (program.file_name().is_some() && program.file_name() == exe_path.file_name())
}

/// Icon name of the first desktop entry, in directory priority order, that
/// launches `exe_path` and names an icon.
pub fn find_icon_name(application_dirs: &[PathBuf], exe_path: &Path) -> Option<String> {
    for dir in application_dirs {
        for file in desktop_files(dir) {
            let content = match fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping unreadable desktop entry");
                    continue;
                }
            };
            let entry = DesktopEntry::parse(&content);
            if let Some(icon) = entry.icon.as_ref().filter(|_| entry.launches(exe_path)) {
                debug!(file = %file.display(), icon, "matched desktop entry");
                return Some(icon.clone());
            }
        }
    }
    None
}

/// `*.desktop` files directly under `dir`, sorted by name.
fn desktop_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "desktop") && p.is_file())
        .collect();
    files.sort();
    files
}
