//! Maps a pid to the path of the executable image backing it.

use std::path::PathBuf;

use crate::error::Result;

/// Absolute path of the executable running as `pid`.
pub fn executable_path(pid: u32) -> Result<PathBuf> {
    imp::executable_path(pid)
}

#[cfg(unix)]
mod imp {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};
    use tracing::debug;

    use crate::error::{IconError, Result};

    const DELETED_SUFFIX: &str = " (deleted)";

    pub fn executable_path(pid: u32) -> Result<PathBuf> {
        exe_link(Path::new("/proc"), pid)
    }

    /// Reads `<proc_root>/<pid>/exe`.
    pub(crate) fn exe_link(proc_root: &Path, pid: u32) -> Result<PathBuf> {
        let link = proc_root.join(pid.to_string()).join("exe");
        let target = std::fs::read_link(&link).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => IconError::AccessDenied { pid },
            _ => IconError::ProcessNotFound { pid },
        })?;
        debug!(pid, exe = %target.display(), "resolved process executable");

        // the kernel tags images that were unlinked after exec
        match target.to_str().and_then(|s| s.strip_suffix(DELETED_SUFFIX)) {
            Some(stripped) => Ok(PathBuf::from(stripped)),
            None => Ok(target),
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::path::PathBuf;
    use tracing::debug;
    use windows::Win32::Foundation::{CloseHandle, E_ACCESSDENIED, HANDLE};
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
        QueryFullProcessImageNameW,
    };
    use windows::core::PWSTR;

    use crate::error::{IconError, Result};

    struct ProcessHandle(HANDLE);

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            if !self.0.is_invalid() {
                unsafe {
                    let _ = CloseHandle(self.0);
                }
            }
        }
    }

    pub fn executable_path(pid: u32) -> Result<PathBuf> {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map(ProcessHandle)
            .map_err(|e| {
                if e.code() == E_ACCESSDENIED {
                    IconError::AccessDenied { pid }
                } else {
                    IconError::ProcessNotFound { pid }
                }
            })?;

        let mut buffer = [0u16; 1024];
        let mut size = buffer.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                handle.0,
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut size,
            )
        }
        .map_err(|e| {
            if e.code() == E_ACCESSDENIED {
                IconError::AccessDenied { pid }
            } else {
                IconError::ProcessNotFound { pid }
            }
        })?;

        let path = PathBuf::from(String::from_utf16_lossy(&buffer[..size as usize]));
        debug!(pid, exe = %path.display(), "resolved process executable");
        Ok(path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::imp::exe_link;
    use crate::error::IconError;
    use std::path::{Path, PathBuf};

    #[test]
    fn reads_exe_link() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("4242")).unwrap();
        std::os::unix::fs::symlink("/usr/bin/app", root.path().join("4242/exe")).unwrap();

        let path = exe_link(root.path(), 4242).unwrap();
        assert_eq!(path, PathBuf::from("/usr/bin/app"));
    }

    #[test]
    fn strips_deleted_marker() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("7")).unwrap();
        std::os::unix::fs::symlink("/opt/tool (deleted)", root.path().join("7/exe")).unwrap();

        assert_eq!(exe_link(root.path(), 7).unwrap(), Path::new("/opt/tool"));
    }

    #[test]
    fn missing_pid_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            exe_link(root.path(), 99),
            Err(IconError::ProcessNotFound { pid: 99 })
        ));
    }
}
