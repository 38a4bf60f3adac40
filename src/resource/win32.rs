use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;
use windows::Win32::Foundation::{
    BOOL, ERROR_RESOURCE_TYPE_NOT_FOUND, FreeLibrary, HANDLE, HMODULE, TRUE,
};
use windows::Win32::System::LibraryLoader::{
    EnumResourceNamesW, FindResourceW, LOAD_LIBRARY_AS_DATAFILE, LOAD_LIBRARY_AS_IMAGE_RESOURCE,
    LoadLibraryExW, LoadResource, LockResource, SizeofResource,
};
use windows::core::PCWSTR;

use super::{ModuleLoader, ResourceKind, ResourceModule, ResourceName, ResourceNames};
use crate::error::{IconError, Result};

fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(std::iter::once(0)).collect()
}

/// `MAKEINTRESOURCE`.
fn int_resource(id: u16) -> PCWSTR {
    PCWSTR(id as usize as *const u16)
}

fn is_int_resource(name: PCWSTR) -> bool {
    (name.0 as usize) >> 16 == 0
}

/// Loads modules with `LoadLibraryExW` as data-only resource images.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Modules;

impl ModuleLoader for Win32Modules {
    type Module = Win32Module;

    fn load(&self, path: &Path) -> Result<Win32Module> {
        let wide_path = to_wide(path.as_os_str());
        let module = unsafe {
            LoadLibraryExW(
                PCWSTR(wide_path.as_ptr()),
                HANDLE::default(),
                LOAD_LIBRARY_AS_DATAFILE | LOAD_LIBRARY_AS_IMAGE_RESOURCE,
            )
        }
        .map_err(|e| IconError::LoadError {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;

        if module.is_invalid() {
            return Err(IconError::LoadError {
                path: path.to_path_buf(),
                reason: "invalid module handle".into(),
            });
        }
        debug!(path = %path.display(), "mapped module as resource image");
        Ok(Win32Module(module))
    }
}

/// A module mapped with `LOAD_LIBRARY_AS_DATAFILE`; freed on drop.
#[derive(Debug)]
pub struct Win32Module(HMODULE);

impl Drop for Win32Module {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = FreeLibrary(self.0);
            }
        }
    }
}

unsafe extern "system" fn collect_name(
    _module: HMODULE,
    _kind: PCWSTR,
    name: PCWSTR,
    lparam: isize,
) -> BOOL {
    let names = unsafe { &mut *(lparam as *mut Vec<ResourceName>) };
    if is_int_resource(name) {
        names.push(ResourceName::Id(name.0 as usize as u16));
    } else if let Ok(s) = unsafe { name.to_string() } {
        // string names point into the mapped image, copy them out
        names.push(ResourceName::Name(s));
    }
    TRUE
}

impl ResourceModule for Win32Module {
    fn resource_names(&self, kind: ResourceKind) -> Result<ResourceNames> {
        let mut names: Vec<ResourceName> = Vec::new();
        let enumerated = unsafe {
            EnumResourceNamesW(
                self.0,
                int_resource(kind.id()),
                Some(collect_name),
                &mut names as *mut Vec<ResourceName> as isize,
            )
        };
        if let Err(e) = enumerated {
            if e.code() != ERROR_RESOURCE_TYPE_NOT_FOUND.to_hresult() && names.is_empty() {
                return Err(IconError::ResourceReadError(format!(
                    "enumerating {kind:?} resources: {}",
                    e.message()
                )));
            }
        }
        Ok(ResourceNames::new(names))
    }

    fn read_resource(&self, kind: ResourceKind, name: &ResourceName) -> Result<Vec<u8>> {
        let wide_name;
        let name_ptr = match name {
            ResourceName::Id(id) => int_resource(*id),
            ResourceName::Name(s) => {
                wide_name = to_wide(OsStr::new(s));
                PCWSTR(wide_name.as_ptr())
            }
        };
        let fail = |step: &str| IconError::ResourceReadError(format!("{step} failed for {kind:?} {name:?}"));

        unsafe {
            let info = FindResourceW(self.0, name_ptr, int_resource(kind.id()));
            if info.is_invalid() {
                return Err(fail("FindResourceW"));
            }
            let size = SizeofResource(self.0, info);
            if size == 0 {
                return Err(fail("SizeofResource"));
            }
            let handle = LoadResource(self.0, info).map_err(|_| fail("LoadResource"))?;
            let data = LockResource(handle);
            if data.is_null() {
                return Err(fail("LockResource"));
            }
            // resource memory lives only as long as the mapping
            let bytes = std::slice::from_raw_parts(data as *const u8, size as usize).to_vec();
            Ok(bytes)
        }
    }
}
