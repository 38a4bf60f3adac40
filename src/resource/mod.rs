//! Icon extraction from resource sections of executable modules.
//!
//! A module exposes `RT_GROUP_ICON` resources (directories of 14-byte
//! entries that reference `RT_ICON` resources by id) and the `RT_ICON`
//! images themselves. Only the first enumerated group is used; the OS
//! decides enumeration order.
//!
//! The OS side sits behind [`ModuleLoader`] / [`ResourceModule`]. A module is
//! released when its value is dropped, so every exit path unmaps it.

#[cfg(target_os = "windows")]
pub mod win32;

use image::RgbaImage;
use std::path::Path;
use tracing::{debug, info};

use crate::decode::{self, DISK_ENTRY_LEN, EntryData, EntryLayout, ICON_DIR_LEN, IconDir, IconDirEntry};
use crate::error::{IconError, Result};
use crate::process;
use crate::provider::IconProvider;

/// Resource types used for icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Icon,
    GroupIcon,
}

impl ResourceKind {
    /// Numeric `RT_*` id.
    pub fn id(self) -> u16 {
        match self {
            ResourceKind::Icon => 3,
            ResourceKind::GroupIcon => 14,
        }
    }
}

/// A resource name: integer id or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    Id(u16),
    Name(String),
}

/// Resource names of one type, in the order the module listed them.
#[derive(Debug)]
pub struct ResourceNames(std::vec::IntoIter<ResourceName>);

impl ResourceNames {
    pub fn new(names: Vec<ResourceName>) -> Self {
        ResourceNames(names.into_iter())
    }
}

impl Iterator for ResourceNames {
    type Item = ResourceName;

    fn next(&mut self) -> Option<ResourceName> {
        self.0.next()
    }
}

/// A mapped module whose resources can be enumerated and read.
pub trait ResourceModule {
    fn resource_names(&self, kind: ResourceKind) -> Result<ResourceNames>;

    /// Reads a resource into an owned buffer.
    fn read_resource(&self, kind: ResourceKind, name: &ResourceName) -> Result<Vec<u8>>;
}

/// Maps executables as resource-only modules.
pub trait ModuleLoader {
    type Module: ResourceModule;

    fn load(&self, path: &Path) -> Result<Self::Module>;
}

/// Directory of the first icon group in `module`.
pub fn first_icon_group<M: ResourceModule>(module: &M) -> Result<IconDir> {
    let name = module
        .resource_names(ResourceKind::GroupIcon)?
        .next()
        .ok_or(IconError::NoIconResource)?;
    debug!(group = ?name, "using first icon group");
    let data = module.read_resource(ResourceKind::GroupIcon, &name)?;
    IconDir::parse(&data, EntryLayout::Group)
}

fn entry_resource_id(entry: &IconDirEntry) -> Result<u16> {
    match entry.data {
        EntryData::ResourceId(id) => Ok(id),
        EntryData::Offset(_) => Err(IconError::MalformedContainer(
            "group entry carries a file offset".into(),
        )),
    }
}

fn read_icon_image<M: ResourceModule>(module: &M, entry: &IconDirEntry) -> Result<Vec<u8>> {
    let id = entry_resource_id(entry)?;
    let bytes = module.read_resource(ResourceKind::Icon, &ResourceName::Id(id))?;
    if bytes.is_empty() {
        return Err(IconError::ResourceReadError(format!("icon {id} is empty")));
    }
    Ok(bytes)
}

/// Best entry of the first icon group and its image bytes.
pub fn best_icon_image<M: ResourceModule>(module: &M) -> Result<(IconDirEntry, Vec<u8>)> {
    let group = first_icon_group(module)?;
    let best = *group
        .best_entry()
        .ok_or_else(|| IconError::MalformedContainer("icon group has no entries".into()))?;
    debug!(
        width = best.pixel_width(),
        height = best.pixel_height(),
        bit_count = best.bit_count,
        "selected icon group entry"
    );
    let bytes = read_icon_image(module, &best)?;
    Ok((best, bytes))
}

/// Decodes the largest image of the module's first icon group.
pub fn decode_module_icon<M: ResourceModule>(module: &M) -> Result<RgbaImage> {
    let (entry, bytes) = best_icon_image(module)?;
    decode::decode_icon_image(&bytes, Some(&entry))
}

/// Rebuilds an on-disk `.ico` from a group directory and its images.
///
/// `images[i]` belongs to `dir.entries[i]`. Offsets start right after the
/// directory and follow entry order.
pub fn assemble_icon_container(dir: &IconDir, images: &[Vec<u8>]) -> Result<Vec<u8>> {
    if dir.entries.len() != images.len() {
        return Err(IconError::MalformedContainer(format!(
            "{} entries but {} images",
            dir.entries.len(),
            images.len()
        )));
    }
    let count = u16::try_from(dir.entries.len())
        .map_err(|_| IconError::MalformedContainer("too many entries".into()))?;
    let table_len = ICON_DIR_LEN + dir.entries.len() * DISK_ENTRY_LEN;
    let total = table_len + images.iter().map(Vec::len).sum::<usize>();
    let total_u32 = u32::try_from(total)
        .map_err(|_| IconError::MalformedContainer("container exceeds 4 GiB".into()))?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&dir.reserved.to_le_bytes());
    out.extend_from_slice(&dir.kind.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());

    let mut offset = table_len as u32;
    for (entry, image) in dir.entries.iter().zip(images) {
        out.extend_from_slice(&[entry.width, entry.height, entry.color_count, entry.reserved]);
        out.extend_from_slice(&entry.planes.to_le_bytes());
        out.extend_from_slice(&entry.bit_count.to_le_bytes());
        out.extend_from_slice(&(image.len() as u32).to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        offset += image.len() as u32;
    }
    for image in images {
        out.extend_from_slice(image);
    }
    debug_assert_eq!(offset, total_u32);
    Ok(out)
}

/// Complete `.ico` byte stream for the module's first icon group.
pub fn module_icon_container<M: ResourceModule>(module: &M) -> Result<Vec<u8>> {
    let group = first_icon_group(module)?;
    let images = group
        .entries
        .iter()
        .map(|entry| read_icon_image(module, entry))
        .collect::<Result<Vec<_>>>()?;
    assemble_icon_container(&group, &images)
}

/// [`IconProvider`] backed by a module loader.
#[derive(Debug, Clone, Default)]
pub struct ResourceIconProvider<L> {
    loader: L,
}

impl<L: ModuleLoader> ResourceIconProvider<L> {
    pub fn new(loader: L) -> Self {
        ResourceIconProvider { loader }
    }

    /// The first icon group of `path` as a standalone `.ico` file.
    pub fn icon_container(&self, path: &Path) -> Result<Vec<u8>> {
        let module = self.loader.load(path)?;
        module_icon_container(&module)
    }
}

impl<L: ModuleLoader> IconProvider for ResourceIconProvider<L> {
    fn icon_from_pid(&self, pid: u32) -> Result<RgbaImage> {
        let exe = process::executable_path(pid)?;
        self.icon_from_path(&exe)
    }

    fn icon_from_path(&self, path: &Path) -> Result<RgbaImage> {
        let module = self.loader.load(path)?;
        let img = decode_module_icon(&module)?;
        info!(
            path = %path.display(),
            "Icon OK ({}x{}) [resource]",
            img.width(),
            img.height()
        );
        Ok(img)
    }
}
