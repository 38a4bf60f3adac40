//! Container decoders: turn PNG, BMP, ICO (and TIFF, for the native bridge)
//! byte buffers into a uniform RGBA image.
//!
//! Sniffing order is PNG signature, then the ICO/CUR magic, then a plain
//! bitmap file. ICO payloads are either PNG streams or headerless device
//! independent bitmaps (DIBs); the latter get a synthesized `BITMAPFILEHEADER`
//! so the stock BMP decoder can read them.

use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::{IconError, Result};

pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";
pub const ICO_SIGNATURE: [u8; 4] = [0x00, 0x00, 0x01, 0x00];
const BMP_SIGNATURE: [u8; 2] = *b"BM";

/// `ICONDIR`: reserved, type, count.
pub const ICON_DIR_LEN: usize = 6;
/// `ICONDIRENTRY` as stored in `.ico` files.
pub const DISK_ENTRY_LEN: usize = 16;
/// `GRPICONDIRENTRY` as stored in `RT_GROUP_ICON` resources.
pub const GROUP_ENTRY_LEN: usize = 14;

pub const FILE_HEADER_LEN: usize = 14;
pub const INFO_HEADER_LEN: usize = 40;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;

pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}

pub fn is_ico(data: &[u8]) -> bool {
    data.starts_with(&ICO_SIGNATURE)
}

fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn le_i32(data: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Where an entry's image bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryData {
    /// Byte offset from the start of an `.ico` file.
    Offset(u32),
    /// `RT_ICON` resource id inside a module.
    ResourceId(u16),
}

/// Layout of the entries following the 6-byte directory header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLayout {
    /// 16-byte entries with a trailing u32 file offset.
    Disk,
    /// 14-byte entries with a trailing u16 resource id.
    Group,
}

impl EntryLayout {
    pub fn entry_len(self) -> usize {
        match self {
            EntryLayout::Disk => DISK_ENTRY_LEN,
            EntryLayout::Group => GROUP_ENTRY_LEN,
        }
    }
}

/// One candidate image inside a multi-resolution icon container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconDirEntry {
    pub width: u8,       // 0 means 256
    pub height: u8,      // 0 means 256
    pub color_count: u8, // 0 means no palette or >= 256 colours
    pub reserved: u8,
    pub planes: u16,
    pub bit_count: u16,
    pub bytes_in_res: u32,
    pub data: EntryData,
}

impl IconDirEntry {
    pub fn pixel_width(&self) -> u32 {
        if self.width == 0 { 256 } else { self.width as u32 }
    }

    pub fn pixel_height(&self) -> u32 {
        if self.height == 0 { 256 } else { self.height as u32 }
    }

    pub fn area(&self) -> u32 {
        self.pixel_width() * self.pixel_height()
    }

    fn parse(raw: &[u8], layout: EntryLayout) -> Self {
        let data = match layout {
            EntryLayout::Disk => EntryData::Offset(le_u32(raw, 12)),
            EntryLayout::Group => EntryData::ResourceId(le_u16(raw, 12)),
        };
        IconDirEntry {
            width: raw[0],
            height: raw[1],
            color_count: raw[2],
            reserved: raw[3],
            planes: le_u16(raw, 4),
            bit_count: le_u16(raw, 6),
            bytes_in_res: le_u32(raw, 8),
            data,
        }
    }
}

/// Parsed `ICONDIR` header plus its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconDir {
    pub reserved: u16,
    pub kind: u16,
    pub entries: Vec<IconDirEntry>,
}

impl IconDir {
    /// Parses a directory. The entry table must lie fully inside `data`.
    pub fn parse(data: &[u8], layout: EntryLayout) -> Result<Self> {
        if data.len() < ICON_DIR_LEN {
            return Err(IconError::MalformedContainer(format!(
                "directory header needs {ICON_DIR_LEN} bytes, got {}",
                data.len()
            )));
        }
        let count = le_u16(data, 4) as usize;
        if count == 0 {
            return Err(IconError::MalformedContainer("directory has no entries".into()));
        }
        let entry_len = layout.entry_len();
        let table_end = ICON_DIR_LEN + count * entry_len;
        if table_end > data.len() {
            return Err(IconError::MalformedContainer(format!(
                "{count} entries need {table_end} bytes, container has {}",
                data.len()
            )));
        }

        let entries = data[ICON_DIR_LEN..table_end]
            .chunks_exact(entry_len)
            .map(|raw| IconDirEntry::parse(raw, layout))
            .collect();

        Ok(IconDir {
            reserved: le_u16(data, 0),
            kind: le_u16(data, 2),
            entries,
        })
    }

    pub fn best_entry(&self) -> Option<&IconDirEntry> {
        select_best(&self.entries)
    }
}

/// Picks the entry with the largest width × height.
///
/// Ties keep the first entry in directory order. The choice carries no
/// meaning beyond being repeatable.
pub fn select_best<'a, I>(entries: I) -> Option<&'a IconDirEntry>
where
    I: IntoIterator<Item = &'a IconDirEntry>,
{
    entries.into_iter().fold(None, |best, entry| match best {
        Some(current) if entry.area() <= current.area() => Some(current),
        _ => Some(entry),
    })
}

/// Decodes any supported buffer, dispatching on its signature.
pub fn decode(data: &[u8]) -> Result<RgbaImage> {
    if is_png(data) {
        decode_png(data)
    } else if is_ico(data) {
        decode_icon_container(data)
    } else if data.starts_with(&BMP_SIGNATURE) {
        decode_bmp(data)
    } else {
        Err(IconError::UnsupportedFormat)
    }
}

pub fn decode_png(data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Png)?;
    non_empty(img.to_rgba8())
}

pub fn decode_bmp(data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Bmp)?;
    non_empty(img.to_rgba8())
}

/// Decodes a TIFF stream, taking the decoder's first (default) frame.
pub fn decode_tiff(data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Tiff)?;
    non_empty(img.to_rgba8())
}

fn non_empty(img: RgbaImage) -> Result<RgbaImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(IconError::MalformedContainer("decoded image is empty".into()));
    }
    Ok(img)
}

/// Decodes the largest image of an `.ico`/`.cur` file.
pub fn decode_icon_container(data: &[u8]) -> Result<RgbaImage> {
    let dir = IconDir::parse(data, EntryLayout::Disk)?;
    let best = dir
        .best_entry()
        .ok_or_else(|| IconError::MalformedContainer("directory has no entries".into()))?;
    let payload = entry_payload(data, best)?;

    debug!(
        width = best.pixel_width(),
        height = best.pixel_height(),
        bytes = payload.len(),
        "selected icon container entry"
    );
    decode_icon_image(payload, Some(best))
}

/// Bounds-checked slice of the bytes an on-disk entry points at.
pub fn entry_payload<'a>(data: &'a [u8], entry: &IconDirEntry) -> Result<&'a [u8]> {
    let EntryData::Offset(offset) = entry.data else {
        return Err(IconError::MalformedContainer(
            "entry references a resource id, not a file offset".into(),
        ));
    };
    let start = offset as usize;
    let len = entry.bytes_in_res as usize;
    if len == 0 {
        return Err(IconError::MalformedContainer("entry has zero length".into()));
    }
    match start.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[start..end]),
        _ => Err(IconError::MalformedContainer(format!(
            "entry at {offset}+{len} exceeds container of {} bytes",
            data.len()
        ))),
    }
}

/// Decodes one icon image: PNG as-is, anything else as a headerless DIB.
pub fn decode_icon_image(payload: &[u8], entry: Option<&IconDirEntry>) -> Result<RgbaImage> {
    if is_png(payload) {
        decode_png(payload)
    } else {
        decode_dib(payload, entry)
    }
}

/// Fields of a DIB info header that matter for file-header synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DibInfo {
    pub header_len: u32,
    pub width: i32,
    pub height: i32,
    pub bit_count: u16,
    pub compression: u32,
    pub colors_used: u32,
}

impl DibInfo {
    pub fn parse(dib: &[u8]) -> Result<Self> {
        if dib.len() < INFO_HEADER_LEN {
            return Err(IconError::MalformedContainer(format!(
                "bitmap needs a {INFO_HEADER_LEN}-byte info header, got {} bytes",
                dib.len()
            )));
        }
        let header_len = le_u32(dib, 0);
        if (header_len as usize) < INFO_HEADER_LEN || header_len as usize > dib.len() {
            return Err(IconError::MalformedContainer(format!(
                "invalid info header size {header_len}"
            )));
        }
        Ok(DibInfo {
            header_len,
            width: le_i32(dib, 4),
            height: le_i32(dib, 8),
            bit_count: le_u16(dib, 14),
            compression: le_u32(dib, 16),
            colors_used: le_u32(dib, 32),
        })
    }

    /// Offset of the pixel array from the start of the info header.
    pub fn pixel_offset(&self, color_count: u32) -> u32 {
        let masks = match (self.header_len as usize, self.compression) {
            (INFO_HEADER_LEN, BI_BITFIELDS) => 12,
            _ => 0,
        };
        self.header_len
            .saturating_add(masks)
            .saturating_add(palette_len(self.bit_count, color_count))
    }
}

/// Palette size in bytes.
///
/// Indexed images (<= 8 bpp) without an explicit colour count carry a full
/// `2^bit_count` palette; 16/24/32 bpp images carry none.
pub fn palette_len(bit_count: u16, color_count: u32) -> u32 {
    match bit_count {
        1..=8 if color_count == 0 => 4 * (1u32 << bit_count),
        1..=8 => color_count.saturating_mul(4),
        _ => 0,
    }
}

/// Prepends a `BITMAPFILEHEADER` to a headerless DIB.
///
/// When `entry` is given the info header's height is reset to the entry
/// height if it stores the doubled XOR+AND height, so the AND mask rows are
/// not decoded as colour rows.
pub fn synthesize_bitmap_file(dib: &[u8], entry: Option<&IconDirEntry>) -> Result<(Vec<u8>, DibInfo)> {
    let mut info = DibInfo::parse(dib)?;

    if let Some(entry) = entry {
        let h = entry.pixel_height();
        if info.height.unsigned_abs() == 2 * h {
            info.height = info.height.signum() * h as i32;
        }
    }

    let color_count = if info.colors_used != 0 {
        info.colors_used
    } else {
        entry.map(|e| e.color_count as u32).unwrap_or(0)
    };
    let data_offset = (FILE_HEADER_LEN as u32).saturating_add(info.pixel_offset(color_count));
    let file_len = FILE_HEADER_LEN + dib.len();
    if data_offset as usize > file_len {
        return Err(IconError::MalformedContainer(format!(
            "pixel data offset {data_offset} exceeds bitmap of {file_len} bytes"
        )));
    }

    let mut file = Vec::with_capacity(file_len);
    file.extend_from_slice(&BMP_SIGNATURE);
    file.extend_from_slice(&(file_len as u32).to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&data_offset.to_le_bytes());
    file.extend_from_slice(dib);
    file[FILE_HEADER_LEN + 8..FILE_HEADER_LEN + 12].copy_from_slice(&info.height.to_le_bytes());

    Ok((file, info))
}

/// Decodes a headerless DIB (the non-PNG payload of an icon entry).
pub fn decode_dib(dib: &[u8], entry: Option<&IconDirEntry>) -> Result<RgbaImage> {
    let (file, info) = synthesize_bitmap_file(dib, entry)?;
    let mut img = decode_bmp(&file)?;

    if info.bit_count == 32 && info.compression == BI_RGB {
        let pixels = &file[le_u32(&file, 10) as usize..];
        restore_alpha(&mut img, pixels, info.height > 0);
    }
    Ok(img)
}

/// Copies the fourth byte of each 32-bpp source pixel into the alpha channel.
///
/// Legacy icons leave that byte zeroed and rely on the AND mask; those are
/// left opaque.
fn restore_alpha(img: &mut RgbaImage, pixels: &[u8], bottom_up: bool) {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let stride = w * 4;
    if pixels.len() < stride * h {
        return;
    }
    let alpha_at = |x: usize, y: usize| {
        let row = if bottom_up { h - 1 - y } else { y };
        pixels[row * stride + x * 4 + 3]
    };
    let has_alpha = (0..h).any(|y| (0..w).any(|x| alpha_at(x, y) != 0));
    if !has_alpha {
        return;
    }
    for (x, y, px) in img.enumerate_pixels_mut() {
        px.0[3] = alpha_at(x as usize, y as usize);
    }
}
