//! Helpers built on top of stream files: extension checks, companion
//! files and chunk lookup.

use std::path::Path;

use super::streamfile::StreamHandle;

/// Extension of `name` without the dot, or "" if there is none.
pub fn filename_extension(name: &str) -> &str {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(pos) => &file[pos + 1..],
        None => "",
    }
}

/// Case-insensitive match of the file extension against a comma list.
pub fn check_extensions(sf: &StreamHandle, extensions: &str) -> bool {
    let name = sf.name();
    let ext = filename_extension(&name);
    extensions
        .split(',')
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(ext))
}

/// Directory part of `name`, including the trailing separator.
pub fn directory_prefix(name: &str) -> &str {
    match name.rfind(['/', '\\']) {
        Some(pos) => &name[..=pos],
        None => "",
    }
}

/// Open a sibling with the same base name and extension `ext`.
pub fn open_stream_ext(sf: &StreamHandle, ext: &str) -> Option<StreamHandle> {
    let name = sf.name();
    let base = match Path::new(&name).extension() {
        Some(old) => &name[..name.len() - old.len() - 1],
        None => name.as_str(),
    };
    sf.open(&format!("{}.{}", base, ext), super::STREAMFILE_DEFAULT_BUFFER_SIZE)
}

/// Load a decryption key of exactly `size` bytes.
///
/// Looks for `<name.ext>key` first and then a per-directory `.<ext>key`.
pub fn read_key_file(sf: &StreamHandle, size: usize) -> Option<Vec<u8>> {
    let name = sf.name();
    let ext = filename_extension(&name);
    let candidates = [
        format!("{}key", name),
        format!("{}.{}key", directory_prefix(&name), ext),
    ];

    let key_sf = candidates
        .iter()
        .find_map(|candidate| sf.open(candidate, size.max(1)))?;

    if key_sf.size() != size as u64 {
        log::debug!("{}: key file size 0x{:x} != 0x{:x}", key_sf.name(), key_sf.size(), size);
        return None;
    }
    let mut key = vec![0u8; size];
    if key_sf.read(&mut key, 0) != size {
        return None;
    }
    Some(key)
}

/// Load up to `size` bytes of `<name.ext>.pos`, zero padded.
pub fn read_pos_file(sf: &StreamHandle, size: usize) -> Option<Vec<u8>> {
    let pos_sf = sf.open(&format!("{}.pos", sf.name()), size.max(1))?;
    let mut data = vec![0u8; size];
    pos_sf.read(&mut data, 0);
    Some(data)
}

/// Location of a chunk found by [`find_chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Offset of the chunk body.
    pub offset: u64,
    /// Size of the chunk body.
    pub size: u32,
}

/// Walk an `id size body` chunk list looking for `chunk_id` (big endian).
///
/// With `full_chunk_size` the size field counts the 8-byte chunk header
/// too. A zero-sized chunk ends the search.
pub fn find_chunk(
    sf: &StreamHandle,
    chunk_id: u32,
    start_offset: u64,
    full_chunk_size: bool,
    big_endian_size: bool,
) -> Option<ChunkLocation> {
    let file_size = sf.size();
    let mut offset = start_offset;

    while offset + 8 <= file_size {
        let id = sf.read_u32be(offset);
        let size = if big_endian_size {
            sf.read_u32be(offset + 4)
        } else {
            sf.read_u32le(offset + 4)
        };

        if id == chunk_id {
            let body = if full_chunk_size { size.saturating_sub(8) } else { size };
            return Some(ChunkLocation {
                offset: offset + 8,
                size: body,
            });
        }
        if size == 0 {
            return None;
        }
        offset += if full_chunk_size { size as u64 } else { size as u64 + 8 };
    }
    None
}

pub fn find_chunk_be(sf: &StreamHandle, chunk_id: u32, start_offset: u64) -> Option<ChunkLocation> {
    find_chunk(sf, chunk_id, start_offset, false, true)
}

pub fn find_chunk_le(sf: &StreamHandle, chunk_id: u32, start_offset: u64) -> Option<ChunkLocation> {
    find_chunk(sf, chunk_id, start_offset, false, false)
}
