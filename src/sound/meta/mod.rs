//! Container format parsers
//!
//! Each parser looks at a stream file and either builds a [`VgmStream`]
//! or says the file is not its format. [`init_vgmstream`] tries them in
//! order and sanity-checks whatever comes back.

pub mod ast;
pub mod fsb5;
pub mod genh;
pub mod riff;

use crate::io::{open_stdio_streamfile_buffer, read_pos_file, StreamHandle, STREAMFILE_DEFAULT_BUFFER_SIZE};

use super::channel::ChannelState;
use super::decoder::{DecodeError, DecodeResult};
use super::stream::VgmStream;

/// Most channels a stream may declare.
pub const MAX_CHANNELS: usize = 64;
const MIN_SAMPLE_RATE: u32 = 300;
const MAX_SAMPLE_RATE: u32 = 192_000;

/// Parser entry point: stream file and 1-based subsong index.
pub type MetaParser = fn(&StreamHandle, usize) -> DecodeResult<VgmStream>;

#[derive(Debug, Clone, Copy)]
pub struct MetaEntry {
    pub name: &'static str,
    pub parse: MetaParser,
}

static METAS: &[MetaEntry] = &[
    MetaEntry { name: "RIFF WAVE", parse: riff::init_riff },
    MetaEntry { name: "GENH", parse: genh::init_genh },
    MetaEntry { name: "AST", parse: ast::init_ast },
    MetaEntry { name: "FSB5", parse: fsb5::init_fsb5 },
];

/// Registered parsers, in the order they are tried.
pub fn registered_metas() -> &'static [MetaEntry] {
    METAS
}

/// Open `path` and build a stream from the first parser that accepts it.
pub fn init_vgmstream(path: &str, stream_index: usize) -> Option<VgmStream> {
    init_vgmstream_buffer(path, stream_index, STREAMFILE_DEFAULT_BUFFER_SIZE)
}

pub fn init_vgmstream_buffer(path: &str, stream_index: usize, buffer_size: usize) -> Option<VgmStream> {
    let sf = open_stdio_streamfile_buffer(path, buffer_size)?;
    init_vgmstream_from_streamfile(&sf, stream_index)
}

pub fn init_vgmstream_from_streamfile(sf: &StreamHandle, stream_index: usize) -> Option<VgmStream> {
    let stream_index = stream_index.max(1);
    for meta in METAS {
        match (meta.parse)(sf, stream_index) {
            Ok(mut stream) => {
                if let Err(e) = check_stream(&mut stream) {
                    log::warn!("{}: {} parser produced a bad stream: {}", sf.name(), meta.name, e);
                    continue;
                }
                apply_pos_file(sf, &mut stream);
                stream.commit_header();
                log::debug!("{}: opened as {}", sf.name(), meta.name);
                return Some(stream);
            }
            Err(DecodeError::UnsupportedFormat(_)) => continue,
            Err(e) => {
                log::warn!("{}: {}: {}", sf.name(), meta.name, e);
                continue;
            }
        }
    }
    log::debug!("{}: no parser recognized the file", sf.name());
    None
}

/// Reject impossible streams and drop unusable loop points.
fn check_stream(stream: &mut VgmStream) -> DecodeResult<()> {
    let header = &mut stream.header;
    if header.channels == 0 || header.channels > MAX_CHANNELS {
        return Err(DecodeError::InvalidData(format!("{} channels", header.channels)));
    }
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&header.sample_rate) {
        return Err(DecodeError::InvalidData(format!("sample rate {}", header.sample_rate)));
    }
    if header.num_samples == 0 {
        return Err(DecodeError::InvalidData("no samples".into()));
    }
    if stream.ch.len() != header.channels {
        return Err(DecodeError::InvalidData(format!(
            "{} channel cursors for {} channels",
            stream.ch.len(),
            header.channels
        )));
    }
    if header.loop_flag && !header.loop_points_valid() {
        log::warn!(
            "Ignoring loop points {}..{} ({} samples)",
            header.loop_start_sample,
            header.loop_end_sample,
            header.num_samples
        );
        header.loop_flag = false;
    }
    Ok(())
}

/// Loop points from a `<file>.pos` companion: u32 LE start and end.
fn apply_pos_file(sf: &StreamHandle, stream: &mut VgmStream) {
    let Some(pos) = read_pos_file(sf, 8) else {
        return;
    };
    let start = u32::from_le_bytes([pos[0], pos[1], pos[2], pos[3]]) as usize;
    let end = u32::from_le_bytes([pos[4], pos[5], pos[6], pos[7]]) as usize;
    if stream.force_loop(true, start, end) {
        log::debug!("{}: loop points {}..{} from .pos file", sf.name(), start, end);
    }
}

/// One handle and cursor per channel, each starting at `offset(channel)`.
pub(crate) fn open_channels(
    sf: &StreamHandle,
    channels: usize,
    offset: impl Fn(usize) -> u64,
) -> DecodeResult<Vec<ChannelState>> {
    (0..channels)
        .map(|index| {
            let handle = sf
                .reopen(STREAMFILE_DEFAULT_BUFFER_SIZE)
                .ok_or_else(|| DecodeError::MissingFile(sf.name()))?;
            Ok(ChannelState::new(handle, offset(index)))
        })
        .collect()
}

fn unsupported(what: &str) -> DecodeError {
    DecodeError::UnsupportedFormat(what.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryFiles;

    fn wav(samples: &[i16]) -> Vec<u8> {
        crate::sound::wav::make_wav_file(samples, 1, 8000, None)
    }

    #[test]
    fn test_unknown_data_is_rejected() {
        let files = MemoryFiles::new().with_file("x.bin", vec![0u8; 256]);
        let sf = files.open("x.bin", 64).unwrap();
        assert!(init_vgmstream_from_streamfile(&sf, 1).is_none());
    }

    #[test]
    fn test_pos_file_sets_loop() {
        let mut pos = Vec::new();
        pos.extend_from_slice(&2u32.to_le_bytes());
        pos.extend_from_slice(&6u32.to_le_bytes());
        let files = MemoryFiles::new()
            .with_file("s.wav", wav(&[0, 1, 2, 3, 4, 5, 6, 7]))
            .with_file("s.wav.pos", pos);
        let sf = files.open("s.wav", 64).unwrap();
        let mut stream = init_vgmstream_from_streamfile(&sf, 1).unwrap();
        assert!(stream.header.loop_flag);
        assert_eq!(stream.header.loop_start_sample, 2);
        assert_eq!(stream.header.loop_end_sample, 6);
        stream.reset();
        assert!(stream.header.loop_flag);
    }

    #[test]
    fn test_bad_pos_file_is_ignored() {
        let mut pos = Vec::new();
        pos.extend_from_slice(&6u32.to_le_bytes());
        pos.extend_from_slice(&100u32.to_le_bytes());
        let files = MemoryFiles::new()
            .with_file("s.wav", wav(&[0, 1, 2, 3]))
            .with_file("s.wav.pos", pos);
        let sf = files.open("s.wav", 64).unwrap();
        let stream = init_vgmstream_from_streamfile(&sf, 1).unwrap();
        assert!(!stream.header.loop_flag);
    }

    #[test]
    fn test_registry_order() {
        let names: Vec<_> = registered_metas().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["RIFF WAVE", "GENH", "AST", "FSB5"]);
    }
}
