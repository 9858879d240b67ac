//! RIFF WAVE parser
//!
//! Handles uncompressed PCM (8-bit unsigned, 16-bit signed), 32-bit float
//! and u-law. Loop points come from the first loop of a `smpl` chunk, end
//! exclusive.

use crate::io::{ChunkLocation, StreamHandle};
use crate::sound::decoder::{DecodeError, DecodeResult};
use crate::sound::formats::{pcm_bytes_to_samples, Coding};
use crate::sound::layout::Layout;
use crate::sound::stream::{StreamHeader, VgmStream};

use super::{open_channels, unsupported};

// Chunk IDs as read big endian
const RIFF_ID: u32 = 0x52494646; // "RIFF"
const WAVE_ID: u32 = 0x57415645; // "WAVE"
const FMT_ID: u32 = 0x666d7420; // "fmt "
const DATA_ID: u32 = 0x64617461; // "data"
const SMPL_ID: u32 = 0x736d706c; // "smpl"

// Format tags
const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;
const WAVE_FORMAT_MULAW: u16 = 7;

/// Parsed `fmt ` chunk
#[derive(Debug, Default)]
struct WavFormatHeader {
    format: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

fn read_format(sf: &StreamHandle, offset: u64) -> WavFormatHeader {
    WavFormatHeader {
        format: sf.read_u16le(offset),
        channels: sf.read_u16le(offset + 0x02),
        sample_rate: sf.read_u32le(offset + 0x04),
        block_align: sf.read_u16le(offset + 0x0c),
        bits_per_sample: sf.read_u16le(offset + 0x0e),
    }
}

/// Coding and layout for the format; `Int` codings read sample-interleaved
/// data directly, the rest use a one-sample interleave.
fn coding_for(fmt: &WavFormatHeader) -> DecodeResult<(Coding, Layout, usize)> {
    let mono = fmt.channels == 1;
    let interleaved = |coding: Coding, bytes: usize| {
        if mono {
            (coding, Layout::Flat, 0)
        } else {
            (coding, Layout::Interleave, bytes)
        }
    };
    match (fmt.format, fmt.bits_per_sample) {
        (WAVE_FORMAT_PCM, 16) => Ok((Coding::Pcm16LeInt, Layout::Flat, 0)),
        (WAVE_FORMAT_PCM, 8) => Ok((Coding::Pcm8UnsignedInt, Layout::Flat, 0)),
        (WAVE_FORMAT_IEEE_FLOAT, 32) => Ok(interleaved(Coding::PcmFloatLe, 4)),
        (WAVE_FORMAT_MULAW, 8) => Ok(interleaved(Coding::Ulaw, 1)),
        (format, bits) => Err(DecodeError::InvalidData(format!(
            "unsupported WAVE format {} with {} bits",
            format, bits
        ))),
    }
}

/// Walk the chunks after the `WAVE` id. Odd-sized bodies carry a pad byte.
fn find_riff_chunk(sf: &StreamHandle, chunk_id: u32, start_offset: u64) -> Option<ChunkLocation> {
    let file_size = sf.size();
    let mut offset = start_offset;
    while offset + 8 <= file_size {
        let size = sf.read_u32le(offset + 4);
        if sf.read_u32be(offset) == chunk_id {
            return Some(ChunkLocation {
                offset: offset + 8,
                size,
            });
        }
        offset += 8 + ((size as u64 + 1) & !1);
    }
    None
}

pub fn init_riff(sf: &StreamHandle, _stream_index: usize) -> DecodeResult<VgmStream> {
    if sf.read_u32be(0x00) != RIFF_ID || sf.read_u32be(0x08) != WAVE_ID {
        return Err(unsupported("not RIFF WAVE"));
    }

    let fmt_chunk = find_riff_chunk(sf, FMT_ID, 0x0c)
        .ok_or_else(|| DecodeError::InvalidData("no fmt chunk".into()))?;
    if fmt_chunk.size < 0x10 {
        return Err(DecodeError::InvalidData(format!("fmt chunk of {} bytes", fmt_chunk.size)));
    }
    let fmt = read_format(sf, fmt_chunk.offset);
    let channels = fmt.channels as usize;
    if channels == 0 || fmt.block_align as usize != channels * (fmt.bits_per_sample as usize / 8) {
        return Err(DecodeError::InvalidData(format!(
            "block align {} for {} channels of {} bits",
            fmt.block_align, channels, fmt.bits_per_sample
        )));
    }
    let (coding, layout, interleave) = coding_for(&fmt)?;

    let data = find_riff_chunk(sf, DATA_ID, 0x0c)
        .ok_or_else(|| DecodeError::InvalidData("no data chunk".into()))?;
    let data_size = (data.size as u64).min(sf.size().saturating_sub(data.offset));
    let num_samples = pcm_bytes_to_samples(data_size, channels, fmt.bits_per_sample as u32);

    let mut header = StreamHeader::new(channels, fmt.sample_rate, num_samples, coding, layout);
    header.interleave_block_size = interleave;
    header.meta = "RIFF WAVE header";

    if let Some(smpl) = find_riff_chunk(sf, SMPL_ID, 0x0c) {
        if smpl.size >= 0x34 && sf.read_u32le(smpl.offset + 0x1c) > 0 {
            let start = sf.read_u32le(smpl.offset + 0x2c) as usize;
            let end = sf.read_u32le(smpl.offset + 0x30) as usize;
            header = header.with_loop(true, start, end);
        }
    }

    let sample_bytes = fmt.bits_per_sample as u64 / 8;
    let ch = open_channels(sf, channels, |index| data.offset + sample_bytes * index as u64)?;
    Ok(VgmStream::new(header, ch, None))
}
