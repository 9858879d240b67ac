//! GENH generic header
//!
//! A 0x24-byte little endian header prepended to raw audio:
//!
//! ```text
//! 0x00  "GENH"
//! 0x04  channels
//! 0x08  interleave in bytes (0 = sample-interleaved)
//! 0x0c  sample rate
//! 0x10  loop start sample (-1 = no loop)
//! 0x14  loop end sample
//! 0x18  codec
//! 0x1c  start offset of the audio data
//! 0x20  header size
//! ```

use crate::io::StreamHandle;
use crate::sound::decoder::{DecodeError, DecodeResult};
use crate::sound::formats::Coding;
use crate::sound::layout::Layout;
use crate::sound::stream::{StreamHeader, VgmStream};

use super::{open_channels, unsupported};

const GENH_ID: u32 = 0x47454E48; // "GENH"

/// Codec ids, with the sample-interleaved coding for `interleave == 0`.
fn genh_coding(codec: u32) -> Option<(Coding, Option<Coding>)> {
    match codec {
        3 => Some((Coding::Pcm16Be, Some(Coding::Pcm16BeInt))),
        4 => Some((Coding::Pcm16Le, Some(Coding::Pcm16LeInt))),
        5 => Some((Coding::Pcm8, Some(Coding::Pcm8Int))),
        9 => Some((Coding::Ima, None)),
        13 => Some((Coding::Pcm8UnsignedInt, Some(Coding::Pcm8UnsignedInt))),
        15 => Some((Coding::Pcm8Unsigned, Some(Coding::Pcm8UnsignedInt))),
        _ => None,
    }
}

pub fn init_genh(sf: &StreamHandle, _stream_index: usize) -> DecodeResult<VgmStream> {
    if sf.read_u32be(0x00) != GENH_ID {
        return Err(unsupported("not GENH"));
    }

    let channels = sf.read_u32le(0x04) as usize;
    let interleave = sf.read_u32le(0x08) as usize;
    let sample_rate = sf.read_u32le(0x0c);
    let loop_start = sf.read_i32le(0x10);
    let loop_end = sf.read_i32le(0x14);
    let codec = sf.read_u32le(0x18);
    let start_offset = sf.read_u32le(0x1c) as u64;

    if channels == 0 || channels > super::MAX_CHANNELS {
        return Err(DecodeError::InvalidData(format!("{} channels", channels)));
    }
    if start_offset > sf.size() {
        return Err(DecodeError::InvalidData(format!("start offset 0x{:x}", start_offset)));
    }

    let (block_coding, int_coding) =
        genh_coding(codec).ok_or_else(|| DecodeError::InvalidData(format!("GENH codec {}", codec)))?;

    let (coding, layout) = match (channels, interleave) {
        (1, _) => (block_coding, Layout::Flat),
        (_, 0) => match int_coding {
            Some(coding) => (coding, Layout::Flat),
            None => {
                return Err(DecodeError::InvalidData(
                    "codec needs an interleave for multiple channels".into(),
                ))
            }
        },
        _ => (block_coding, Layout::Interleave),
    };

    let data_size = sf.size() - start_offset;
    let frame_size = coding.frame_size() as u64;
    let num_samples = (data_size / channels as u64 / frame_size) as usize * coding.samples_per_frame();

    let mut header = StreamHeader::new(channels, sample_rate, num_samples, coding, layout);
    header.meta = "GENH Generic Header";
    if matches!(layout, Layout::Interleave) {
        header.interleave_block_size = interleave;
    }
    if loop_start >= 0 && loop_end > loop_start {
        header = header.with_loop(true, loop_start as usize, loop_end as usize);
    }

    let step = match layout {
        Layout::Interleave => interleave as u64,
        _ if channels > 1 => frame_size,
        _ => 0,
    };
    let ch = open_channels(sf, channels, |index| start_offset + step * index as u64)?;
    Ok(VgmStream::new(header, ch, None))
}
