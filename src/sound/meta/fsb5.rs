//! FMOD FSB5 sound banks
//!
//! A bank holds several subsongs sharing one codec. After the base header
//! come the sample headers (a packed u64 per subsong, optionally followed
//! by extra chunks), the name table and the data section.
//!
//! ```text
//! 0x00  "FSB5"
//! 0x04  version: 0 (0x40-byte header) or 1 (0x3c-byte header)
//! 0x08  subsong count
//! 0x0c  sample header size
//! 0x10  name table size
//! 0x14  data size
//! 0x18  codec
//! ```

use crate::io::StreamHandle;
use crate::sound::decoder::{DecodeError, DecodeResult};
use crate::sound::formats::Coding;
use crate::sound::layout::Layout;
use crate::sound::stream::{StreamHeader, VgmStream};

use super::{open_channels, unsupported};

const FSB5_ID: u32 = 0x46534235; // "FSB5"

const FSB5_CODEC_PCM8: u32 = 0x01;
const FSB5_CODEC_PCM16: u32 = 0x02;
const FSB5_CODEC_PCMFLOAT: u32 = 0x05;
const FSB5_CODEC_VORBIS: u32 = 0x0F;

const CHUNK_CHANNELS: u32 = 1;
const CHUNK_FREQUENCY: u32 = 2;
const CHUNK_LOOP: u32 = 3;
const CHUNK_VORBIS_DATA: u32 = 11;

#[rustfmt::skip]
static FSB5_FREQUENCIES: [u32; 11] = [
    4000, 8000, 11000, 11025, 16000, 22050, 24000, 32000, 44100, 48000, 96000,
];

static FSB5_CHANNELS: [usize; 4] = [1, 2, 6, 8];

/// One subsong's sample header with its chunks applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Fsb5Sample {
    channels: usize,
    sample_rate: u32,
    num_samples: usize,
    /// Offset inside the data section.
    data_offset: u64,
    loop_points: Option<(usize, usize)>,
    vorbis_setup_id: Option<u32>,
}

/// Parse the sample header at `offset`, returning it and the next header's offset.
fn read_sample(sf: &StreamHandle, offset: u64, end: u64) -> DecodeResult<(Fsb5Sample, u64)> {
    let mode = sf.read_u64le(offset);
    let mut next = offset + 8;

    let freq_index = ((mode >> 1) & 0x0F) as usize;
    let mut sample = Fsb5Sample {
        channels: FSB5_CHANNELS[((mode >> 5) & 0x03) as usize],
        sample_rate: *FSB5_FREQUENCIES
            .get(freq_index)
            .ok_or_else(|| DecodeError::InvalidData(format!("FSB5 frequency index {}", freq_index)))?,
        num_samples: ((mode >> 34) & 0x3FFF_FFFF) as usize,
        data_offset: ((mode >> 7) & 0x07FF_FFFF) << 5,
        ..Default::default()
    };

    let mut more = mode & 0x01 != 0;
    while more {
        if next + 4 > end {
            return Err(DecodeError::InvalidData("FSB5 chunk past the sample headers".into()));
        }
        let chunk = sf.read_u32le(next);
        more = chunk & 0x01 != 0;
        let size = ((chunk >> 1) & 0x00FF_FFFF) as u64;
        let kind = (chunk >> 25) & 0x7F;
        let body = next + 4;

        match kind {
            CHUNK_CHANNELS => sample.channels = sf.read_u8(body) as usize,
            CHUNK_FREQUENCY => sample.sample_rate = sf.read_u32le(body),
            CHUNK_LOOP => {
                let start = sf.read_u32le(body) as usize;
                let end = sf.read_u32le(body + 4) as usize + 1;
                sample.loop_points = Some((start, end));
            }
            CHUNK_VORBIS_DATA => sample.vorbis_setup_id = Some(sf.read_u32le(body)),
            other => log::trace!("FSB5: skipping chunk type {} (0x{:x} bytes)", other, size),
        }
        next = body + size;
    }
    Ok((sample, next))
}

pub fn init_fsb5(sf: &StreamHandle, stream_index: usize) -> DecodeResult<VgmStream> {
    if sf.read_u32be(0x00) != FSB5_ID {
        return Err(unsupported("not FSB5"));
    }

    let base_header_size: u64 = match sf.read_u32le(0x04) {
        0 => 0x40,
        1 => 0x3C,
        version => return Err(DecodeError::InvalidData(format!("FSB5 version {}", version))),
    };
    let num_streams = sf.read_u32le(0x08) as usize;
    let sample_header_size = sf.read_u32le(0x0c) as u64;
    let name_table_size = sf.read_u32le(0x10) as u64;
    let data_size = sf.read_u32le(0x14) as u64;
    let codec = sf.read_u32le(0x18);

    let data_start = base_header_size + sample_header_size + name_table_size;
    if data_start + data_size > sf.size() {
        return Err(DecodeError::InvalidData("FSB5 sections exceed the file".into()));
    }
    if stream_index == 0 || stream_index > num_streams {
        return Err(DecodeError::InvalidData(format!(
            "subsong {} of {}",
            stream_index, num_streams
        )));
    }

    let headers_end = base_header_size + sample_header_size;
    let mut offset = base_header_size;
    let mut sample = Fsb5Sample::default();
    for _ in 0..stream_index {
        let (parsed, next) = read_sample(sf, offset, headers_end)?;
        sample = parsed;
        offset = next;
    }
    if sample.data_offset >= data_size {
        return Err(DecodeError::InvalidData(format!(
            "FSB5 stream offset 0x{:x} past data size 0x{:x}",
            sample.data_offset, data_size
        )));
    }
    let stream_offset = data_start + sample.data_offset;
    let channels = sample.channels;

    let (coding, layout, interleave) = match codec {
        FSB5_CODEC_PCM8 => (Coding::Pcm8Int, Layout::Flat, 0),
        FSB5_CODEC_PCM16 => (Coding::Pcm16LeInt, Layout::Flat, 0),
        FSB5_CODEC_PCMFLOAT if channels == 1 => (Coding::PcmFloatLe, Layout::Flat, 0),
        FSB5_CODEC_PCMFLOAT => (Coding::PcmFloatLe, Layout::Interleave, 4),
        FSB5_CODEC_VORBIS => (Coding::FsbVorbis, Layout::Flat, 0),
        other => return Err(DecodeError::InvalidData(format!("FSB5 codec 0x{:02x}", other))),
    };

    let mut header = StreamHeader::new(channels, sample.sample_rate, sample.num_samples, coding, layout);
    header.interleave_block_size = interleave;
    header.stream_index = stream_index;
    header.num_streams = num_streams;
    header.meta = "FMOD FSB5 header";
    if let Some((start, end)) = sample.loop_points {
        header = header.with_loop(true, start, end.min(sample.num_samples));
    }

    let codec_data = if coding == Coding::FsbVorbis {
        let setup_id = sample
            .vorbis_setup_id
            .ok_or_else(|| DecodeError::InvalidData("FSB5 Vorbis stream without setup id".into()))?;
        Some(vorbis_codec(sf, channels, sample.sample_rate, setup_id)?)
    } else {
        None
    };

    let step = match (coding, layout) {
        (Coding::FsbVorbis, _) => 0,
        (_, Layout::Interleave) => interleave as u64,
        _ => coding.frame_size() as u64,
    };
    let ch = open_channels(sf, channels, |index| stream_offset + step * index as u64)?;
    Ok(VgmStream::new(header, ch, codec_data))
}

#[cfg(feature = "vorbis")]
fn vorbis_codec(
    sf: &StreamHandle,
    channels: usize,
    sample_rate: u32,
    setup_id: u32,
) -> DecodeResult<Box<dyn crate::sound::decoder::CodecData>> {
    let codec = crate::sound::coding::fsb_vorbis::init_fsb_vorbis(sf, channels, sample_rate, setup_id)?;
    Ok(Box::new(codec))
}

#[cfg(not(feature = "vorbis"))]
fn vorbis_codec(
    _sf: &StreamHandle,
    _channels: usize,
    _sample_rate: u32,
    _setup_id: u32,
) -> DecodeResult<Box<dyn crate::sound::decoder::CodecData>> {
    Err(DecodeError::UnsupportedFormat("built without Vorbis support".into()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::io::MemoryFiles;

    /// Sample mode word: frequency index, channel code, data offset, samples.
    pub(crate) fn sample_mode(freq_index: u64, channel_code: u64, offset: u64, samples: u64, chunks: bool) -> u64 {
        (chunks as u64) | (freq_index << 1) | (channel_code << 5) | ((offset >> 5) << 7) | (samples << 34)
    }

    pub(crate) fn chunk(kind: u32, body: &[u8], more: bool) -> Vec<u8> {
        let word = (more as u32) | ((body.len() as u32) << 1) | (kind << 25);
        let mut out = word.to_le_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    /// Version 1 bank with the given sample headers and data.
    pub(crate) fn fsb5_file(codec: u32, subsongs: u32, sample_headers: &[u8], data: &[u8]) -> Vec<u8> {
        let mut file = Vec::new();
        file.extend_from_slice(b"FSB5");
        for v in [1, subsongs, sample_headers.len() as u32, 0, data.len() as u32, codec] {
            file.extend_from_slice(&v.to_le_bytes());
        }
        file.resize(0x3C, 0);
        file.extend_from_slice(sample_headers);
        file.extend_from_slice(data);
        file
    }

    fn open(bytes: Vec<u8>) -> StreamHandle {
        MemoryFiles::new().with_file("t.fsb", bytes).open("t.fsb", 256).unwrap()
    }

    fn two_subsongs() -> Vec<u8> {
        let mut headers = Vec::new();
        headers.extend_from_slice(&sample_mode(8, 0, 0, 2, false).to_le_bytes());
        headers.extend_from_slice(&sample_mode(9, 1, 0x20, 2, true).to_le_bytes());
        let mut loop_body = 0u32.to_le_bytes().to_vec();
        loop_body.extend_from_slice(&1u32.to_le_bytes());
        headers.extend(chunk(CHUNK_LOOP, &loop_body, false));

        let mut data = vec![0u8; 0x28];
        data[0..4].copy_from_slice(&[0x01, 0x00, 0x02, 0x00]);
        data[0x20..0x28].copy_from_slice(&[0x0A, 0x00, 0xF6, 0xFF, 0x14, 0x00, 0xEC, 0xFF]);
        fsb5_file(FSB5_CODEC_PCM16, 2, &headers, &data)
    }

    #[test]
    fn test_first_subsong() {
        let mut stream = init_fsb5(&open(two_subsongs()), 1).unwrap();
        assert_eq!(stream.header.channels, 1);
        assert_eq!(stream.header.sample_rate, 44100);
        assert_eq!(stream.header.num_streams, 2);
        assert!(!stream.header.loop_flag);
        let mut buf = vec![0i16; 2];
        stream.render(&mut buf, 2);
        assert_eq!(buf, vec![1, 2]);
    }

    #[test]
    fn test_second_subsong_with_loop_chunk() {
        let mut stream = init_fsb5(&open(two_subsongs()), 2).unwrap();
        assert_eq!(stream.header.channels, 2);
        assert_eq!(stream.header.sample_rate, 48000);
        assert_eq!(stream.header.stream_index, 2);
        assert!(stream.header.loop_flag);
        assert_eq!((stream.header.loop_start_sample, stream.header.loop_end_sample), (0, 2));
        let mut buf = vec![0i16; 4];
        stream.render(&mut buf, 2);
        assert_eq!(buf, vec![10, -10, 20, -20]);
    }

    #[test]
    fn test_subsong_out_of_range() {
        assert!(init_fsb5(&open(two_subsongs()), 3).is_err());
    }

    #[test]
    fn test_channel_and_frequency_chunks() {
        let mut headers = sample_mode(0, 0, 0, 1, true).to_le_bytes().to_vec();
        headers.extend(chunk(CHUNK_CHANNELS, &[3, 0, 0, 0], true));
        headers.extend(chunk(CHUNK_FREQUENCY, &12345u32.to_le_bytes(), false));
        let stream = init_fsb5(&open(fsb5_file(FSB5_CODEC_PCM16, 1, &headers, &[0u8; 6])), 1).unwrap();
        assert_eq!(stream.header.channels, 3);
        assert_eq!(stream.header.sample_rate, 12345);
    }

    #[test]
    fn test_vorbis_without_setup_file_fails() {
        let mut headers = sample_mode(8, 0, 0, 100, true).to_le_bytes().to_vec();
        headers.extend(chunk(CHUNK_VORBIS_DATA, &0xDEADBEEFu32.to_le_bytes(), false));
        let file = fsb5_file(FSB5_CODEC_VORBIS, 1, &headers, &[0u8; 0x40]);
        assert!(init_fsb5(&open(file), 1).is_err());
    }

    #[test]
    fn test_unsupported_codec() {
        let headers = sample_mode(8, 0, 0, 2, false).to_le_bytes().to_vec();
        let file = fsb5_file(0x0B, 1, &headers, &[0u8; 0x10]);
        assert!(matches!(init_fsb5(&open(file), 1), Err(DecodeError::InvalidData(_))));
    }
}
