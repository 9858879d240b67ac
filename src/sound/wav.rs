//! RIFF WAVE output
//!
//! 16-bit little endian PCM, optionally with a `smpl` chunk carrying one
//! forward loop so players and samplers pick the loop up.

use std::io::{self, Write};

const RIFF_ID: &[u8; 4] = b"RIFF";
const WAVE_ID: &[u8; 4] = b"WAVE";
const FMT_ID: &[u8; 4] = b"fmt ";
const DATA_ID: &[u8; 4] = b"data";
const SMPL_ID: &[u8; 4] = b"smpl";

const WAVE_FORMAT_PCM: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 0x10;
const SMPL_CHUNK_SIZE: u32 = 0x3c;

/// Size of the header written by [`make_wav_header`].
pub fn wav_header_size(with_smpl: bool) -> usize {
    0x2c + if with_smpl { 8 + SMPL_CHUNK_SIZE as usize } else { 0 }
}

/// Header for `sample_count` frames of 16-bit PCM.
///
/// `smpl` adds a loop from `start` to `end` (exclusive).
pub fn make_wav_header(sample_count: usize, sample_rate: u32, channels: usize, smpl: Option<(usize, usize)>) -> Vec<u8> {
    let block_align = channels as u32 * 2;
    let data_size = (sample_count as u64 * block_align as u64).min(u32::MAX as u64) as u32;
    let header_size = wav_header_size(smpl.is_some()) as u32;

    let mut header = Vec::with_capacity(header_size as usize);
    header.extend_from_slice(RIFF_ID);
    header.extend_from_slice(&(header_size - 8).saturating_add(data_size).to_le_bytes());
    header.extend_from_slice(WAVE_ID);

    header.extend_from_slice(FMT_ID);
    header.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    header.extend_from_slice(&(channels as u16).to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&(sample_rate * block_align).to_le_bytes());
    header.extend_from_slice(&(block_align as u16).to_le_bytes());
    header.extend_from_slice(&16u16.to_le_bytes());

    if let Some((start, end)) = smpl {
        let mut body = [0u8; SMPL_CHUNK_SIZE as usize];
        // sample period in ns
        body[0x08..0x0c].copy_from_slice(&(1_000_000_000 / sample_rate.max(1)).to_le_bytes());
        body[0x0c..0x10].copy_from_slice(&60u32.to_le_bytes());
        body[0x1c..0x20].copy_from_slice(&1u32.to_le_bytes());
        body[0x2c..0x30].copy_from_slice(&(start as u32).to_le_bytes());
        body[0x30..0x34].copy_from_slice(&(end as u32).to_le_bytes());
        header.extend_from_slice(SMPL_ID);
        header.extend_from_slice(&SMPL_CHUNK_SIZE.to_le_bytes());
        header.extend_from_slice(&body);
    }

    header.extend_from_slice(DATA_ID);
    header.extend_from_slice(&data_size.to_le_bytes());
    header
}

/// Write interleaved samples as little endian 16-bit.
pub fn write_samples_le<W: Write + ?Sized>(out: &mut W, samples: &[i16]) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    out.write_all(&bytes)
}

/// A complete WAV file in memory.
pub fn make_wav_file(samples: &[i16], channels: usize, sample_rate: u32, smpl: Option<(usize, usize)>) -> Vec<u8> {
    let frames = samples.len() / channels.max(1);
    let mut file = make_wav_header(frames, sample_rate, channels, smpl);
    file.reserve(samples.len() * 2);
    for sample in samples {
        file.extend_from_slice(&sample.to_le_bytes());
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    #[test]
    fn test_plain_header() {
        let header = make_wav_header(44100, 44100, 2, None);
        assert_eq!(header.len(), 0x2c);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(u32_at(&header, 4), 0x24 + 44100 * 4);
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&header, 0x18), 44100);
        assert_eq!(u32_at(&header, 0x1c), 44100 * 4);
        assert_eq!(&header[0x24..0x28], b"data");
        assert_eq!(u32_at(&header, 0x28), 44100 * 4);
    }

    #[test]
    fn test_smpl_header() {
        let header = make_wav_header(100, 8000, 1, Some((10, 90)));
        assert_eq!(header.len(), wav_header_size(true));
        assert_eq!(&header[0x24..0x28], b"smpl");
        assert_eq!(u32_at(&header, 36 + 0x24), 1);
        assert_eq!(u32_at(&header, 52 + 0x24), 10);
        assert_eq!(u32_at(&header, 56 + 0x24), 90);
        assert_eq!(&header[0x68..0x6c], b"data");
    }

    #[test]
    fn test_write_samples() {
        let mut out = Vec::new();
        write_samples_le(&mut out, &[1, -2]).unwrap();
        assert_eq!(out, vec![0x01, 0x00, 0xFE, 0xFF]);
    }
}
