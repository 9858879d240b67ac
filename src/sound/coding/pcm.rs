//! PCM sample decoders
//!
//! Each function decodes `samples_to_do` samples of one channel starting at
//! sample `first_sample` of the current block. Sample-interleaved variants
//! step over `channel_spacing` channels between samples.

use crate::sound::channel::ChannelState;
use crate::sound::sample::{clamp16, float_to_i16, ChannelSlice};

fn positions(first_sample: usize, samples_to_do: usize) -> impl Iterator<Item = (usize, u64)> {
    (first_sample..first_sample + samples_to_do)
        .enumerate()
        .map(|(n, i)| (n, i as u64))
}

pub fn decode_pcm16le(ch: &ChannelState, out: &mut ChannelSlice<'_>, first_sample: usize, samples_to_do: usize) {
    for (n, i) in positions(first_sample, samples_to_do) {
        out.set(n, ch.streamfile.read_i16le(ch.offset + i * 2));
    }
}

pub fn decode_pcm16be(ch: &ChannelState, out: &mut ChannelSlice<'_>, first_sample: usize, samples_to_do: usize) {
    for (n, i) in positions(first_sample, samples_to_do) {
        out.set(n, ch.streamfile.read_i16be(ch.offset + i * 2));
    }
}

pub fn decode_pcm16_int(
    ch: &ChannelState,
    out: &mut ChannelSlice<'_>,
    channel_spacing: usize,
    first_sample: usize,
    samples_to_do: usize,
    big_endian: bool,
) {
    let step = 2 * channel_spacing as u64;
    for (n, i) in positions(first_sample, samples_to_do) {
        let offset = ch.offset + i * step;
        let sample = if big_endian {
            ch.streamfile.read_i16be(offset)
        } else {
            ch.streamfile.read_i16le(offset)
        };
        out.set(n, sample);
    }
}

pub fn decode_pcm16le_xor_int(
    ch: &ChannelState,
    out: &mut ChannelSlice<'_>,
    channel_spacing: usize,
    first_sample: usize,
    samples_to_do: usize,
) {
    let step = 2 * channel_spacing as u64;
    for (n, i) in positions(first_sample, samples_to_do) {
        let raw = ch.streamfile.read_u16le(ch.offset + i * step);
        out.set(n, (raw ^ ch.key_xor) as i16);
    }
}

pub fn decode_pcm8(ch: &ChannelState, out: &mut ChannelSlice<'_>, first_sample: usize, samples_to_do: usize) {
    decode_pcm8_int(ch, out, 1, first_sample, samples_to_do);
}

pub fn decode_pcm8_int(
    ch: &ChannelState,
    out: &mut ChannelSlice<'_>,
    channel_spacing: usize,
    first_sample: usize,
    samples_to_do: usize,
) {
    for (n, i) in positions(first_sample, samples_to_do) {
        let v = ch.streamfile.read_i8(ch.offset + i * channel_spacing as u64);
        out.set(n, (v as i16) * 0x100);
    }
}

/// Sign bit plus 7-bit magnitude.
pub fn decode_pcm8_sb_int(
    ch: &ChannelState,
    out: &mut ChannelSlice<'_>,
    channel_spacing: usize,
    first_sample: usize,
    samples_to_do: usize,
) {
    for (n, i) in positions(first_sample, samples_to_do) {
        let v = ch.streamfile.read_u8(ch.offset + i * channel_spacing as u64);
        let magnitude = (v & 0x7F) as i16;
        let sample = if v & 0x80 != 0 { -magnitude } else { magnitude };
        out.set(n, sample * 0x100);
    }
}

pub fn decode_pcm8_unsigned(ch: &ChannelState, out: &mut ChannelSlice<'_>, first_sample: usize, samples_to_do: usize) {
    decode_pcm8_unsigned_int(ch, out, 1, first_sample, samples_to_do);
}

pub fn decode_pcm8_unsigned_int(
    ch: &ChannelState,
    out: &mut ChannelSlice<'_>,
    channel_spacing: usize,
    first_sample: usize,
    samples_to_do: usize,
) {
    for (n, i) in positions(first_sample, samples_to_do) {
        let v = ch.streamfile.read_u8(ch.offset + i * channel_spacing as u64) as i32;
        out.set(n, clamp16(v * 0x100 - 0x8000));
    }
}

/// G.711 u-law byte to linear 16-bit.
pub fn expand_ulaw(ulaw: u8) -> i16 {
    const BIAS: i32 = 0x84;
    let ulaw = !ulaw;
    let exponent = ((ulaw >> 4) & 0x07) as i32;
    let mantissa = (ulaw & 0x0F) as i32;
    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;
    if ulaw & 0x80 != 0 {
        clamp16(-magnitude)
    } else {
        clamp16(magnitude)
    }
}

pub fn decode_ulaw(ch: &ChannelState, out: &mut ChannelSlice<'_>, first_sample: usize, samples_to_do: usize) {
    for (n, i) in positions(first_sample, samples_to_do) {
        out.set(n, expand_ulaw(ch.streamfile.read_u8(ch.offset + i)));
    }
}

pub fn decode_pcmfloat(
    ch: &ChannelState,
    out: &mut ChannelSlice<'_>,
    first_sample: usize,
    samples_to_do: usize,
    big_endian: bool,
) {
    for (n, i) in positions(first_sample, samples_to_do) {
        let offset = ch.offset + i * 4;
        let value = if big_endian {
            ch.streamfile.read_f32be(offset)
        } else {
            ch.streamfile.read_f32le(offset)
        };
        out.set(n, float_to_i16(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryFiles;
    use rstest::rstest;

    fn channel(bytes: Vec<u8>) -> ChannelState {
        let files = MemoryFiles::new().with_file("pcm", bytes);
        ChannelState::new(files.open("pcm", 64).unwrap(), 0)
    }

    fn decode_with(
        bytes: Vec<u8>,
        count: usize,
        f: impl Fn(&ChannelState, &mut ChannelSlice<'_>),
    ) -> Vec<i16> {
        let ch = channel(bytes);
        let mut out = vec![0i16; count];
        let mut slice = ChannelSlice::new(&mut out, 1);
        f(&ch, &mut slice);
        out
    }

    #[test]
    fn test_pcm8_unsigned_reference_values() {
        let out = decode_with(vec![0x80, 0x00, 0xFF], 3, |ch, out| {
            decode_pcm8_unsigned(ch, out, 0, 3)
        });
        assert_eq!(out, vec![0, -32768, 32512]);
    }

    #[rstest]
    #[case(vec![0x34, 0x12, 0xFF, 0xFF], vec![0x1234, -1])]
    #[case(vec![0x00, 0x80, 0xFF, 0x7F], vec![-32768, 32767])]
    fn test_pcm16le(#[case] bytes: Vec<u8>, #[case] expected: Vec<i16>) {
        let n = expected.len();
        let out = decode_with(bytes, n, |ch, out| decode_pcm16le(ch, out, 0, n));
        assert_eq!(out, expected);
    }

    #[rstest]
    #[case(vec![0x12, 0x34], vec![0x1234])]
    #[case(vec![0x80, 0x00, 0x00, 0x01], vec![-32768, 1])]
    fn test_pcm16be(#[case] bytes: Vec<u8>, #[case] expected: Vec<i16>) {
        let n = expected.len();
        let out = decode_with(bytes, n, |ch, out| decode_pcm16be(ch, out, 0, n));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_first_sample_offsets_read() {
        let out = decode_with(vec![1, 0, 2, 0, 3, 0, 4, 0], 2, |ch, out| {
            decode_pcm16le(ch, out, 2, 2)
        });
        assert_eq!(out, vec![3, 4]);
    }

    #[test]
    fn test_pcm16_interleaved_channel() {
        // L0 R0 L1 R1, decode R
        let mut ch = channel(vec![1, 0, 10, 0, 2, 0, 20, 0]);
        ch.offset = 2;
        let mut out = vec![0i16; 2];
        decode_pcm16_int(&ch, &mut ChannelSlice::new(&mut out, 1), 2, 0, 2, false);
        assert_eq!(out, vec![10, 20]);
    }

    #[test]
    fn test_pcm16_xor() {
        let mut ch = channel(vec![0xFF, 0x00]);
        ch.key_xor = 0x00F0;
        let mut out = vec![0i16; 1];
        decode_pcm16le_xor_int(&ch, &mut ChannelSlice::new(&mut out, 1), 1, 0, 1);
        assert_eq!(out, vec![0x000F]);
    }

    #[rstest]
    #[case(0x7F, 0x7F00)]
    #[case(0x80, -0x8000)]
    #[case(0xFF, -0x100)]
    fn test_pcm8_signed(#[case] byte: u8, #[case] expected: i16) {
        let out = decode_with(vec![byte], 1, |ch, out| decode_pcm8(ch, out, 0, 1));
        assert_eq!(out, vec![expected]);
    }

    #[rstest]
    #[case(0x05, 0x0500)]
    #[case(0x85, -0x0500)]
    #[case(0x80, 0)]
    fn test_pcm8_sign_magnitude(#[case] byte: u8, #[case] expected: i16) {
        let out = decode_with(vec![byte], 1, |ch, out| decode_pcm8_sb_int(ch, out, 1, 0, 1));
        assert_eq!(out, vec![expected]);
    }

    #[rstest]
    #[case(0xFF, 0)]
    #[case(0x7F, 0)]
    #[case(0x00, -32124)]
    #[case(0x80, 32124)]
    fn test_ulaw(#[case] byte: u8, #[case] expected: i16) {
        assert_eq!(expand_ulaw(byte), expected);
    }

    #[test]
    fn test_pcmfloat() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-3.0f32).to_le_bytes());
        let out = decode_with(bytes, 2, |ch, out| decode_pcmfloat(ch, out, 0, 2, false));
        assert_eq!(out, vec![16384, -32768]);
    }

    #[test]
    fn test_past_end_reads_silence() {
        let out = decode_with(vec![0x10, 0x00], 3, |ch, out| decode_pcm16le(ch, out, 0, 3));
        assert_eq!(out, vec![0x10, 0, 0]);
    }
}
