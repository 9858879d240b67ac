//! IMA ADPCM decoder
//!
//! Headerless 4-bit IMA: two samples per byte, low nibble first. The
//! predictor and step index live in the channel so decoding can resume at
//! any block boundary.

use crate::sound::channel::ChannelState;
use crate::sound::sample::{clamp16, ChannelSlice};

/// IMA ADPCM step table.
#[rustfmt::skip]
static ADPCM_STEP: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14,
    16, 17, 19, 21, 23, 25, 28, 31,
    34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143,
    157, 173, 190, 209, 230, 253, 279, 307,
    337, 371, 408, 449, 494, 544, 598, 658,
    724, 796, 876, 963, 1060, 1166, 1282, 1411,
    1552, 1707, 1878, 2066, 2272, 2499, 2749, 3024,
    3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484,
    7132, 7845, 8630, 9493, 10442, 11487, 12635, 13899,
    15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// ADPCM index adjustment table.
#[rustfmt::skip]
static ADPCM_INDEX: [i32; 16] = [
    -1, -1, -1, -1, 2, 4, 6, 8,
    -1, -1, -1, -1, 2, 4, 6, 8,
];

/// Expand one nibble, updating predictor and step index in place.
#[inline]
fn expand_nibble(nibble: u8, hist1: &mut i32, step_index: &mut i32) -> i16 {
    let nibble = (nibble & 0xF) as i32;
    let step = ADPCM_STEP[(*step_index).clamp(0, 88) as usize];

    let mut delta = step >> 3;
    if nibble & 1 != 0 {
        delta += step >> 2;
    }
    if nibble & 2 != 0 {
        delta += step >> 1;
    }
    if nibble & 4 != 0 {
        delta += step;
    }
    if nibble & 8 != 0 {
        delta = -delta;
    }

    let sample = clamp16(*hist1 + delta);
    *hist1 = sample as i32;
    *step_index = (*step_index + ADPCM_INDEX[nibble as usize]).clamp(0, 88);
    sample
}

pub fn decode_ima(ch: &mut ChannelState, out: &mut ChannelSlice<'_>, first_sample: usize, samples_to_do: usize) {
    let mut hist1 = ch.adpcm.hist1;
    let mut step_index = ch.adpcm.step_index.clamp(0, 88);

    for (n, i) in (first_sample..first_sample + samples_to_do).enumerate() {
        let byte = ch.streamfile.read_u8(ch.offset + (i / 2) as u64);
        let nibble = if i & 1 == 0 { byte } else { byte >> 4 };
        out.set(n, expand_nibble(nibble, &mut hist1, &mut step_index));
    }

    ch.adpcm.hist1 = hist1;
    ch.adpcm.step_index = step_index;
}
