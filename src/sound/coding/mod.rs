//! Codec dispatch
//!
//! Stateless codecs decode one channel at a time straight from the
//! channel's stream file. Stateful codecs own all channels at once through
//! their [`CodecData`] box.

pub mod fsb_vorbis;
pub mod ima;
pub mod pcm;

use super::channel::ChannelState;
use super::decoder::CodecData;
use super::formats::Coding;
use super::sample::{ChannelSlice, SampleBuffer};

/// Decode one channel with a stateless codec.
pub fn decode_channel(
    coding: Coding,
    ch: &mut ChannelState,
    out: &mut ChannelSlice<'_>,
    channel_spacing: usize,
    first_sample: usize,
    samples_to_do: usize,
) {
    match coding {
        Coding::Pcm16Le => pcm::decode_pcm16le(ch, out, first_sample, samples_to_do),
        Coding::Pcm16Be => pcm::decode_pcm16be(ch, out, first_sample, samples_to_do),
        Coding::Pcm16LeInt => {
            pcm::decode_pcm16_int(ch, out, channel_spacing, first_sample, samples_to_do, false)
        }
        Coding::Pcm16BeInt => {
            pcm::decode_pcm16_int(ch, out, channel_spacing, first_sample, samples_to_do, true)
        }
        Coding::Pcm16LeXorInt => {
            pcm::decode_pcm16le_xor_int(ch, out, channel_spacing, first_sample, samples_to_do)
        }
        Coding::Pcm8 => pcm::decode_pcm8(ch, out, first_sample, samples_to_do),
        Coding::Pcm8Int => pcm::decode_pcm8_int(ch, out, channel_spacing, first_sample, samples_to_do),
        Coding::Pcm8Unsigned => pcm::decode_pcm8_unsigned(ch, out, first_sample, samples_to_do),
        Coding::Pcm8UnsignedInt => {
            pcm::decode_pcm8_unsigned_int(ch, out, channel_spacing, first_sample, samples_to_do)
        }
        Coding::Pcm8SbInt => pcm::decode_pcm8_sb_int(ch, out, channel_spacing, first_sample, samples_to_do),
        Coding::Ulaw => pcm::decode_ulaw(ch, out, first_sample, samples_to_do),
        Coding::PcmFloatLe => pcm::decode_pcmfloat(ch, out, first_sample, samples_to_do, false),
        Coding::PcmFloatBe => pcm::decode_pcmfloat(ch, out, first_sample, samples_to_do, true),
        Coding::Ima => ima::decode_ima(ch, out, first_sample, samples_to_do),
        Coding::FsbVorbis => {
            for n in 0..samples_to_do {
                out.set(n, 0);
            }
        }
    }
}

/// Decode `samples_to_do` frames of every channel into `out` at `first_frame`.
///
/// `first_sample` is the position inside the current block.
pub fn decode_frames(
    coding: Coding,
    channels: &mut [ChannelState],
    codec: Option<&mut (dyn CodecData + 'static)>,
    out: &mut SampleBuffer<'_>,
    first_frame: usize,
    first_sample: usize,
    samples_to_do: usize,
) {
    if coding.is_stateful() {
        match codec {
            Some(codec) => codec.decode(channels, &mut out.frames_from(first_frame), samples_to_do),
            None => out.silence(first_frame, samples_to_do),
        }
        return;
    }

    let spacing = channels.len();
    for (index, ch) in channels.iter_mut().enumerate() {
        let mut slice = out.channel(index, first_frame);
        decode_channel(coding, ch, &mut slice, spacing, first_sample, samples_to_do);
    }
}
