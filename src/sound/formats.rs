//! Sample encodings understood by the decoders

/// How raw bytes encode samples.
///
/// `*Int` variants read a single channel out of sample-interleaved data
/// (every channel's sample N sits next to each other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coding {
    /// 16-bit little endian PCM
    Pcm16Le,
    /// 16-bit big endian PCM
    Pcm16Be,
    Pcm16LeInt,
    Pcm16BeInt,
    /// 16-bit little endian PCM, sample-interleaved, XORed with a per-channel key
    Pcm16LeXorInt,
    /// 8-bit signed PCM
    Pcm8,
    Pcm8Int,
    /// 8-bit unsigned PCM
    Pcm8Unsigned,
    Pcm8UnsignedInt,
    /// 8-bit sign-magnitude PCM, sample-interleaved
    Pcm8SbInt,
    /// 8-bit u-law
    Ulaw,
    /// 32-bit float PCM
    PcmFloatLe,
    PcmFloatBe,
    /// Headerless 4-bit IMA ADPCM, low nibble first
    Ima,
    /// FMOD raw Vorbis packets
    FsbVorbis,
}

impl Coding {
    /// Samples produced by one frame of `frame_size` bytes.
    ///
    /// Zero means the codec has no fixed framing and decodes any count.
    pub fn samples_per_frame(&self) -> usize {
        match self {
            Coding::Ima => 2,
            Coding::FsbVorbis => 0,
            _ => 1,
        }
    }

    /// Bytes in one frame of a single channel.
    pub fn frame_size(&self) -> usize {
        match self {
            Coding::Pcm16Le
            | Coding::Pcm16Be
            | Coding::Pcm16LeInt
            | Coding::Pcm16BeInt
            | Coding::Pcm16LeXorInt => 2,
            Coding::Pcm8
            | Coding::Pcm8Int
            | Coding::Pcm8Unsigned
            | Coding::Pcm8UnsignedInt
            | Coding::Pcm8SbInt
            | Coding::Ulaw
            | Coding::Ima => 1,
            Coding::PcmFloatLe | Coding::PcmFloatBe => 4,
            Coding::FsbVorbis => 0,
        }
    }

    /// Codec keeps its own engine state in a [`CodecData`](super::decoder::CodecData).
    pub fn is_stateful(&self) -> bool {
        matches!(self, Coding::FsbVorbis)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Coding::Pcm16Le => "Little Endian 16-bit PCM",
            Coding::Pcm16Be => "Big Endian 16-bit PCM",
            Coding::Pcm16LeInt => "Little Endian 16-bit PCM with 2 byte interleave",
            Coding::Pcm16BeInt => "Big Endian 16-bit PCM with 2 byte interleave",
            Coding::Pcm16LeXorInt => "Little Endian 16-bit PCM with 2 byte interleave and XOR obfuscation",
            Coding::Pcm8 => "8-bit PCM",
            Coding::Pcm8Int => "8-bit PCM with 1 byte interleave",
            Coding::Pcm8Unsigned => "8-bit unsigned PCM",
            Coding::Pcm8UnsignedInt => "8-bit unsigned PCM with 1 byte interleave",
            Coding::Pcm8SbInt => "8-bit PCM, sign bit, 1 byte interleave",
            Coding::Ulaw => "8-bit u-Law",
            Coding::PcmFloatLe => "32-bit float PCM",
            Coding::PcmFloatBe => "32-bit float PCM (big endian)",
            Coding::Ima => "4-bit IMA ADPCM",
            Coding::FsbVorbis => "FSB Vorbis",
        }
    }
}

/// Samples held in `bytes` of PCM data across `channels`.
pub fn pcm_bytes_to_samples(bytes: u64, channels: usize, bits_per_sample: u32) -> usize {
    if channels == 0 || bits_per_sample == 0 {
        return 0;
    }
    (bytes * 8 / (channels as u64 * bits_per_sample as u64)) as usize
}
