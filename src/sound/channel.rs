//! Per-channel decode cursor

use crate::io::StreamHandle;

/// Predictor state carried between calls by ADPCM codecs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdpcmHistory {
    pub hist1: i32,
    pub hist2: i32,
    pub step_index: i32,
}

/// Where one channel reads from and what it remembers between decodes.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub streamfile: StreamHandle,
    /// Offset of the channel's first byte, used by reset and seek.
    pub channel_start_offset: u64,
    /// Current read offset.
    pub offset: u64,
    pub adpcm: AdpcmHistory,
    pub key_xor: u16,
}

impl ChannelState {
    pub fn new(streamfile: StreamHandle, start_offset: u64) -> Self {
        Self {
            streamfile,
            channel_start_offset: start_offset,
            offset: start_offset,
            adpcm: AdpcmHistory::default(),
            key_xor: 0,
        }
    }

    /// Same file, cursor and history.
    pub fn same_position(&self, other: &ChannelState) -> bool {
        self.streamfile.same_source(&other.streamfile)
            && self.channel_start_offset == other.channel_start_offset
            && self.offset == other.offset
            && self.adpcm == other.adpcm
            && self.key_xor == other.key_xor
    }
}
