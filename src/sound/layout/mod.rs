//! Channel data layouts
//!
//! A layout decides where each channel's bytes for the current window
//! live. Flat and interleaved layouts are pure functions of the sample
//! position; blocked layouts re-read a block header at every boundary.

pub mod blocked;
pub mod flat;
pub mod interleave;

pub use blocked::{AstBlocks, BlockEndPolicy, BlockLayout, BlockState, AST_BLOCKS};

use super::sample::SampleBuffer;
use super::stream::VgmStream;

/// How a stream's channel data is arranged.
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    /// One contiguous run per channel.
    Flat,
    /// Fixed-size blocks alternating between channels.
    Interleave,
    /// Interleave whose final block is `interleave_smallblock_size` bytes.
    InterleaveShortBlock,
    /// Container blocks with their own headers.
    Blocked(&'static dyn BlockLayout),
}

impl Layout {
    pub fn description(&self) -> &'static str {
        match self {
            Layout::Flat => "flat (no layout)",
            Layout::Interleave => "interleave",
            Layout::InterleaveShortBlock => "interleave with short last block",
            Layout::Blocked(blocks) => blocks.description(),
        }
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(self, Layout::Interleave | Layout::InterleaveShortBlock)
    }
}

/// Render `sample_count` frames into `buf` with the stream's layout.
///
/// Returns the number of frames decoded before the data ran out; the rest
/// of the request is silence.
pub(crate) fn render_layout(stream: &mut VgmStream, buf: &mut SampleBuffer<'_>, sample_count: usize) -> usize {
    match stream.header.layout {
        Layout::Flat => flat::render_flat(stream, buf, sample_count),
        Layout::Interleave | Layout::InterleaveShortBlock => {
            interleave::render_interleave(stream, buf, sample_count)
        }
        Layout::Blocked(blocks) => blocked::render_blocked(stream, blocks, buf, sample_count),
    }
}
