//! Block-structured layouts
//!
//! The container is a chain of blocks, each with a header that says how
//! much data every channel has in it. Crossing a block boundary calls
//! [`BlockLayout::update`] with the next block's offset, which rewrites the
//! channel offsets and the block bookkeeping.
//!
//! An update that finds no valid block clears `current_block_offset`; the
//! stream's [`BlockEndPolicy`] then decides what the rest of it sounds like.

use crate::sound::channel::ChannelState;
use crate::sound::sample::SampleBuffer;
use crate::sound::stream::VgmStream;

/// Position inside a block-structured stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockState {
    /// Offset of the current block header, `None` once the chain ended.
    pub current_block_offset: Option<u64>,
    /// Bytes of each channel's data in the current block.
    pub current_block_size: usize,
    /// Samples per channel in the block when the header states it directly.
    pub current_block_samples: Option<usize>,
    pub next_block_offset: u64,
}

impl BlockState {
    /// Mark the chain as ended at `block_offset`.
    pub fn end(&mut self, block_offset: u64) {
        self.current_block_offset = None;
        self.current_block_size = 0;
        self.current_block_samples = None;
        self.next_block_offset = block_offset;
    }
}

/// What a blocked stream plays after its block chain ends early.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockEndPolicy {
    /// Keep the declared length, playing silence where blocks are missing.
    #[default]
    PadToLength,
    /// Treat the stream as finished at the last good block.
    EndStream,
}

/// Block header parser for one container family.
pub trait BlockLayout: Send + Sync + std::fmt::Debug {
    fn description(&self) -> &'static str;

    /// Position every channel at the block starting at `block_offset`.
    ///
    /// Calling it again with the same offset gives the same result.
    fn update(&self, block_offset: u64, channels: &mut [ChannelState], block: &mut BlockState);
}

/// Nintendo AST `BLCK` chunks.
///
/// ```text
/// 0x00  "BLCK"
/// 0x04  per-channel data size (u32 BE)
/// 0x08  padding up to 0x20
/// 0x20  channel 0 data, channel 1 data, ...
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AstBlocks;

const BLCK_ID: u32 = 0x424C434B;
const AST_BLOCK_HEADER_SIZE: u64 = 0x20;

impl BlockLayout for AstBlocks {
    fn description(&self) -> &'static str {
        "AST blocked"
    }

    fn update(&self, block_offset: u64, channels: &mut [ChannelState], block: &mut BlockState) {
        let Some(first) = channels.first() else {
            block.end(block_offset);
            return;
        };
        let sf = first.streamfile.clone();
        let file_size = sf.size();

        if block_offset + AST_BLOCK_HEADER_SIZE > file_size || sf.read_u32be(block_offset) != BLCK_ID {
            block.end(block_offset);
            return;
        }

        let block_size = sf.read_u32be(block_offset + 0x04) as u64;
        let data_start = block_offset + AST_BLOCK_HEADER_SIZE;
        if block_size == 0 || data_start + block_size > file_size {
            log::debug!("AST: bad block at 0x{:x} (size 0x{:x})", block_offset, block_size);
            block.end(block_offset);
            return;
        }

        block.current_block_offset = Some(block_offset);
        block.current_block_size = block_size as usize;
        block.current_block_samples = None;
        block.next_block_offset = data_start + block_size * channels.len() as u64;

        for (index, ch) in channels.iter_mut().enumerate() {
            ch.offset = data_start + block_size * index as u64;
        }
    }
}

pub static AST_BLOCKS: AstBlocks = AstBlocks;

fn samples_in_block(stream: &VgmStream) -> usize {
    let block = &stream.state.block;
    if let Some(samples) = block.current_block_samples {
        return samples;
    }
    let coding = stream.header.coding;
    match coding.frame_size() {
        0 => 0,
        frame_size => block.current_block_size / frame_size * coding.samples_per_frame(),
    }
}

pub(crate) fn render_blocked(
    stream: &mut VgmStream,
    blocks: &'static dyn BlockLayout,
    buf: &mut SampleBuffer<'_>,
    sample_count: usize,
) -> usize {
    let mut samples_written = 0;

    while samples_written < sample_count {
        if stream.do_loop() {
            continue;
        }

        let ended = stream.state.block.current_block_offset.is_none();
        let samples_this_block = if ended {
            if stream.header.block_end == BlockEndPolicy::EndStream {
                stream.mark_exhausted();
                buf.silence(samples_written, sample_count - samples_written);
                break;
            }
            let remaining = stream.header.num_samples.saturating_sub(stream.state.current_sample);
            stream.state.samples_into_block + remaining
        } else {
            samples_in_block(stream)
        };

        let samples_to_do = stream
            .samples_to_do(samples_this_block)
            .min(sample_count - samples_written);
        if samples_to_do == 0 {
            if !ended && stream.state.current_sample < stream.header.num_samples {
                // empty block, move on
                let next = stream.state.block.next_block_offset;
                stream.block_update(blocks, next);
                continue;
            }
            stream.mark_exhausted();
            buf.silence(samples_written, sample_count - samples_written);
            break;
        }

        if ended {
            buf.silence(samples_written, samples_to_do);
        } else {
            stream.decode(buf, samples_written, samples_to_do);
        }
        stream.advance(samples_to_do);
        samples_written += samples_to_do;

        if !ended && stream.state.samples_into_block == samples_this_block {
            let next = stream.state.block.next_block_offset;
            stream.block_update(blocks, next);
        }
    }
    samples_written
}
