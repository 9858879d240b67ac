//! Fixed-size interleave
//!
//! Channel data alternates in blocks of `interleave_block_size` bytes.
//! When a block is used up every channel skips the other channels' blocks.
//! The short-block variant ends with one `interleave_smallblock_size`
//! block per channel.

use crate::sound::layout::Layout;
use crate::sound::sample::SampleBuffer;
use crate::sound::stream::VgmStream;

fn block_samples(block_size: usize, stream: &VgmStream) -> usize {
    let coding = stream.header.coding;
    let frame_size = coding.frame_size();
    if frame_size == 0 {
        return stream.header.num_samples;
    }
    block_size / frame_size * coding.samples_per_frame()
}

fn in_short_block(stream: &VgmStream, samples_this_block: usize) -> bool {
    matches!(stream.header.layout, Layout::InterleaveShortBlock)
        && stream.state.current_sample - stream.state.samples_into_block + samples_this_block
            > stream.header.num_samples
}

pub(crate) fn render_interleave(stream: &mut VgmStream, buf: &mut SampleBuffer<'_>, sample_count: usize) -> usize {
    let full_block_samples = block_samples(stream.header.interleave_block_size, stream);
    let short_block_samples = block_samples(stream.header.interleave_smallblock_size, stream);
    if full_block_samples == 0 {
        stream.mark_exhausted();
        buf.silence(0, sample_count);
        return 0;
    }

    let mut samples_this_block = full_block_samples;
    if in_short_block(stream, samples_this_block) {
        samples_this_block = short_block_samples;
    }

    let mut samples_written = 0;
    while samples_written < sample_count {
        if stream.do_loop() {
            // loops never land inside the short block
            samples_this_block = full_block_samples;
            continue;
        }

        let samples_to_do = stream
            .samples_to_do(samples_this_block)
            .min(sample_count - samples_written);
        if samples_to_do == 0 {
            stream.mark_exhausted();
            buf.silence(samples_written, sample_count - samples_written);
            break;
        }

        stream.decode(buf, samples_written, samples_to_do);
        stream.advance(samples_to_do);
        samples_written += samples_to_do;

        if stream.state.samples_into_block == samples_this_block {
            let channels = stream.ch.len() as u64;
            let block = stream.header.interleave_block_size as u64;
            let short = stream.header.interleave_smallblock_size as u64;

            if matches!(stream.header.layout, Layout::InterleaveShortBlock)
                && stream.state.current_sample + samples_this_block > stream.header.num_samples
            {
                samples_this_block = short_block_samples.max(1);
                for (index, ch) in stream.ch.iter_mut().enumerate() {
                    let index = index as u64;
                    ch.offset += block * (channels - index) + short * index;
                }
            } else {
                for ch in stream.ch.iter_mut() {
                    ch.offset += block * channels;
                }
            }
            stream.state.samples_into_block = 0;
        }
    }
    samples_written
}
