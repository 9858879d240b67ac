//! Flat layout: each channel is a single contiguous run.

use crate::sound::sample::SampleBuffer;
use crate::sound::stream::VgmStream;

pub(crate) fn render_flat(stream: &mut VgmStream, buf: &mut SampleBuffer<'_>, sample_count: usize) -> usize {
    let samples_this_block = stream.header.num_samples;
    let mut samples_written = 0;

    while samples_written < sample_count {
        if stream.do_loop() {
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
    }
    samples_written
}
