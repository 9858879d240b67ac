//! Play length and fade-out
//!
//! Looping streams have no natural end, so playback is cut after a number
//! of loops and faded out linearly over the last `fade_seconds`.

use super::sample::SampleBuffer;
use super::stream::StreamHeader;

/// How long to play a stream and how to end it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Times the loop region plays.
    pub loop_count: f64,
    pub fade_seconds: f64,
    /// Extra looping before the fade starts.
    pub fade_delay_seconds: f64,
    /// Play the part after the loop end instead of fading.
    pub ignore_fade: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            loop_count: 2.0,
            fade_seconds: 10.0,
            fade_delay_seconds: 0.0,
            ignore_fade: false,
        }
    }
}

impl PlaybackConfig {
    /// Total frames to play for a stream with `header`.
    pub fn play_samples(&self, header: &StreamHeader) -> usize {
        if !header.loop_flag {
            return header.num_samples;
        }

        let loop_region = header.loop_end_sample.saturating_sub(header.loop_start_sample);
        if self.ignore_fade {
            let looped = header.loop_start_sample + loop_region * self.loop_target();
            looped + header.num_samples.saturating_sub(header.loop_end_sample)
        } else {
            let looped = header.loop_start_sample as f64 + loop_region as f64 * self.loop_count;
            let tail = (self.fade_delay_seconds + self.fade_seconds) * header.sample_rate as f64;
            (looped + tail).max(0.0) as usize
        }
    }

    /// Whole loops played before running to the end when the fade is
    /// ignored. Partial loops are dropped.
    pub fn loop_target(&self) -> usize {
        (self.loop_count as usize).max(1)
    }

    /// Frames in the fade-out window.
    pub fn fade_samples(&self, sample_rate: u32) -> usize {
        if self.ignore_fade {
            0
        } else {
            (self.fade_seconds * sample_rate as f64).max(0.0) as usize
        }
    }
}

/// A config resolved against one stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPlan {
    pub config: PlaybackConfig,
    pub length: usize,
    pub fade_samples: usize,
}

impl PlaybackPlan {
    pub fn new(config: PlaybackConfig, header: &StreamHeader) -> Self {
        Self {
            config,
            length: config.play_samples(header),
            fade_samples: config.fade_samples(header.sample_rate),
        }
    }
}

/// Where a stream is in its playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Fresh,
    Playing,
    Looping,
    Fading,
    Exhausted,
}

/// Gain for a sample `samples_into_fade` frames into a fade of `fade_samples`.
pub fn fade_scale(samples_into_fade: usize, fade_samples: usize) -> f64 {
    if fade_samples == 0 || samples_into_fade >= fade_samples {
        return 0.0;
    }
    (fade_samples - samples_into_fade) as f64 / fade_samples as f64
}

/// Fade `count` frames of `buf` that sit at `position` of a playback of
/// `length` frames whose last `fade_samples` fade out.
pub fn apply_fade(buf: &mut SampleBuffer<'_>, position: usize, count: usize, length: usize, fade_samples: usize) {
    let fade_start = length.saturating_sub(fade_samples);
    for n in 0..count {
        let pos = position + n;
        if pos <= fade_start {
            continue;
        }
        let scale = fade_scale(pos - fade_start, fade_samples);
        for sample in buf.frame_mut(n) {
            *sample = (*sample as f64 * scale) as i16;
        }
    }
}
