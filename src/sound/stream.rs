//! Playback engine
//!
//! A [`VgmStream`] owns everything needed to turn a container into PCM:
//! the per-channel cursors, the layout, the codec state and the loop
//! bookkeeping. Format parsers build one; callers render from it.
//!
//! Rendering stops internally at block and loop boundaries and resumes in
//! the same call. The first time playback reaches `loop_start_sample` the
//! channel cursors are snapshotted; reaching `loop_end_sample` restores
//! that snapshot and repositions the codec, so every pass over the loop
//! region produces the same samples.

use std::fmt::Write as _;

use super::channel::ChannelState;
use super::coding;
use super::decoder::CodecData;
use super::formats::Coding;
use super::layout::{self, BlockEndPolicy, BlockLayout, BlockState, Layout};
use super::playback::{apply_fade, PlaybackConfig, PlaybackPhase, PlaybackPlan};
use super::sample::SampleBuffer;

const SEEK_CHUNK_FRAMES: usize = 0x1000;

/// Static description of a stream, filled in by the format parser.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    pub channels: usize,
    pub sample_rate: u32,
    pub num_samples: usize,
    pub loop_flag: bool,
    pub loop_start_sample: usize,
    pub loop_end_sample: usize,
    /// Stop looping after this many loops; 0 loops forever.
    pub loop_target: usize,
    pub coding: Coding,
    pub layout: Layout,
    pub interleave_block_size: usize,
    pub interleave_smallblock_size: usize,
    /// Offset of the first block for blocked layouts.
    pub start_offset: u64,
    pub block_end: BlockEndPolicy,
    /// Name of the format parser that recognized the file.
    pub meta: &'static str,
    /// Subsong index, starting at 1.
    pub stream_index: usize,
    pub num_streams: usize,
}

impl StreamHeader {
    pub fn new(channels: usize, sample_rate: u32, num_samples: usize, coding: Coding, layout: Layout) -> Self {
        Self {
            channels,
            sample_rate,
            num_samples,
            loop_flag: false,
            loop_start_sample: 0,
            loop_end_sample: 0,
            loop_target: 0,
            coding,
            layout,
            interleave_block_size: 0,
            interleave_smallblock_size: 0,
            start_offset: 0,
            block_end: BlockEndPolicy::default(),
            meta: "",
            stream_index: 1,
            num_streams: 1,
        }
    }

    pub fn with_loop(mut self, loop_flag: bool, start: usize, end: usize) -> Self {
        self.loop_flag = loop_flag;
        self.loop_start_sample = start;
        self.loop_end_sample = end;
        self
    }

    /// Whether the loop points describe a playable region.
    pub fn loop_points_valid(&self) -> bool {
        self.loop_end_sample > self.loop_start_sample && self.loop_end_sample <= self.num_samples
    }
}

/// Mutable playback position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayState {
    pub current_sample: usize,
    pub samples_into_block: usize,
    pub block: BlockState,
    pub hit_loop: bool,
    pub loop_count: usize,
    /// Rendering ran past the end of the data.
    pub exhausted: bool,
}

#[derive(Debug, Clone)]
struct Snapshot {
    ch: Vec<ChannelState>,
    state: PlayState,
}

/// A decodable stream.
pub struct VgmStream {
    pub header: StreamHeader,
    pub ch: Vec<ChannelState>,
    pub(crate) state: PlayState,
    codec: Option<Box<dyn CodecData>>,
    loop_snapshot: Option<Snapshot>,
    start_header: StreamHeader,
    start: Snapshot,
    plan: Option<PlaybackPlan>,
    /// Frames rendered since the last reset.
    played: usize,
    /// `loop_flag` was cleared by reaching `loop_target`.
    target_reached: bool,
}

impl VgmStream {
    /// Assemble a stream and record its initial state for [`reset`](Self::reset).
    ///
    /// Blocked layouts are positioned at `header.start_offset` first.
    pub fn new(header: StreamHeader, ch: Vec<ChannelState>, codec: Option<Box<dyn CodecData>>) -> Self {
        let mut state = PlayState::default();
        let mut ch = ch;
        if let Layout::Blocked(blocks) = header.layout {
            blocks.update(header.start_offset, &mut ch, &mut state.block);
        }
        let start = Snapshot {
            ch: ch.clone(),
            state: state.clone(),
        };
        Self {
            start_header: header.clone(),
            header,
            ch,
            state,
            codec,
            loop_snapshot: None,
            start,
            plan: None,
            played: 0,
            target_reached: false,
        }
    }

    /// Make the current header the one [`reset`](Self::reset) returns to.
    pub fn commit_header(&mut self) {
        self.start_header = self.header.clone();
    }

    pub fn channels(&self) -> usize {
        self.header.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    pub fn state(&self) -> &PlayState {
        &self.state
    }

    pub fn codec_name(&self) -> Option<&'static str> {
        self.codec.as_ref().map(|c| c.name())
    }

    /// Frames rendered since the last reset.
    pub fn played(&self) -> usize {
        self.played
    }

    pub(crate) fn mark_exhausted(&mut self) {
        self.state.exhausted = true;
    }

    pub(crate) fn advance(&mut self, samples: usize) {
        self.state.current_sample += samples;
        self.state.samples_into_block += samples;
    }

    pub(crate) fn decode(&mut self, buf: &mut SampleBuffer<'_>, first_frame: usize, samples_to_do: usize) {
        coding::decode_frames(
            self.header.coding,
            &mut self.ch,
            self.codec.as_deref_mut(),
            buf,
            first_frame,
            self.state.samples_into_block,
            samples_to_do,
        );
    }

    pub(crate) fn block_update(&mut self, blocks: &dyn BlockLayout, block_offset: u64) {
        blocks.update(block_offset, &mut self.ch, &mut self.state.block);
        self.state.samples_into_block = 0;
    }

    /// Samples that can be decoded before the next block, loop or frame
    /// boundary, given `samples_this_block` in the current block.
    pub(crate) fn samples_to_do(&self, samples_this_block: usize) -> usize {
        let current = self.state.current_sample;
        let mut samples_to_do = samples_this_block.saturating_sub(self.state.samples_into_block);
        samples_to_do = samples_to_do.min(self.header.num_samples.saturating_sub(current));

        if self.header.loop_flag {
            if current + samples_to_do > self.header.loop_end_sample {
                samples_to_do = self.header.loop_end_sample.saturating_sub(current);
            }
            if !self.state.hit_loop && current + samples_to_do > self.header.loop_start_sample {
                samples_to_do = self.header.loop_start_sample.saturating_sub(current);
            }
        }

        let samples_per_frame = self.header.coding.samples_per_frame();
        if samples_per_frame > 1 {
            let into_frame = self.state.samples_into_block % samples_per_frame;
            if into_frame + samples_to_do > samples_per_frame {
                samples_to_do = samples_per_frame - into_frame;
            }
        }
        samples_to_do
    }

    /// Handle the loop points at the current position.
    ///
    /// Returns true if playback jumped back to the loop start.
    pub(crate) fn do_loop(&mut self) -> bool {
        if !self.header.loop_flag {
            return false;
        }

        if self.state.current_sample == self.header.loop_end_sample {
            self.state.loop_count += 1;
            if self.header.loop_target > 0 && self.state.loop_count == self.header.loop_target {
                self.header.loop_flag = false;
                self.target_reached = true;
                return false;
            }

            let Some(snapshot) = self.loop_snapshot.as_ref() else {
                log::warn!("{}: loop end reached without loop start, looping disabled", self.header.meta);
                self.header.loop_flag = false;
                return false;
            };
            let loop_count = self.state.loop_count;
            self.ch = snapshot.ch.clone();
            self.state = snapshot.state.clone();
            self.state.loop_count = loop_count;

            if let Some(codec) = self.codec.as_mut() {
                codec.seek(&mut self.ch, self.header.loop_start_sample);
            }
            return true;
        }

        if !self.state.hit_loop && self.state.current_sample == self.header.loop_start_sample {
            self.state.hit_loop = true;
            self.loop_snapshot = Some(Snapshot {
                ch: self.ch.clone(),
                state: self.state.clone(),
            });
        }
        false
    }

    /// Decode up to `frames` interleaved frames into `buf`.
    ///
    /// The request is cut to what fits in `buf`. Returns the number of
    /// frames decoded from data; anything after that is silence.
    pub fn render(&mut self, buf: &mut [i16], frames: usize) -> usize {
        let mut out = SampleBuffer::new(buf, self.header.channels);
        let frames = frames.min(out.frames());
        let decoded = layout::render_layout(self, &mut out, frames);
        self.played += frames;
        decoded
    }

    /// Back to the first sample, keeping the current header.
    fn rewind(&mut self) {
        self.ch = self.start.ch.clone();
        self.state = self.start.state.clone();
        self.loop_snapshot = None;
        self.played = 0;
        if std::mem::take(&mut self.target_reached) {
            self.header.loop_flag = true;
        }
        if let Some(codec) = self.codec.as_mut() {
            codec.reset(&mut self.ch);
        }
    }

    /// Return to the state right after opening, undoing forced loops.
    pub fn reset(&mut self) {
        self.header = self.start_header.clone();
        self.target_reached = false;
        self.rewind();
        if let Some(plan) = self.plan {
            self.apply_loop_target(&plan);
        }
    }

    /// Move to frame `target` of the playback timeline.
    ///
    /// Decodes and drops everything in between, which keeps stateful
    /// codecs and loops exact.
    pub fn seek(&mut self, target: usize) {
        if target < self.played {
            self.rewind();
        }
        let channels = self.header.channels.max(1);
        let mut scratch = vec![0i16; SEEK_CHUNK_FRAMES * channels];
        while self.played < target {
            let frames = (target - self.played).min(SEEK_CHUNK_FRAMES);
            self.render(&mut scratch, frames);
        }
    }

    /// Impose (or remove) loop points and restart playback.
    ///
    /// Returns false if the points are unusable; the stream is unchanged.
    pub fn force_loop(&mut self, loop_flag: bool, loop_start: usize, loop_end: usize) -> bool {
        if loop_flag && (loop_end <= loop_start || loop_end > self.header.num_samples) {
            log::warn!(
                "Ignoring loop points {}..{} for a stream of {} samples",
                loop_start,
                loop_end,
                self.header.num_samples
            );
            return false;
        }
        self.header.loop_flag = loop_flag;
        if loop_flag {
            self.header.loop_start_sample = loop_start;
            self.header.loop_end_sample = loop_end;
        }
        self.target_reached = false;
        self.rewind();
        if let Some(plan) = self.plan {
            self.apply_loop_target(&plan);
        }
        true
    }

    /// Total frames this stream plays with `config`.
    pub fn play_samples(&self, config: &PlaybackConfig) -> usize {
        config.play_samples(&self.header)
    }

    fn apply_loop_target(&mut self, plan: &PlaybackPlan) {
        if plan.config.ignore_fade && self.header.loop_flag {
            self.header.loop_target = plan.config.loop_target();
        }
    }

    /// Fix the play length and fade for [`play`](Self::play).
    pub fn configure_playback(&mut self, config: PlaybackConfig) -> usize {
        let plan = PlaybackPlan::new(config, &self.header);
        self.apply_loop_target(&plan);
        self.plan = Some(plan);
        plan.length
    }

    fn current_plan(&self) -> PlaybackPlan {
        self.plan
            .unwrap_or_else(|| PlaybackPlan::new(PlaybackConfig::default(), &self.header))
    }

    /// Frames left before the configured play length.
    pub fn remaining(&self) -> usize {
        self.current_plan().length.saturating_sub(self.played)
    }

    /// Render the next piece of the configured playback, fade included.
    ///
    /// Returns the frames written, 0 once the play length is reached.
    pub fn play(&mut self, buf: &mut [i16], frames: usize) -> usize {
        let plan = self.current_plan();
        let channels = self.header.channels;
        let frames = frames.min(self.remaining()).min(buf.len() / channels.max(1));
        if frames == 0 {
            return 0;
        }

        let position = self.played;
        self.render(buf, frames);
        if self.header.loop_flag && plan.fade_samples > 0 {
            let mut out = SampleBuffer::new(buf, channels);
            apply_fade(&mut out, position, frames, plan.length, plan.fade_samples);
        }
        frames
    }

    pub fn phase(&self) -> PlaybackPhase {
        let plan = self.current_plan();
        if self.played >= plan.length || self.state.exhausted {
            PlaybackPhase::Exhausted
        } else if self.header.loop_flag
            && plan.fade_samples > 0
            && self.played >= plan.length.saturating_sub(plan.fade_samples)
        {
            PlaybackPhase::Fading
        } else if self.state.loop_count > 0 {
            PlaybackPhase::Looping
        } else if self.played == 0 {
            PlaybackPhase::Fresh
        } else {
            PlaybackPhase::Playing
        }
    }

    /// Human readable summary of the stream.
    pub fn describe(&self) -> String {
        let h = &self.header;
        let rate = h.sample_rate.max(1) as f64;
        let mut desc = String::new();

        let _ = writeln!(desc, "sample rate: {} Hz", h.sample_rate);
        let _ = writeln!(desc, "channels: {}", h.channels);
        if h.loop_flag {
            let _ = writeln!(
                desc,
                "loop start: {} samples ({})",
                h.loop_start_sample,
                format_time(h.loop_start_sample as f64 / rate)
            );
            let _ = writeln!(
                desc,
                "loop end: {} samples ({})",
                h.loop_end_sample,
                format_time(h.loop_end_sample as f64 / rate)
            );
        }
        let _ = writeln!(
            desc,
            "stream total samples: {} ({})",
            h.num_samples,
            format_time(h.num_samples as f64 / rate)
        );
        let _ = writeln!(desc, "encoding: {}", h.coding.description());
        let _ = writeln!(desc, "layout: {}", h.layout.description());
        if h.layout.is_interleaved() {
            let _ = writeln!(desc, "interleave: {:#x} bytes", h.interleave_block_size);
            if matches!(h.layout, Layout::InterleaveShortBlock) {
                let _ = writeln!(desc, "interleave last block: {:#x} bytes", h.interleave_smallblock_size);
            }
        }
        let _ = writeln!(desc, "metadata from: {}", h.meta);
        if h.num_streams > 1 {
            let _ = writeln!(desc, "stream number: {}/{}", h.stream_index, h.num_streams);
        }
        desc
    }
}

fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    format!("{}:{:06.3} seconds", minutes as u64, seconds - minutes * 60.0)
}

impl std::fmt::Debug for VgmStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VgmStream")
            .field("header", &self.header)
            .field("state", &self.state)
            .field("codec", &self.codec_name())
            .finish()
    }
}
