//! Views over interleaved 16-bit sample buffers

/// Interleaved buffer of `channels`-sample frames.
#[derive(Debug)]
pub struct SampleBuffer<'a> {
    samples: &'a mut [i16],
    channels: usize,
}

impl<'a> SampleBuffer<'a> {
    pub fn new(samples: &'a mut [i16], channels: usize) -> Self {
        Self {
            samples,
            channels: channels.max(1),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of whole frames in the buffer.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn as_slice(&self) -> &[i16] {
        self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [i16] {
        self.samples
    }

    /// Sub-buffer starting at `first_frame`.
    pub fn frames_from(&mut self, first_frame: usize) -> SampleBuffer<'_> {
        let start = (first_frame * self.channels).min(self.samples.len());
        SampleBuffer {
            samples: &mut self.samples[start..],
            channels: self.channels,
        }
    }

    /// Strided view of one channel, starting at `first_frame`.
    pub fn channel(&mut self, channel: usize, first_frame: usize) -> ChannelSlice<'_> {
        let start = first_frame * self.channels + channel;
        let samples = match self.samples.get_mut(start..) {
            Some(s) if channel < self.channels => s,
            _ => &mut [],
        };
        ChannelSlice {
            samples,
            stride: self.channels,
        }
    }

    pub fn frame_mut(&mut self, frame: usize) -> &mut [i16] {
        let start = (frame * self.channels).min(self.samples.len());
        let end = (start + self.channels).min(self.samples.len());
        &mut self.samples[start..end]
    }

    /// Zero `count` frames starting at `first_frame`.
    pub fn silence(&mut self, first_frame: usize, count: usize) {
        let start = (first_frame * self.channels).min(self.samples.len());
        let end = ((first_frame + count) * self.channels).min(self.samples.len());
        self.samples[start..end].fill(0);
    }
}

/// One channel of an interleaved buffer.
#[derive(Debug)]
pub struct ChannelSlice<'a> {
    samples: &'a mut [i16],
    stride: usize,
}

impl<'a> ChannelSlice<'a> {
    /// Wrap a raw buffer where consecutive samples are `stride` apart.
    pub fn new(samples: &'a mut [i16], stride: usize) -> Self {
        Self {
            samples,
            stride: stride.max(1),
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.samples.len().div_ceil(self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Store the `index`th sample of this channel; out of range is ignored.
    #[inline]
    pub fn set(&mut self, index: usize, value: i16) {
        if let Some(s) = self.samples.get_mut(index * self.stride) {
            *s = value;
        }
    }

    pub fn get(&self, index: usize) -> i16 {
        self.samples.get(index * self.stride).copied().unwrap_or(0)
    }
}

/// Saturate to the 16-bit range.
#[inline]
pub fn clamp16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Float sample in [-1.0, 1.0] to 16-bit with rounding and saturation.
#[inline]
pub fn float_to_i16(value: f32) -> i16 {
    clamp16((value * 32767.0 + 0.5).floor() as i32)
}
