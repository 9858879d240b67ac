//! Decoder errors and the stateful codec contract
//!
//! Stateless codecs are plain functions dispatched on [`Coding`]. Codecs
//! that carry their own engine state implement [`CodecData`]; the stream
//! owns the box and drops it when the stream is dropped.
//!
//! [`Coding`]: super::formats::Coding

use super::channel::ChannelState;
use super::sample::SampleBuffer;

/// Error type for format parsing and codec setup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Data is not in the format the parser handles
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Recognized format with inconsistent header values
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
    /// A companion file the stream needs could not be opened
    #[error("Missing companion file: {0}")]
    MissingFile(String),
    /// The codec engine rejected its setup
    #[error("Decoder error: {0}")]
    DecoderError(String),
}

/// Result type for decoder operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Codec with internal decoder state.
///
/// `decode` never fails: on corrupt input the codec fills the rest of the
/// request with silence and tries again on the next call.
pub trait CodecData: Send {
    /// Human readable codec name.
    fn name(&self) -> &'static str;

    /// Decode `samples_to_do` interleaved frames into the start of `out`.
    fn decode(
        &mut self,
        channels: &mut [ChannelState],
        out: &mut SampleBuffer<'_>,
        samples_to_do: usize,
    );

    /// Return to the state right after init.
    fn reset(&mut self, channels: &mut [ChannelState]) {
        self.seek(channels, 0);
    }

    /// Position the codec so the next decoded sample is `sample`.
    fn seek(&mut self, channels: &mut [ChannelState], sample: usize);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::MissingFile("a/.vorbis_00000001".to_string());
        assert_eq!(format!("{}", err), "Missing companion file: a/.vorbis_00000001");

        let err = DecodeError::UnsupportedFormat("not RIFF".to_string());
        assert_eq!(format!("{}", err), "Unsupported format: not RIFF");
    }

    #[test]
    fn test_decode_error_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<DecodeError>();
        assert_send::<Box<dyn CodecData>>();
    }
}
