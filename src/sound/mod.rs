//! Streamed game audio decoding
//!
//! # Architecture
//!
//! - `meta` recognizes container formats and builds a [`VgmStream`]
//! - `layout` walks the container's data arrangement (flat, interleaved, blocked)
//! - `coding` turns encoded bytes into 16-bit PCM, with [`CodecData`] for
//!   codecs that carry state across calls
//! - `stream` drives rendering, looping, seeking and reset
//! - `playback` works out play length and applies the fade-out
//! - `wav` writes the decoded PCM back out

pub mod channel;
pub mod coding;
pub mod decoder;
pub mod formats;
pub mod layout;
pub mod meta;
pub mod playback;
pub mod sample;
pub mod stream;
pub mod wav;

pub use channel::{AdpcmHistory, ChannelState};
pub use decoder::{CodecData, DecodeError, DecodeResult};
pub use formats::Coding;
pub use layout::{BlockEndPolicy, Layout};
pub use meta::{init_vgmstream, init_vgmstream_buffer, init_vgmstream_from_streamfile};
pub use playback::{PlaybackConfig, PlaybackPhase};
pub use stream::{PlayState, StreamHeader, VgmStream};
pub use wav::{make_wav_header, write_samples_le};
