//! Streaming decoder for game audio containers
//!
//! Opens a file, recognizes its container, and renders interleaved 16-bit
//! PCM with the container's loop points honored.

pub mod cli;
pub mod config;
pub mod io;
pub mod logging;
pub mod sound;

pub use cli::Cli;
pub use config::Options;
pub use logging::LogLevel;
pub use sound::{init_vgmstream, PlaybackConfig, VgmStream};
