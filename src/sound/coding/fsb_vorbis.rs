//! FMOD raw Vorbis decoder
//!
//! FSB files store bare Vorbis audio packets, each prefixed with a 16-bit
//! little endian length, and no Vorbis headers. The identification and
//! comment headers are rebuilt from the container values. The setup
//! header (codebooks) is shared by every stream encoded with the same
//! settings and comes from a companion file named after its id.
//!
//! Seeking restarts the stream and drops decoded samples until the target
//! is reached.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::io::{directory_prefix, StreamHandle};
use crate::sound::channel::ChannelState;
use crate::sound::decoder::{CodecData, DecodeError, DecodeResult};
use crate::sound::sample::{float_to_i16, SampleBuffer};

/// Raw packet staging size; larger packets grow the buffer.
pub const FSB_VORBIS_DEFAULT_BUFFER_SIZE: usize = 0x8000;

/// Container default block sizes.
pub const FSB_VORBIS_BLOCKSIZE_SHORT: u32 = 256;
pub const FSB_VORBIS_BLOCKSIZE_LONG: u32 = 2048;

const VENDOR_STRING: &[u8] = b"vgmdecode";

const SETUP_CACHE_ENTRIES: usize = 16;

/// Setup packets by companion file name.
static SETUP_CACHE: Mutex<Option<LruCache<String, Arc<[u8]>>>> = Mutex::new(None);

/// Reasons a synthesis engine can refuse a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Header packet in the audio stream; skipped.
    #[error("packet is not audio")]
    NotAudio,
    #[error("corrupt packet: {0}")]
    Corrupt(String),
}

/// Vorbis packet decoder behind the FSB framing.
pub trait SynthesisEngine: Send {
    /// Decode one audio packet into planar float samples.
    fn synthesize(&mut self, packet: &[u8]) -> Result<Vec<Vec<f32>>, EngineError>;

    /// Forget overlap state so the next packet starts a fresh stream.
    fn restart(&mut self);
}

/// Vorbis identification header for the given stream values.
pub fn make_header_identification(
    channels: usize,
    sample_rate: u32,
    blocksize_short: u32,
    blocksize_long: u32,
) -> Option<Vec<u8>> {
    let channels = u8::try_from(channels).ok().filter(|&c| c > 0)?;
    if !blocksize_short.is_power_of_two() || !blocksize_long.is_power_of_two() {
        return None;
    }
    let exp_short = blocksize_short.trailing_zeros() as u8;
    let exp_long = blocksize_long.trailing_zeros() as u8;

    let mut header = Vec::with_capacity(0x1e);
    header.push(0x01);
    header.extend_from_slice(b"vorbis");
    header.extend_from_slice(&0u32.to_le_bytes());
    header.push(channels);
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&0i32.to_le_bytes());
    header.extend_from_slice(&0i32.to_le_bytes());
    header.extend_from_slice(&0i32.to_le_bytes());
    header.push((exp_long << 4) | exp_short);
    header.push(0x01);
    Some(header)
}

/// Minimal Vorbis comment header: vendor string and no comments.
pub fn make_header_comment() -> Vec<u8> {
    let mut header = Vec::with_capacity(0x19);
    header.push(0x03);
    header.extend_from_slice(b"vorbis");
    header.extend_from_slice(&(VENDOR_STRING.len() as u32).to_le_bytes());
    header.extend_from_slice(VENDOR_STRING);
    header.extend_from_slice(&0u32.to_le_bytes());
    header.push(0x01);
    header
}

/// Companion file holding the setup packet for `setup_id`.
pub fn setup_file_name(sf: &StreamHandle, setup_id: u32) -> String {
    format!("{}.vorbis_{:08x}", directory_prefix(&sf.name()), setup_id)
}

/// Load (or fetch from the shared cache) the setup packet for `setup_id`.
pub fn load_setup_header(sf: &StreamHandle, setup_id: u32) -> DecodeResult<Arc<[u8]>> {
    let name = setup_file_name(sf, setup_id);

    if let Some(cache) = SETUP_CACHE.lock().as_mut() {
        if let Some(setup) = cache.get(&name) {
            return Ok(Arc::clone(setup));
        }
    }

    let setup_sf = sf
        .open(&name, FSB_VORBIS_DEFAULT_BUFFER_SIZE)
        .ok_or_else(|| DecodeError::MissingFile(name.clone()))?;
    let size = setup_sf.size() as usize;
    if size == 0 || size > FSB_VORBIS_DEFAULT_BUFFER_SIZE {
        return Err(DecodeError::InvalidData(format!(
            "{}: setup header size 0x{:x}",
            name, size
        )));
    }
    let mut data = vec![0u8; size];
    if setup_sf.read(&mut data, 0) != size {
        return Err(DecodeError::InvalidData(format!("{}: short read", name)));
    }
    setup_sf.close();

    let crc = crc32fast::hash(&data);
    if crc != setup_id {
        log::warn!(
            "{}: setup header crc 0x{:08x} does not match id 0x{:08x}",
            name,
            crc,
            setup_id
        );
    }

    let setup: Arc<[u8]> = Arc::from(data);
    let mut guard = SETUP_CACHE.lock();
    let cache = guard.get_or_insert_with(|| {
        LruCache::new(NonZeroUsize::new(SETUP_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN))
    });
    cache.put(name, Arc::clone(&setup));
    Ok(setup)
}

/// Packet loop and sample bookkeeping around a synthesis engine.
pub struct FsbVorbisCodec<E: SynthesisEngine> {
    engine: E,
    buffer: Vec<u8>,
    pcm: Vec<Vec<f32>>,
    pcm_consumed: usize,
    samples_full: bool,
    samples_to_discard: usize,
}

impl<E: SynthesisEngine> FsbVorbisCodec<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            buffer: vec![0u8; FSB_VORBIS_DEFAULT_BUFFER_SIZE],
            pcm: Vec::new(),
            pcm_consumed: 0,
            samples_full: false,
            samples_to_discard: 0,
        }
    }

    fn pending(&self) -> usize {
        let decoded = self.pcm.first().map_or(0, Vec::len);
        decoded.saturating_sub(self.pcm_consumed)
    }

    /// Samples still to drop before output resumes.
    pub fn samples_to_discard(&self) -> usize {
        self.samples_to_discard
    }

    fn convert(&self, out: &mut SampleBuffer<'_>, first_frame: usize, count: usize) {
        let channels = out.channels().min(self.pcm.len());
        for n in 0..count {
            let frame = out.frame_mut(first_frame + n);
            for (c, slot) in frame.iter_mut().enumerate() {
                *slot = if c < channels {
                    float_to_i16(self.pcm[c][self.pcm_consumed + n])
                } else {
                    0
                };
            }
        }
    }

    /// Read the next length-prefixed packet into the staging buffer.
    ///
    /// `None` means end padding or a truncated packet.
    fn read_packet(&mut self, stream: &mut ChannelState) -> Option<usize> {
        let bytes = stream.streamfile.read_u16le(stream.offset) as usize;
        stream.offset += 2;
        if bytes == 0 || bytes == 0xFFFF {
            return None;
        }
        if bytes > self.buffer.len() {
            self.buffer.resize(bytes, 0);
        }
        if stream.streamfile.read(&mut self.buffer[..bytes], stream.offset) != bytes {
            log::debug!("FSB Vorbis: truncated packet at 0x{:x}", stream.offset);
            return None;
        }
        stream.offset += bytes as u64;
        Some(bytes)
    }
}

impl<E: SynthesisEngine> CodecData for FsbVorbisCodec<E> {
    fn name(&self) -> &'static str {
        "FSB Vorbis"
    }

    fn decode(&mut self, channels: &mut [ChannelState], out: &mut SampleBuffer<'_>, samples_to_do: usize) {
        let Some(stream) = channels.first_mut() else {
            out.silence(0, samples_to_do);
            return;
        };
        let stream_size = stream.streamfile.size();
        let mut samples_done = 0;

        while samples_done < samples_to_do {
            if stream.offset > stream_size {
                break;
            }

            if self.samples_full {
                let available = self.pending();
                if available == 0 {
                    self.samples_full = false;
                    continue;
                }

                if self.samples_to_discard > 0 {
                    let take = available.min(self.samples_to_discard);
                    self.samples_to_discard -= take;
                    self.pcm_consumed += take;
                } else {
                    let take = available.min(samples_to_do - samples_done);
                    self.convert(out, samples_done, take);
                    self.pcm_consumed += take;
                    samples_done += take;
                }
            } else {
                let Some(bytes) = self.read_packet(stream) else {
                    break;
                };
                match self.engine.synthesize(&self.buffer[..bytes]) {
                    Ok(pcm) => {
                        self.pcm = pcm;
                        self.pcm_consumed = 0;
                        self.samples_full = true;
                    }
                    Err(EngineError::NotAudio) => continue,
                    Err(e) => {
                        log::debug!("FSB Vorbis: {} at 0x{:x}", e, stream.offset);
                        break;
                    }
                }
            }
        }

        out.silence(samples_done, samples_to_do - samples_done);
    }

    fn seek(&mut self, channels: &mut [ChannelState], sample: usize) {
        self.engine.restart();
        self.pcm.clear();
        self.pcm_consumed = 0;
        self.samples_full = false;
        self.samples_to_discard = sample;
        if let Some(stream) = channels.first_mut() {
            stream.offset = stream.channel_start_offset;
        }
    }
}

#[cfg(feature = "vorbis")]
pub use self::lewton_engine::LewtonEngine;

#[cfg(feature = "vorbis")]
mod lewton_engine {
    use lewton::audio::{read_audio_packet_generic, AudioReadError, PreviousWindowRight};
    use lewton::header::{read_header_comment, read_header_ident, read_header_setup, IdentHeader, SetupHeader};

    use super::{EngineError, SynthesisEngine};
    use crate::sound::decoder::{DecodeError, DecodeResult};

    /// Synthesis engine backed by `lewton`.
    pub struct LewtonEngine {
        ident: IdentHeader,
        setup: SetupHeader,
        pwr: PreviousWindowRight,
    }

    impl LewtonEngine {
        pub fn from_headers(ident: &[u8], comment: &[u8], setup: &[u8]) -> DecodeResult<Self> {
            let ident = read_header_ident(ident)
                .map_err(|e| DecodeError::DecoderError(format!("identification header: {:?}", e)))?;
            read_header_comment(comment)
                .map_err(|e| DecodeError::DecoderError(format!("comment header: {:?}", e)))?;
            let setup = read_header_setup(
                setup,
                ident.audio_channels,
                (ident.blocksize_0, ident.blocksize_1),
            )
            .map_err(|e| DecodeError::DecoderError(format!("setup header: {:?}", e)))?;
            Ok(Self {
                ident,
                setup,
                pwr: PreviousWindowRight::new(),
            })
        }
    }

    impl SynthesisEngine for LewtonEngine {
        fn synthesize(&mut self, packet: &[u8]) -> Result<Vec<Vec<f32>>, EngineError> {
            match read_audio_packet_generic::<Vec<Vec<f32>>>(&self.ident, &self.setup, packet, &mut self.pwr) {
                Ok(pcm) => Ok(pcm),
                Err(AudioReadError::AudioIsHeader) => Err(EngineError::NotAudio),
                Err(e) => Err(EngineError::Corrupt(format!("{:?}", e))),
            }
        }

        fn restart(&mut self) {
            self.pwr = PreviousWindowRight::new();
        }
    }
}

/// Build the codec for a raw FSB Vorbis stream.
#[cfg(feature = "vorbis")]
pub fn init_fsb_vorbis(
    sf: &StreamHandle,
    channels: usize,
    sample_rate: u32,
    setup_id: u32,
) -> DecodeResult<FsbVorbisCodec<LewtonEngine>> {
    let ident = make_header_identification(
        channels,
        sample_rate,
        FSB_VORBIS_BLOCKSIZE_SHORT,
        FSB_VORBIS_BLOCKSIZE_LONG,
    )
    .ok_or_else(|| DecodeError::InvalidData(format!("{} channels", channels)))?;
    let comment = make_header_comment();
    let setup = load_setup_header(sf, setup_id)?;
    let engine = LewtonEngine::from_headers(&ident, &comment, &setup)?;
    Ok(FsbVorbisCodec::new(engine))
}
