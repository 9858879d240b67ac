//! Nintendo AST (`STRM` header, `BLCK` blocks)
//!
//! ```text
//! 0x00  "STRM"
//! 0x04  size of the block data (u32 BE), file size minus 0x40
//! 0x08  codec (u16): 0 = AFC, 1 = PCM16 BE
//! 0x0a  bits per sample (u16), 16
//! 0x0c  channels (u16)
//! 0x0e  loop flag (u16)
//! 0x10  sample rate
//! 0x14  total samples
//! 0x18  loop start
//! 0x1c  loop end
//! 0x40  first BLCK
//! ```

use crate::io::StreamHandle;
use crate::sound::decoder::{DecodeError, DecodeResult};
use crate::sound::formats::Coding;
use crate::sound::layout::{Layout, AST_BLOCKS};
use crate::sound::stream::{StreamHeader, VgmStream};

use super::{open_channels, unsupported};

const STRM_ID: u32 = 0x5354524D; // "STRM"
const AST_HEADER_SIZE: u64 = 0x40;
const AST_CODEC_AFC: u16 = 0;
const AST_CODEC_PCM16: u16 = 1;

pub fn init_ast(sf: &StreamHandle, _stream_index: usize) -> DecodeResult<VgmStream> {
    if sf.read_u32be(0x00) != STRM_ID {
        return Err(unsupported("not AST"));
    }
    if sf.read_u32be(0x04) as u64 + AST_HEADER_SIZE != sf.size() {
        return Err(unsupported("AST size mismatch"));
    }

    match sf.read_u16be(0x08) {
        AST_CODEC_PCM16 => {}
        AST_CODEC_AFC => return Err(DecodeError::InvalidData("AFC coded AST is not supported".into())),
        codec => return Err(DecodeError::InvalidData(format!("AST codec {}", codec))),
    }
    if sf.read_u16be(0x0a) != 16 {
        return Err(DecodeError::InvalidData(format!("AST with {} bits", sf.read_u16be(0x0a))));
    }

    let channels = sf.read_u16be(0x0c) as usize;
    let loop_flag = sf.read_u16be(0x0e) != 0;
    let sample_rate = sf.read_u32be(0x10);
    let num_samples = sf.read_u32be(0x14) as usize;
    let loop_start = sf.read_u32be(0x18) as usize;
    let loop_end = sf.read_u32be(0x1c) as usize;

    let mut header = StreamHeader::new(channels, sample_rate, num_samples, Coding::Pcm16Be, Layout::Blocked(&AST_BLOCKS))
        .with_loop(loop_flag, loop_start, loop_end);
    header.start_offset = AST_HEADER_SIZE;
    header.meta = "Nintendo AST header";

    let ch = open_channels(sf, channels, |_| AST_HEADER_SIZE)?;
    Ok(VgmStream::new(header, ch, None))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::io::MemoryFiles;

    /// An AST file with one block per entry of `blocks`, each holding the
    /// same number of samples for every channel.
    pub(crate) fn ast_file(channels: u16, rate: u32, loops: Option<(u32, u32)>, blocks: &[Vec<Vec<i16>>]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut total = 0u32;
        for block in blocks {
            let per_channel = block[0].len();
            total += per_channel as u32;
            body.extend_from_slice(b"BLCK");
            body.extend_from_slice(&((per_channel * 2) as u32).to_be_bytes());
            body.resize(body.len() + 0x18, 0);
            for channel in block {
                for v in channel {
                    body.extend_from_slice(&v.to_be_bytes());
                }
            }
        }

        let mut file = Vec::new();
        file.extend_from_slice(b"STRM");
        file.extend_from_slice(&(body.len() as u32).to_be_bytes());
        file.extend_from_slice(&AST_CODEC_PCM16.to_be_bytes());
        file.extend_from_slice(&16u16.to_be_bytes());
        file.extend_from_slice(&channels.to_be_bytes());
        file.extend_from_slice(&(loops.is_some() as u16).to_be_bytes());
        file.extend_from_slice(&rate.to_be_bytes());
        file.extend_from_slice(&total.to_be_bytes());
        let (start, end) = loops.unwrap_or((0, 0));
        file.extend_from_slice(&start.to_be_bytes());
        file.extend_from_slice(&end.to_be_bytes());
        file.resize(AST_HEADER_SIZE as usize, 0);
        file.extend_from_slice(&body);
        file
    }

    fn open(bytes: Vec<u8>) -> StreamHandle {
        MemoryFiles::new().with_file("t.ast", bytes).open("t.ast", 256).unwrap()
    }

    #[test]
    fn test_stereo_blocks() {
        let blocks = vec![vec![vec![1, 2], vec![-1, -2]], vec![vec![3], vec![-3]]];
        let mut stream = init_ast(&open(ast_file(2, 32000, None, &blocks)), 1).unwrap();
        assert_eq!(stream.header.num_samples, 3);
        let mut buf = vec![0i16; 6];
        assert_eq!(stream.render(&mut buf, 3), 3);
        assert_eq!(buf, vec![1, -1, 2, -2, 3, -3]);
    }

    #[test]
    fn test_loop_across_blocks() {
        let blocks = vec![vec![vec![1, 2]], vec![vec![3, 4]]];
        let mut stream = init_ast(&open(ast_file(1, 32000, Some((1, 4)), &blocks)), 1).unwrap();
        assert!(stream.header.loop_flag);
        let mut buf = vec![0i16; 7];
        stream.render(&mut buf, 7);
        assert_eq!(buf, vec![1, 2, 3, 4, 2, 3, 4]);
    }

    #[test]
    fn test_size_mismatch_is_not_ast() {
        let mut file = ast_file(1, 32000, None, &[vec![vec![1, 2]]]);
        file.push(0);
        assert!(matches!(init_ast(&open(file), 1), Err(DecodeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_afc_is_rejected() {
        let mut file = ast_file(1, 32000, None, &[vec![vec![1, 2]]]);
        file[0x09] = 0;
        assert!(matches!(init_ast(&open(file), 1), Err(DecodeError::InvalidData(_))));
    }
}
