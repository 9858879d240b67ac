//! End-to-end decoding tests
//!
//! Files are written to a temporary directory and opened by path, the way
//! the command-line tool opens them.

use std::fs;
use std::path::{Path, PathBuf};

use vgmdecode::sound::wav::make_wav_file;
use vgmdecode::sound::{init_vgmstream, PlaybackConfig, PlaybackPhase, VgmStream};

fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn open(path: &Path) -> VgmStream {
    init_vgmstream(path.to_str().unwrap(), 1).expect("stream should open")
}

/// Deterministic test signal.
fn ramp(frames: usize, channels: usize) -> Vec<i16> {
    (0..frames * channels)
        .map(|i| ((i * 37) % 20000) as i16 - 10000)
        .collect()
}

fn play_all(stream: &mut VgmStream) -> Vec<i16> {
    let channels = stream.channels();
    let mut out = Vec::new();
    let mut buf = vec![0i16; 1000 * channels];
    loop {
        let frames = stream.play(&mut buf, 1000);
        if frames == 0 {
            break;
        }
        out.extend_from_slice(&buf[..frames * channels]);
    }
    out
}

fn ast_file(rate: u32, loops: (u32, u32), blocks: &[Vec<i16>]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut total = 0u32;
    for block in blocks {
        total += block.len() as u32;
        body.extend_from_slice(b"BLCK");
        body.extend_from_slice(&((block.len() * 2) as u32).to_be_bytes());
        body.resize(body.len() + 0x18, 0);
        for v in block {
            body.extend_from_slice(&v.to_be_bytes());
        }
    }
    let mut file = Vec::new();
    file.extend_from_slice(b"STRM");
    file.extend_from_slice(&(body.len() as u32).to_be_bytes());
    file.extend_from_slice(&1u16.to_be_bytes());
    file.extend_from_slice(&16u16.to_be_bytes());
    file.extend_from_slice(&1u16.to_be_bytes());
    file.extend_from_slice(&1u16.to_be_bytes());
    file.extend_from_slice(&rate.to_be_bytes());
    file.extend_from_slice(&total.to_be_bytes());
    file.extend_from_slice(&loops.0.to_be_bytes());
    file.extend_from_slice(&loops.1.to_be_bytes());
    file.resize(0x40, 0);
    file.extend_from_slice(&body);
    file
}

#[test]
fn test_plain_wav_plays_once_without_fade() {
    let dir = tempfile::tempdir().unwrap();
    let samples = ramp(44100, 1);
    let path = write_file(dir.path(), "tone.wav", &make_wav_file(&samples, 1, 44100, None));

    let mut stream = open(&path);
    assert_eq!(stream.configure_playback(PlaybackConfig::default()), 44100);
    assert_eq!(stream.phase(), PlaybackPhase::Fresh);
    let out = play_all(&mut stream);
    assert_eq!(out, samples);
    assert_eq!(stream.phase(), PlaybackPhase::Exhausted);
}

#[test]
fn test_loop_passes_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let samples = ramp(3000, 2);
    let path = write_file(dir.path(), "loop.wav", &make_wav_file(&samples, 2, 8000, Some((500, 2500))));

    let mut stream = open(&path);
    assert!(stream.header.loop_flag);
    let frames = 500 + 2000 * 3;
    let mut out = vec![0i16; frames * 2];
    stream.render(&mut out, frames);

    let pass = |n: usize| &out[(500 + 2000 * n) * 2..(500 + 2000 * (n + 1)) * 2];
    assert_eq!(pass(0), &samples[500 * 2..2500 * 2]);
    assert_eq!(pass(0), pass(1));
    assert_eq!(pass(1), pass(2));
}

#[test]
fn test_fade_out_reaches_silence() {
    let dir = tempfile::tempdir().unwrap();
    let samples = vec![8000i16; 1000];
    let path = write_file(dir.path(), "fade.wav", &make_wav_file(&samples, 1, 1000, Some((0, 1000))));

    let mut stream = open(&path);
    let config = PlaybackConfig {
        loop_count: 1.0,
        fade_seconds: 1.0,
        fade_delay_seconds: 0.0,
        ignore_fade: false,
    };
    assert_eq!(stream.configure_playback(config), 2000);
    let out = play_all(&mut stream);
    assert_eq!(out.len(), 2000);
    assert!(out[..1001].iter().all(|&s| s == 8000));
    assert!(out[1001..].windows(2).all(|w| w[0] >= w[1]));
    assert!(out[1999].abs() <= 8);
}

#[test]
fn test_reset_and_seek_reproduce_output() {
    let dir = tempfile::tempdir().unwrap();
    let samples = ramp(4000, 1);
    let path = write_file(dir.path(), "r.wav", &make_wav_file(&samples, 1, 8000, Some((1000, 3000))));

    let mut stream = open(&path);
    let mut first = vec![0i16; 9000];
    stream.render(&mut first, 9000);

    stream.reset();
    let mut second = vec![0i16; 9000];
    stream.render(&mut second, 9000);
    assert_eq!(first, second);

    stream.seek(6500);
    let mut tail = vec![0i16; 100];
    stream.render(&mut tail, 100);
    assert_eq!(&tail[..], &first[6500..6600]);
}

#[test]
fn test_ast_file_with_loop() {
    let dir = tempfile::tempdir().unwrap();
    let blocks = vec![vec![1i16, 2, 3], vec![4, 5, 6]];
    let path = write_file(dir.path(), "bgm.ast", &ast_file(32000, (2, 6), &blocks));

    let mut stream = open(&path);
    assert_eq!(stream.header.num_samples, 6);
    let mut out = vec![0i16; 14];
    stream.render(&mut out, 14);
    assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 3, 4, 5, 6, 3, 4, 5, 6]);
    assert!(stream.describe().contains("metadata from: Nintendo AST header"));
}

#[test]
fn test_genh_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = Vec::new();
    file.extend_from_slice(b"GENH");
    for v in [1u32, 0, 22050, u32::MAX, 0, 4, 0x24, 0x24] {
        file.extend_from_slice(&v.to_le_bytes());
    }
    for v in [100i16, -100, 200] {
        file.extend_from_slice(&v.to_le_bytes());
    }
    let path = write_file(dir.path(), "x.genh", &file);

    let mut stream = open(&path);
    assert_eq!(stream.sample_rate(), 22050);
    assert!(!stream.header.loop_flag);
    assert_eq!(play_all(&mut stream), vec![100, -100, 200]);
}

#[test]
fn test_pos_file_overrides_loop() {
    let dir = tempfile::tempdir().unwrap();
    let samples = ramp(100, 1);
    let path = write_file(dir.path(), "p.wav", &make_wav_file(&samples, 1, 8000, None));
    let mut pos = 10u32.to_le_bytes().to_vec();
    pos.extend_from_slice(&20u32.to_le_bytes());
    write_file(dir.path(), "p.wav.pos", &pos);

    let stream = open(&path);
    assert!(stream.header.loop_flag);
    assert_eq!(stream.header.loop_start_sample, 10);
    assert_eq!(stream.header.loop_end_sample, 20);
}

#[test]
fn test_missing_and_unknown_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nothing.wav");
    assert!(init_vgmstream(missing.to_str().unwrap(), 1).is_none());

    let junk = write_file(dir.path(), "junk.bin", &[0x55; 512]);
    assert!(init_vgmstream(junk.to_str().unwrap(), 1).is_none());
}

#[test]
fn test_truncated_wav_pads_with_silence() {
    let dir = tempfile::tempdir().unwrap();
    let samples = ramp(100, 1);
    let mut file = make_wav_file(&samples, 1, 8000, None);
    file.truncate(file.len() - 20);
    let path = write_file(dir.path(), "cut.wav", &file);

    let mut stream = open(&path);
    assert_eq!(stream.header.num_samples, 90);
    let out = play_all(&mut stream);
    assert_eq!(&out[..], &samples[..90]);
}
