use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use vgmdecode::cli::{Cli, PrintMode};
use vgmdecode::config::{self, Options};
use vgmdecode::logging;
use vgmdecode::sound::wav::{make_wav_header, write_samples_le};
use vgmdecode::sound::{init_vgmstream_buffer, VgmStream};

/// Frames rendered per call.
const BUFSIZE: usize = 0x8000;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = config::load_config(&cli.configdir)?;
    let options = cli.merge_into_options(options)?;
    logging::log_init(options.log_level, options.log_file.as_deref())?;
    cli.check_modes(&options, io::stdout().is_terminal())?;

    if !Path::new(&cli.input).is_file() {
        anyhow::bail!("file {} not found", cli.input);
    }
    let mut stream = init_vgmstream_buffer(&cli.input, options.stream_index, options.buffer_size)
        .with_context(|| format!("failed opening {}", cli.input))?;

    if let Some(pair) = options.stereo_pair {
        if pair * 2 + 1 >= stream.channels() {
            anyhow::bail!("no stereo pair {} in a {} channel stream", pair, stream.channels());
        }
    }

    let mut lwav_loop = apply_loop_options(&mut stream, &options);

    let output_path = cli.output_path();
    let out: Option<Box<dyn Write>> = if cli.to_stdout() {
        Some(Box::new(io::stdout().lock()))
    } else if let Some(ref path) = output_path {
        let file = File::create(path).with_context(|| format!("failed to open {} for output", path))?;
        Some(Box::new(BufWriter::new(file)))
    } else {
        None
    };

    if cli.forever && !stream.header.loop_flag {
        anyhow::bail!("I could play a nonlooped track forever, but it wouldn't end well.");
    }

    if !cli.to_stdout() {
        print_info(&cli, &stream, output_path.as_deref());
    }

    if cli.metadata_only {
        return Ok(());
    }
    let Some(mut writer) = out else {
        return Ok(());
    };

    let len_samples = stream.configure_playback(options.playback_config());
    if !cli.to_stdout() && cli.print_mode() == PrintMode::Describe {
        println!(
            "samples to play: {} ({:.4} seconds)",
            len_samples,
            len_samples as f64 / stream.sample_rate() as f64
        );
    }

    if cli.forever {
        write_header(&mut writer, &stream, &options, len_samples, lwav_loop)?;
        return play_forever(&mut writer, &mut stream, options.stereo_pair);
    }

    decode_to(&mut writer, &mut stream, &options, len_samples, lwav_loop)?;
    writer.flush()?;
    drop(writer);

    if let Some(ref reset_path) = cli.reset_output {
        let file = File::create(reset_path).with_context(|| format!("failed to open {} for output", reset_path))?;
        let mut writer = BufWriter::new(file);

        stream.reset();
        // reset undoes the loop overrides
        lwav_loop = apply_loop_options(&mut stream, &options);
        decode_to(&mut writer, &mut stream, &options, len_samples, lwav_loop)?;
        writer.flush()?;
    }

    Ok(())
}

/// Apply `-e`/`-E`/`-i`/`-L`; returns the loop to store in a `smpl` chunk.
fn apply_loop_options(stream: &mut VgmStream, options: &Options) -> Option<(usize, usize)> {
    let num_samples = stream.header.num_samples;
    if options.force_loop && !stream.header.loop_flag {
        stream.force_loop(true, 0, num_samples);
    }
    if options.really_force_loop {
        stream.force_loop(true, 0, num_samples);
    }
    if options.ignore_loop {
        stream.force_loop(false, 0, 0);
    }
    if options.write_lwav && stream.header.loop_flag {
        let points = (stream.header.loop_start_sample, stream.header.loop_end_sample);
        stream.force_loop(false, 0, 0);
        return Some(points);
    }
    None
}

fn print_info(cli: &Cli, stream: &VgmStream, output_path: Option<&str>) {
    let h = &stream.header;
    match cli.print_mode() {
        PrintMode::Adxencd => {
            let mut line = String::from("adxencd");
            if let Some(path) = output_path {
                line.push_str(&format!(" \"{}\"", path));
            }
            if h.loop_flag {
                line.push_str(&format!(" -lps{} -lpe{}", h.loop_start_sample, h.loop_end_sample));
            }
            println!("{}", line);
        }
        PrintMode::Oggenc => {
            let mut line = String::from("oggenc");
            if let Some(path) = output_path {
                line.push_str(&format!(" \"{}\"", path));
            }
            if h.loop_flag {
                line.push_str(&format!(
                    " -c LOOPSTART={} -c LOOPLENGTH={}",
                    h.loop_start_sample,
                    h.loop_end_sample - h.loop_start_sample
                ));
            }
            println!("{}", line);
        }
        PrintMode::BatchVars => {
            if let Some(path) = output_path {
                println!("set fname=\"{}\"", path);
            }
            println!("set tsamp={}\nset chan={}", h.num_samples, h.channels);
            if h.loop_flag {
                println!("set lstart={}\nset lend={}\nset loop=1", h.loop_start_sample, h.loop_end_sample);
            } else {
                println!("set loop=0");
            }
        }
        PrintMode::Describe => {
            if cli.metadata_only {
                println!("metadata for {}", cli.input);
            } else {
                println!("decoding {}", cli.input);
            }
            println!("{}", stream.describe());
        }
    }
}

fn write_header(
    writer: &mut dyn Write,
    stream: &VgmStream,
    options: &Options,
    len_samples: usize,
    lwav_loop: Option<(usize, usize)>,
) -> Result<()> {
    let channels = if options.stereo_pair.is_some() { 2 } else { stream.channels() };
    let header = make_wav_header(len_samples, stream.sample_rate(), channels, lwav_loop);
    writer.write_all(&header)?;
    Ok(())
}

/// Interleaved frames, or just the selected stereo pair of them.
fn write_frames(writer: &mut dyn Write, buf: &[i16], channels: usize, stereo_pair: Option<usize>) -> Result<()> {
    match stereo_pair {
        None => write_samples_le(writer, buf)?,
        Some(pair) => {
            let picked: Vec<i16> = buf
                .chunks_exact(channels)
                .flat_map(|frame| [frame[pair * 2], frame[pair * 2 + 1]])
                .collect();
            write_samples_le(writer, &picked)?;
        }
    }
    Ok(())
}

fn decode_to(
    writer: &mut dyn Write,
    stream: &mut VgmStream,
    options: &Options,
    len_samples: usize,
    lwav_loop: Option<(usize, usize)>,
) -> Result<()> {
    write_header(writer, stream, options, len_samples, lwav_loop)?;

    let channels = stream.channels();
    let mut buf = vec![0i16; BUFSIZE * channels];
    loop {
        let frames = stream.play(&mut buf, BUFSIZE);
        if frames == 0 {
            break;
        }
        write_frames(writer, &buf[..frames * channels], channels, options.stereo_pair)?;
    }
    Ok(())
}

fn play_forever(writer: &mut dyn Write, stream: &mut VgmStream, stereo_pair: Option<usize>) -> Result<()> {
    let channels = stream.channels();
    let mut buf = vec![0i16; BUFSIZE * channels];
    loop {
        stream.render(&mut buf, BUFSIZE);
        if let Err(e) = write_frames(writer, &buf, channels, stereo_pair) {
            // reader went away
            log::debug!("stopping: {}", e);
            return Ok(());
        }
    }
}
