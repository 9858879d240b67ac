use crate::config::{parse_buffer_size, parse_loop_count, parse_seconds};
use crate::config::Options;
use anyhow::{Context, Result};
use clap::Parser;

/// Decode streamed game audio to WAV
#[derive(Parser, Debug, Default)]
#[command(name = "vgmdecode")]
#[command(version)]
#[command(about = "Decode streamed game audio formats to WAV", long_about = None)]
pub struct Cli {
    /// Input file
    #[arg(value_name = "INFILE")]
    pub input: String,

    /// Name of the output .wav file, default is INFILE.wav
    #[arg(short = 'o', value_name = "OUTFILE")]
    pub output: Option<String>,

    /// Loop count, default 2.0
    #[arg(short = 'l', value_name = "COUNT")]
    pub loops: Option<String>,

    /// Fade time in seconds after the loops, default 10.0
    #[arg(short = 'f', value_name = "SECONDS")]
    pub fade: Option<String>,

    /// Fade delay in seconds, default 0.0
    #[arg(short = 'd', value_name = "SECONDS")]
    pub delay: Option<String>,

    /// Ignore looping information and play the whole stream once
    #[arg(short = 'i')]
    pub ignore_loop: bool,

    /// Output to stdout (for piping into another program)
    #[arg(short = 'p')]
    pub stdout: bool,

    /// Output to stdout even if stdout is a terminal
    #[arg(short = 'P')]
    pub stdout_anyway: bool,

    /// Loop forever (continuously)
    #[arg(short = 'c')]
    pub forever: bool,

    /// Print metadata only, don't decode
    #[arg(short = 'm')]
    pub metadata_only: bool,

    /// Decode and print an adxencd command line to encode as ADX
    #[arg(short = 'x')]
    pub print_adxencd: bool,

    /// Decode and print an oggenc command line to encode as OGG
    #[arg(short = 'g')]
    pub print_oggenc: bool,

    /// Decode and print batch variable commands
    #[arg(short = 'b')]
    pub print_batchvar: bool,

    /// Append a smpl chunk and create a looping wav
    #[arg(short = 'L')]
    pub looping_wav: bool,

    /// Force end-to-end looping
    #[arg(short = 'e')]
    pub force_loop: bool,

    /// Force end-to-end looping even if the file has real loop points
    #[arg(short = 'E')]
    pub really_force_loop: bool,

    /// Output a second time after resetting
    #[arg(short = 'r', value_name = "OUTFILE2")]
    pub reset_output: Option<String>,

    /// Only output the Nth (first is 0) set of stereo channels
    #[arg(short = '2', value_name = "N")]
    pub stereo_pair: Option<String>,

    /// Don't fade after the loops and play the rest of the stream
    #[arg(short = 'F')]
    pub ignore_fade: bool,

    /// Select subsong N, if the format supports multiple streams
    #[arg(short = 's', value_name = "N")]
    pub subsong: Option<String>,

    /// Configuration directory holding vgmdecode.cfg
    #[arg(long, value_name = "CONFIGDIR")]
    pub configdir: Option<String>,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    pub logfile: Option<String>,

    /// Read buffer size per open file, in bytes
    #[arg(long = "buffer-size", value_name = "BYTES")]
    pub buffer_size: Option<String>,

    /// More log output (repeat for more)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What the binary prints next to (or instead of) decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    Describe,
    Adxencd,
    Oggenc,
    BatchVars,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref loops) = self.loops {
            opts.loop_count = parse_loop_count(loops)?;
        }
        if let Some(ref fade) = self.fade {
            opts.fade_seconds = parse_seconds(fade).context("Invalid fade time")?;
        }
        if let Some(ref delay) = self.delay {
            opts.fade_delay_seconds = parse_seconds(delay).context("Invalid fade delay")?;
        }

        if self.ignore_loop {
            opts.ignore_loop = true;
        }
        if self.force_loop {
            opts.force_loop = true;
        }
        if self.really_force_loop {
            opts.really_force_loop = true;
        }
        if self.looping_wav {
            opts.write_lwav = true;
        }
        if self.ignore_fade {
            opts.ignore_fade = true;
        }

        if let Some(ref pair) = self.stereo_pair {
            opts.stereo_pair = Some(pair.parse().context("Invalid stereo channel pair")?);
        }
        if let Some(ref subsong) = self.subsong {
            let index: usize = subsong.parse().context("Invalid subsong")?;
            opts.stream_index = index.max(1);
        }
        if let Some(ref size) = self.buffer_size {
            opts.buffer_size = parse_buffer_size(size)?;
        }

        if let Some(ref config_dir) = self.configdir {
            opts.config_dir = Some(config_dir.clone());
        }
        if let Some(ref log_file) = self.logfile {
            opts.log_file = Some(log_file.clone());
        }
        opts.log_level = opts.log_level.raised(self.verbose);

        Ok(opts)
    }

    pub fn to_stdout(&self) -> bool {
        self.stdout || self.stdout_anyway
    }

    /// Reject flag combinations that make no sense.
    pub fn check_modes(&self, opts: &Options, stdout_is_terminal: bool) -> Result<()> {
        if self.forever && !self.to_stdout() {
            anyhow::bail!("A file of infinite size? Not likely.");
        }
        if self.to_stdout() && !self.stdout_anyway && stdout_is_terminal {
            anyhow::bail!(
                "Are you sure you want to output wave data to the terminal?\nIf so use -P instead of -p."
            );
        }
        if opts.ignore_loop && opts.force_loop {
            anyhow::bail!("-e and -i are incompatible");
        }
        if opts.ignore_loop && opts.really_force_loop {
            anyhow::bail!("-E and -i are incompatible");
        }
        if opts.force_loop && opts.really_force_loop {
            anyhow::bail!("-E and -e are incompatible");
        }
        if self.to_stdout() && self.output.is_some() {
            anyhow::bail!("either -p or -o, make up your mind");
        }
        Ok(())
    }

    /// Output file name, `None` when writing to stdout or only printing metadata.
    pub fn output_path(&self) -> Option<String> {
        if self.to_stdout() || self.metadata_only {
            return None;
        }
        Some(self.output.clone().unwrap_or_else(|| format!("{}.wav", self.input)))
    }

    pub fn print_mode(&self) -> PrintMode {
        if self.print_adxencd {
            PrintMode::Adxencd
        } else if self.print_oggenc {
            PrintMode::Oggenc
        } else if self.print_batchvar {
            PrintMode::BatchVars
        } else {
            PrintMode::Describe
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(input: &str) -> Cli {
        Cli {
            input: input.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from(["vgmdecode", "-l", "3", "-f", "5", "-F", "-s", "2", "-o", "out.wav", "in.ast"]);
        assert_eq!(cli.input, "in.ast");
        assert_eq!(cli.output.as_deref(), Some("out.wav"));
        assert!(cli.ignore_fade);
        let opts = cli.merge_into_options(Options::default()).unwrap();
        assert_eq!(opts.loop_count, 3.0);
        assert_eq!(opts.fade_seconds, 5.0);
        assert_eq!(opts.stream_index, 2);
        assert!(opts.ignore_fade);
    }

    #[test]
    fn test_merge_keeps_config_values() {
        let base = Options {
            loop_count: 4.0,
            ..Default::default()
        };
        let opts = cli("a.wav").merge_into_options(base).unwrap();
        assert_eq!(opts.loop_count, 4.0);
        assert_eq!(opts.fade_seconds, 10.0);
    }

    #[test]
    fn test_invalid_values() {
        let bad_loops = Cli {
            loops: Some("many".to_string()),
            ..cli("a.wav")
        };
        assert!(bad_loops.merge_into_options(Options::default()).is_err());

        let bad_pair = Cli {
            stereo_pair: Some("-1".to_string()),
            ..cli("a.wav")
        };
        assert!(bad_pair.merge_into_options(Options::default()).is_err());
    }

    #[test]
    fn test_verbose_raises_level() {
        let verbose = Cli { verbose: 2, ..cli("a.wav") };
        let opts = verbose.merge_into_options(Options::default()).unwrap();
        assert_eq!(opts.log_level, crate::logging::LogLevel::Debug);
    }

    #[test]
    fn test_incompatible_modes() {
        let check = |c: Cli| {
            let opts = c.merge_into_options(Options::default()).unwrap();
            c.check_modes(&opts, false).map_err(|e| e.to_string())
        };

        assert_eq!(check(Cli { forever: true, ..cli("a") }).unwrap_err(), "A file of infinite size? Not likely.");
        assert_eq!(
            check(Cli { ignore_loop: true, force_loop: true, ..cli("a") }).unwrap_err(),
            "-e and -i are incompatible"
        );
        assert_eq!(
            check(Cli { ignore_loop: true, really_force_loop: true, ..cli("a") }).unwrap_err(),
            "-E and -i are incompatible"
        );
        assert_eq!(
            check(Cli { force_loop: true, really_force_loop: true, ..cli("a") }).unwrap_err(),
            "-E and -e are incompatible"
        );
        assert_eq!(
            check(Cli { stdout: true, output: Some("x.wav".into()), ..cli("a") }).unwrap_err(),
            "either -p or -o, make up your mind"
        );
        assert!(check(Cli { stdout: true, forever: true, ..cli("a") }).is_ok());
    }

    #[test]
    fn test_terminal_needs_capital_p() {
        let opts = Options::default();
        let piped = Cli { stdout: true, ..cli("a") };
        assert!(piped.check_modes(&opts, true).is_err());
        assert!(piped.check_modes(&opts, false).is_ok());
        let anyway = Cli { stdout_anyway: true, ..cli("a") };
        assert!(anyway.check_modes(&opts, true).is_ok());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(cli("song.ast").output_path().as_deref(), Some("song.ast.wav"));
        assert_eq!(Cli { stdout: true, ..cli("song.ast") }.output_path(), None);
        assert_eq!(Cli { metadata_only: true, ..cli("song.ast") }.output_path(), None);
    }

    #[test]
    fn test_print_mode() {
        assert_eq!(cli("a").print_mode(), PrintMode::Describe);
        assert_eq!(Cli { print_oggenc: true, ..cli("a") }.print_mode(), PrintMode::Oggenc);
        assert_eq!(Cli { print_batchvar: true, ..cli("a") }.print_mode(), PrintMode::BatchVars);
    }
}
