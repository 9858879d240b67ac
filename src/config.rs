use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::io::STREAMFILE_DEFAULT_BUFFER_SIZE;
use crate::logging::LogLevel;
use crate::sound::PlaybackConfig;

/// Name of the optional settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "vgmdecode.cfg";

const MIN_BUFFER_SIZE: usize = 0x10;
const MAX_BUFFER_SIZE: usize = 0x100_0000;

/// Decode options that can be set via CLI or config file
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    // Commandline-only options
    pub log_file: Option<String>,
    pub config_dir: Option<String>,
    pub stream_index: usize,
    /// Only write channels `2n` and `2n + 1`.
    pub stereo_pair: Option<usize>,

    // Commandline and user config options
    pub loop_count: f64,
    pub fade_seconds: f64,
    pub fade_delay_seconds: f64,
    pub ignore_fade: bool,
    pub ignore_loop: bool,
    /// Loop the whole stream if it has no loop points.
    pub force_loop: bool,
    /// Loop the whole stream even if it has loop points.
    pub really_force_loop: bool,
    /// Write the loop points into a `smpl` chunk instead of playing them.
    pub write_lwav: bool,
    pub buffer_size: usize,
    pub log_level: LogLevel,
}

impl Default for Options {
    fn default() -> Self {
        let playback = PlaybackConfig::default();
        Self {
            log_file: None,
            config_dir: None,
            stream_index: 1,
            stereo_pair: None,
            loop_count: playback.loop_count,
            fade_seconds: playback.fade_seconds,
            fade_delay_seconds: playback.fade_delay_seconds,
            ignore_fade: playback.ignore_fade,
            ignore_loop: false,
            force_loop: false,
            really_force_loop: false,
            write_lwav: false,
            buffer_size: STREAMFILE_DEFAULT_BUFFER_SIZE,
            log_level: LogLevel::Warning,
        }
    }
}

impl Options {
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            loop_count: self.loop_count,
            fade_seconds: self.fade_seconds,
            fade_delay_seconds: self.fade_delay_seconds,
            ignore_fade: self.ignore_fade,
        }
    }

    /// Apply one `key = value` setting from the config file.
    pub fn set_property(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "loop_count" => self.loop_count = parse_loop_count(value)?,
            "fade_seconds" => self.fade_seconds = parse_seconds(value)?,
            "fade_delay_seconds" => self.fade_delay_seconds = parse_seconds(value)?,
            "ignore_fade" => self.ignore_fade = parse_bool(value)?,
            "ignore_loop" => self.ignore_loop = parse_bool(value)?,
            "force_loop" => self.force_loop = parse_bool(value)?,
            "buffer_size" => self.buffer_size = parse_buffer_size(value)?,
            "log_level" => {
                let level: i32 = value.parse().context("Invalid log level")?;
                self.log_level = LogLevel::from_i32(level);
            }
            "log_file" => self.log_file = Some(value.to_string()),
            _ => log::warn!("Unknown config key '{}'", key),
        }
        Ok(())
    }
}

/// Load configuration from `vgmdecode.cfg` in `config_dir`.
///
/// A missing directory or file gives the defaults.
pub fn load_config(config_dir: &Option<String>) -> Result<Options> {
    let mut opts = Options::default();
    let Some(dir) = config_dir else {
        return Ok(opts);
    };
    opts.config_dir = Some(dir.clone());

    let path = Path::new(dir).join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(opts);
    }
    let data = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    for setting in parse_settings(&data) {
        opts.set_property(setting.key, setting.value).with_context(|| {
            format!(
                "{}:{}: bad value for '{}'",
                path.display(),
                setting.line,
                setting.key
            )
        })?;
    }
    Ok(opts)
}

/// One `key = value` line of a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting<'a> {
    /// 1-based line number, for error messages.
    pub line: usize,
    pub key: &'a str,
    pub value: &'a str,
}

/// Split a settings file into `key = value` pairs.
///
/// `#` starts a comment anywhere on a line. Blank lines are skipped and
/// lines without `=` or with an empty key are ignored with a warning.
pub fn parse_settings(data: &str) -> Vec<Setting<'_>> {
    let mut settings = Vec::new();
    for (index, raw) in data.lines().enumerate() {
        let line = match raw.split_once('#') {
            Some((content, _comment)) => content,
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => settings.push(Setting {
                line: index + 1,
                key: key.trim(),
                value: value.trim(),
            }),
            _ => log::warn!("Ignoring line {} of settings: '{}'", index + 1, line),
        }
    }
    settings
}

/// Parse a non-negative time in seconds
pub fn parse_seconds(s: &str) -> Result<f64> {
    let seconds: f64 = s.trim().parse().context("Invalid time value")?;
    if !seconds.is_finite() || seconds < 0.0 {
        anyhow::bail!("Time must be a non-negative number of seconds");
    }
    Ok(seconds)
}

/// Parse a loop count; fractional counts play part of the last loop
pub fn parse_loop_count(s: &str) -> Result<f64> {
    let count: f64 = s.trim().parse().context("Invalid loop count")?;
    if !count.is_finite() || count < 0.0 {
        anyhow::bail!("Loop count must be a non-negative number");
    }
    Ok(count)
}

/// Parse a read buffer size, decimal or `0x` hex
pub fn parse_buffer_size(s: &str) -> Result<usize> {
    let s = s.trim();
    let size = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).context("Invalid buffer size")?,
        None => s.parse().context("Invalid buffer size")?,
    };
    if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&size) {
        anyhow::bail!(
            "Buffer size out of range ({:#x} to {:#x})",
            MIN_BUFFER_SIZE,
            MAX_BUFFER_SIZE
        );
    }
    Ok(size)
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Expected a boolean, got '{}'", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_basic() {
        let settings = parse_settings("loop_count = 3\n# comment\n\nfade_seconds=5 # trailing\n");
        assert_eq!(
            settings,
            vec![
                Setting { line: 1, key: "loop_count", value: "3" },
                Setting { line: 4, key: "fade_seconds", value: "5" },
            ]
        );
    }

    #[test]
    fn test_parse_settings_skips_malformed_lines() {
        let settings = parse_settings("orphan\n = nokey\nkey=value\r\nempty =\n");
        assert_eq!(settings.len(), 2);
        assert_eq!(settings[0], Setting { line: 3, key: "key", value: "value" });
        assert_eq!(settings[1], Setting { line: 4, key: "empty", value: "" });
    }

    #[test]
    fn test_parse_settings_long_multibyte_key() {
        let key = "é".repeat(200);
        let data = format!("{} = 1", key);
        let settings = parse_settings(&data);
        assert_eq!(settings[0].key, key);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("10").unwrap(), 10.0);
        assert_eq!(parse_seconds(" 0.5 ").unwrap(), 0.5);
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("abc").is_err());
        assert!(parse_seconds("inf").is_err());
    }

    #[test]
    fn test_parse_loop_count() {
        assert_eq!(parse_loop_count("2.5").unwrap(), 2.5);
        assert_eq!(parse_loop_count("0").unwrap(), 0.0);
        assert!(parse_loop_count("-2").is_err());
    }

    #[test]
    fn test_parse_buffer_size() {
        assert_eq!(parse_buffer_size("0x8000").unwrap(), 0x8000);
        assert_eq!(parse_buffer_size("4096").unwrap(), 4096);
        assert!(parse_buffer_size("0").is_err());
        assert!(parse_buffer_size("0x1000000000").is_err());
        assert!(parse_buffer_size("lots").is_err());
    }

    #[test]
    fn test_options_default() {
        let opts = Options::default();
        assert_eq!(opts.loop_count, 2.0);
        assert_eq!(opts.fade_seconds, 10.0);
        assert_eq!(opts.fade_delay_seconds, 0.0);
        assert_eq!(opts.buffer_size, 0x8000);
        assert_eq!(opts.stream_index, 1);
        assert_eq!(opts.playback_config(), PlaybackConfig::default());
    }

    #[test]
    fn test_load_config_without_dir() {
        assert_eq!(load_config(&None).unwrap(), Options::default());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "loop_count = 1.5\nfade_seconds = 3\nignore_fade = yes\nbuffer_size = 0x1000\nbogus = 1\n",
        )
        .unwrap();
        let dir_name = dir.path().to_string_lossy().into_owned();
        let opts = load_config(&Some(dir_name.clone())).unwrap();
        assert_eq!(opts.loop_count, 1.5);
        assert_eq!(opts.fade_seconds, 3.0);
        assert!(opts.ignore_fade);
        assert_eq!(opts.buffer_size, 0x1000);
        assert_eq!(opts.config_dir, Some(dir_name));
    }

    #[test]
    fn test_load_config_bad_value() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "loop_count = 2\nfade_seconds = soon\n").unwrap();
        let dir_name = dir.path().to_string_lossy().into_owned();
        let err = load_config(&Some(dir_name)).unwrap_err();
        assert!(format!("{:#}", err).contains(":2: bad value for 'fade_seconds'"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_name = dir.path().to_string_lossy().into_owned();
        let opts = load_config(&Some(dir_name)).unwrap();
        assert_eq!(opts.loop_count, 2.0);
    }
}
