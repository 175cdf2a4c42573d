use std::fs;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::protocol::MAX_WIRE_INDEX;

fn default_fps() -> f64 {
    30.0
}

/// Startup configuration, either from positional CLI arguments or a JSON
/// config file. Immutable once the player starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Raw RGB24 media file
    pub media: String,
    /// Serial device path
    pub port: String,
    /// Number of white keys in the video
    pub white_keys: usize,
    /// Leading keys excluded from sampling and transmission
    #[serde(default)]
    pub offset: usize,
    /// Frame width in pixels
    pub width: usize,
    /// Frame height in pixels
    pub height: usize,
    /// Media frame rate
    #[serde(default = "default_fps")]
    pub fps: f64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let data =
            fs::read_to_string(path).context(format!("Failed to read config file {}", path))?;
        let config: Config =
            serde_json::from_str(&data).context(format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.white_keys == 0 {
            bail!("white key count must be at least 1");
        }
        if self.offset >= self.white_keys {
            bail!(
                "offset {} leaves no keys to sample ({} white keys)",
                self.offset,
                self.white_keys
            );
        }
        let top_index = self.white_keys - self.offset - 1;
        if top_index > MAX_WIRE_INDEX as usize {
            bail!(
                "wire index {} would collide with the reset sentinel; at most {} keys may follow the offset",
                top_index,
                MAX_WIRE_INDEX as usize + 1
            );
        }
        if self.width == 0 || self.height == 0 {
            bail!("frame size must be non-zero");
        }
        if self.fps <= 0.0 {
            bail!("fps must be positive");
        }
        Ok(())
    }
}

/// Parse a `WIDTHxHEIGHT` string like `1920x1080`.
pub fn parse_size(size: &str) -> Result<(usize, usize)> {
    let lower = size.to_ascii_lowercase();
    let (width, height) = lower
        .split_once('x')
        .context("expected WIDTHxHEIGHT, e.g. 1920x1080")?;
    let width = width.parse().context(format!("bad frame width {:?}", width))?;
    let height = height
        .parse()
        .context(format!("bad frame height {:?}", height))?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(white_keys: usize, offset: usize) -> Config {
        Config {
            media: "video.rgb".into(),
            port: "/dev/ttyUSB0".into(),
            white_keys,
            offset,
            width: 1920,
            height: 1080,
            fps: 30.0,
        }
    }

    #[test]
    fn test_typical_config_validates() {
        assert!(config(52, 0).validate().is_ok());
        assert!(config(52, 36).validate().is_ok());
    }

    #[test]
    fn test_offset_must_leave_keys() {
        assert!(config(10, 10).validate().is_err());
        assert!(config(10, 11).validate().is_err());
        assert!(config(10, 9).validate().is_ok());
    }

    #[test]
    fn test_wire_index_range_must_avoid_reset_sentinel() {
        // 255 keys after the offset puts the top wire index at 254 — the
        // last value distinguishable from the reset frame.
        assert!(config(255, 0).validate().is_ok());
        assert!(config(256, 0).validate().is_err());
        assert!(config(300, 45).validate().is_ok());
    }

    #[test]
    fn test_zero_keys_rejected() {
        assert!(config(0, 0).validate().is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_size("640X480").unwrap(), (640, 480));
        assert!(parse_size("1920").is_err());
        assert!(parse_size("ax b").is_err());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "media": "song.rgb",
            "port": "/dev/ttyACM0",
            "white_keys": 52,
            "width": 1280,
            "height": 720
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.offset, 0);
        assert_eq!(config.fps, 30.0);
        assert!(config.validate().is_ok());
    }
}
