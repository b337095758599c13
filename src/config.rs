use std::{fs, path::Path};

use anyhow::bail;
use serde::Deserialize;

use crate::pen::Color;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Pen width in pixels, shared by strokes and the frame outline.
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
    #[serde(default = "default_background_color")]
    pub background_color: Color,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: Color,
    /// Margin between the viewport edges and the decorative frame.
    #[serde(default = "default_frame_inset")]
    pub frame_inset: u32,
    /// Minimum per-axis pointer displacement for a move to extend a stroke.
    #[serde(default = "default_move_tolerance")]
    pub move_tolerance: f32,
}

fn default_stroke_width() -> f32 {
    12.0
}

fn default_background_color() -> Color {
    Color::rgb(0xff, 0xff, 0xff)
}

fn default_stroke_color() -> Color {
    Color::rgb(0x00, 0x96, 0x88)
}

fn default_frame_inset() -> u32 {
    40
}

fn default_move_tolerance() -> f32 {
    8.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stroke_width: default_stroke_width(),
            background_color: default_background_color(),
            stroke_color: default_stroke_color(),
            frame_inset: default_frame_inset(),
            move_tolerance: default_move_tolerance(),
        }
    }
}

impl Config {
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;

        // Validate configuration.
        // - `stroke_width` and `move_tolerance` must be greater than 0.

        if !(config.stroke_width > 0.0) {
            bail!(
                "`stroke_width` must be greater than 0 (got {})",
                config.stroke_width
            );
        }
        if !(config.move_tolerance > 0.0) {
            bail!(
                "`move_tolerance` must be greater than 0 (got {})",
                config.move_tolerance
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_example_config() {
        Config::load("config.example.toml").unwrap();
    }

    #[test]
    fn empty_config_matches_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.stroke_width, 12.0);
        assert_eq!(config.background_color, Color::rgb(0xff, 0xff, 0xff));
        assert_eq!(config.frame_inset, 40);
        assert_eq!(config.move_tolerance, 8.0);
    }

    #[test]
    fn parses_colors_with_alpha() {
        let config = Config::parse(r##"stroke_color = "#80112233""##).unwrap();
        assert_eq!(config.stroke_color, Color::argb(0x80, 0x11, 0x22, 0x33));
    }

    #[test]
    fn rejects_nonpositive_stroke_width() {
        assert!(Config::parse("stroke_width = 0.0").is_err());
        assert!(Config::parse("stroke_width = -3.0").is_err());
    }

    #[test]
    fn rejects_nonpositive_move_tolerance() {
        assert!(Config::parse("move_tolerance = 0.0").is_err());
    }

    #[test]
    fn rejects_malformed_color() {
        assert!(Config::parse(r#"background_color = "white""#).is_err());
    }
}
