use std::{fmt, str::FromStr};

use serde::{de::Visitor, Deserialize};

/// Packed `0xAARRGGBB` color, matching the canvas pixel layout.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Color(pub(crate) u32);

impl Color {
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(0xff, r, g, b)
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

#[derive(Debug)]
pub struct InvalidColor;

impl FromStr for Color {
    type Err = InvalidColor;

    /// Parses `#rrggbb` (opaque) or `#aarrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').ok_or(InvalidColor)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            // `from_str_radix` tolerates a leading `+`.
            return Err(InvalidColor);
        }
        let digits = u32::from_str_radix(hex, 16).map_err(|_| InvalidColor)?;
        match hex.len() {
            6 => Ok(Color(0xff00_0000 | digits)),
            8 => Ok(Color(digits)),
            _ => Err(InvalidColor),
        }
    }
}

impl<'a> Deserialize<'a> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        struct FromStrVisitor;

        impl<'de> Visitor<'de> for FromStrVisitor {
            type Value = Color;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("`#rrggbb` or `#aarrggbb` color")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse()
                    .map_err(|_| E::custom(format_args!("invalid color '{v}'")))
            }
        }

        deserializer.deserialize_str(FromStrVisitor)
    }
}

/// Line cap shape. The stamped pen tip is a disc, so ends are always round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Round,
}

/// Segment join shape. Adjacent stamps overlap, so joins are always round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    Round,
}

/// Immutable stroke styling. One `Pen` is built from the configuration at
/// startup and shared by every segment commit and the frame outline.
#[derive(Debug, Clone, Copy)]
pub struct Pen {
    pub color: Color,
    pub stroke_width: f32,
    pub cap: Cap,
    pub join: Join,
    pub antialias: bool,
    pub dither: bool,
}

impl Pen {
    pub fn new(color: Color, stroke_width: f32) -> Self {
        Self {
            color,
            stroke_width,
            cap: Cap::Round,
            join: Join::Round,
            antialias: true,
            dither: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgb_hex() {
        assert_eq!("#102030".parse::<Color>().unwrap(), Color::rgb(0x10, 0x20, 0x30));
    }

    #[test]
    fn parses_argb_hex() {
        assert_eq!(
            "#80ff0000".parse::<Color>().unwrap(),
            Color::argb(0x80, 0xff, 0, 0),
        );
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!("102030".parse::<Color>().is_err());
        assert!("#1020".parse::<Color>().is_err());
        assert!("#10203g".parse::<Color>().is_err());
        assert!("#+12345".parse::<Color>().is_err());
    }
}
