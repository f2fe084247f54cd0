// Core raster types shared by the compositor, the scratch engine and the widget.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// A decoded shape or overlay image. Always RGBA8 so alpha queries are uniform.
pub type DecodedImage = image::RgbaImage;

/// Display surface: one packed pixel per entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,     // surface width in pixels
    pub height: usize,    // surface height in pixels
    pub pixels: Vec<u32>, // each entry is 0xAARRGGBB; alpha 0 = nothing painted
}

impl FrameBuffer {
    /// A fully transparent surface.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }
}

/// Coverage surface tracking scratch progress: `true` = still covered.
///
/// The covered count is kept alongside the bits so progress checks never
/// need a full scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchMask {
    width: usize,
    height: usize,
    covered: Vec<bool>,
    covered_count: usize,
}

impl ScratchMask {
    /// Build a mask from a per-pixel coverage vector.
    ///
    /// # Panics
    /// If `covered.len() != width * height`.
    pub fn from_coverage(width: usize, height: usize, covered: Vec<bool>) -> Self {
        assert_eq!(
            covered.len(),
            width * height,
            "coverage length does not match a {width}x{height} mask"
        );
        let covered_count = covered.iter().filter(|c| **c).count();
        Self { width, height, covered, covered_count }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Running count of still-covered pixels.
    pub fn covered_count(&self) -> usize {
        self.covered_count
    }

    /// Full scan of the coverage bits. Always equals `covered_count()`.
    pub fn recount(&self) -> usize {
        self.covered.iter().filter(|c| **c).count()
    }

    #[inline]
    pub fn is_covered(&self, x: usize, y: usize) -> bool {
        self.covered[y * self.width + x]
    }

    /// Mark one pixel revealed. Returns true if it was covered before.
    #[inline]
    pub fn reveal(&mut self, x: usize, y: usize) -> bool {
        let idx = y * self.width + x;
        if self.covered[idx] {
            self.covered[idx] = false;
            self.covered_count -= 1;
            true
        } else {
            false
        }
    }

    /// Reveal every pixel (full scratch).
    pub fn reveal_all(&mut self) {
        self.covered.iter_mut().for_each(|c| *c = false);
        self.covered_count = 0;
    }
}

/// Straight-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Pack as 0xAARRGGBB for the display surface.
    #[inline]
    pub fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}: expected #rgb, #rrggbb or #rrggbbaa")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(bad)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).map_err(|_| bad());
        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
            _ => Err(bad()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xFF {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}
