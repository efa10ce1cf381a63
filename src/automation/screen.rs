//! Pixel color queries, pixel search and image search.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::Automation;
use crate::error::{AhkError, Result};
use crate::geometry::{Geometry, Point, Positioning, Region};
use crate::response;

/// A 24-bit RGB color, written as six uppercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(((red as u32) << 16) | ((green as u32) << 8) | blue as u32)
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Accepts `RRGGBB`, `0xRRGGBB` or `#RRGGBB`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .or_else(|| trimmed.strip_prefix('#'))
            .unwrap_or(trimmed);
        let value =
            u32::from_str_radix(hex, 16).map_err(|e| format!("invalid color '{}': {}", s, e))?;
        if value > 0xFF_FFFF {
            return Err(format!("color '{}' does not fit in 24 bits", s));
        }
        Ok(Self(value))
    }
}

/// How the engine samples a pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Default,
    Slow,
    Alt,
}

impl ColorMode {
    fn field(self) -> &'static str {
        match self {
            ColorMode::Default => "RGB ",
            ColorMode::Slow => "RGB Slow",
            ColorMode::Alt => "RGB Alt",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelColor {
    pub position: Point,
    pub positioning: Positioning,
    pub mode: ColorMode,
}

impl PixelColor {
    pub fn at(position: impl Into<Point>) -> Self {
        Self {
            position: position.into(),
            ..Self::default()
        }
    }

    fn command(&self, geometry: &Geometry) -> String {
        let (x, y) = geometry.resolve(self.position, self.positioning);
        format!("getPixelColor;{};{};{}", x, y, self.mode.field())
    }
}

/// Find the first pixel of `color` inside `region`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSearch {
    pub region: Region,
    pub color: Color,
    /// Allowed per-channel deviation, defaulting to the configured variation.
    pub variation: Option<u8>,
    pub positioning: Positioning,
}

impl PixelSearch {
    pub fn new(region: Region, color: Color) -> Self {
        Self {
            region,
            color,
            variation: None,
            positioning: Positioning::Pixels,
        }
    }

    fn command(&self, geometry: &Geometry, default_variation: u8) -> String {
        let (x1, y1, x2, y2) = geometry.resolve_region(self.region, self.positioning);
        format!(
            "pixelSearch;{};{};{};{};0x{};{}",
            x1,
            y1,
            x2,
            y2,
            self.color,
            self.variation.unwrap_or(default_variation)
        )
    }
}

/// Find an image file on screen inside `region`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSearch {
    pub region: Region,
    pub image: PathBuf,
    pub variation: Option<u8>,
    /// Color treated as transparent in the image.
    pub transparent: Option<Color>,
    pub positioning: Positioning,
}

impl ImageSearch {
    pub fn new(region: Region, image: impl Into<PathBuf>) -> Self {
        Self {
            region,
            image: image.into(),
            variation: None,
            transparent: None,
            positioning: Positioning::Pixels,
        }
    }

    fn command(&self, geometry: &Geometry, default_variation: u8) -> String {
        let (x1, y1, x2, y2) = geometry.resolve_region(self.region, self.positioning);
        let transparent = self
            .transparent
            .map(|c| format!("*Trans0x{} ", c))
            .unwrap_or_default();
        format!(
            "imageSearch;{};{};{};{};*{} {}{}",
            x1,
            y1,
            x2,
            y2,
            self.variation.unwrap_or(default_variation),
            transparent,
            self.image.display()
        )
    }
}

impl Automation {
    pub async fn get_pixel_color(&self, query: PixelColor) -> Result<Option<Color>> {
        let command = query.command(&self.geometry());
        let reply = self.request(&command).await?;
        if reply.trim().is_empty() {
            return Ok(None);
        }
        reply
            .parse()
            .map(Some)
            .map_err(|reason: String| AhkError::invalid_response(&command, &reply, reason))
    }

    pub async fn pixel_search(&self, search: PixelSearch) -> Result<Option<Point>> {
        let command = search.command(&self.geometry(), self.default_color_variation());
        self.search(&command, search.positioning).await
    }

    pub async fn image_search(&self, search: &ImageSearch) -> Result<Option<Point>> {
        let command = search.command(&self.geometry(), self.default_color_variation());
        self.search(&command, search.positioning).await
    }

    async fn search(&self, command: &str, positioning: Positioning) -> Result<Option<Point>> {
        let reply = self.request(command).await?;
        let found = response::point(command, &reply)?;
        Ok(found.map(|p| self.geometry().present(p, positioning)))
    }
}
