//! Widget configuration and tunable constants.

use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::types::Color;

/// Inputs supplied by the host on every render pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// When false the shape is shown fully revealed and input is ignored.
    pub scratchable: bool,
    /// Shape image; its bounding box sizes every surface.
    pub url_map: String,
    /// Overlay image revealed by scratching.
    pub url_flag: String,
    pub color_outline: Color,
    /// Fill shown where the shape is still covered.
    pub color_scratch: Color,
}

impl Config {
    /// True when moving from `self` to `next` needs a full rebuild of the
    /// per-configuration state. `color_scratch` alone only needs a redraw.
    pub fn needs_rebuild(&self, next: &Config) -> bool {
        self.scratchable != next.scratchable
            || self.url_map != next.url_map
            || self.url_flag != next.url_flag
            || self.color_outline != next.color_outline
    }
}

pub const DEFAULT_BRUSH_RADIUS: f32 = 20.0;
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.90;
pub const DEFAULT_ALPHA_CUTOFF: u8 = 128;

/// Brush and completion constants.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Tuning {
    /// Pixels within this distance of a stroke segment are revealed.
    pub brush_radius: f32,
    /// Revealed fraction at which the reveal auto-completes.
    pub completion_threshold: f64,
    /// Shape pixels with alpha >= this are inside the silhouette.
    pub alpha_cutoff: u8,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            brush_radius: DEFAULT_BRUSH_RADIUS,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            alpha_cutoff: DEFAULT_ALPHA_CUTOFF,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.brush_radius.is_finite() && self.brush_radius > 0.0) {
            return Err(Error::InvalidTuning(format!(
                "brushRadius must be positive, got {}",
                self.brush_radius
            )));
        }
        let t = self.completion_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(Error::InvalidTuning(format!(
                "completionThreshold must be in (0, 1], got {t}"
            )));
        }
        if self.alpha_cutoff == 0 {
            return Err(Error::InvalidTuning("alphaCutoff must be at least 1".into()));
        }
        Ok(())
    }
}

/// On-disk layout used by the demo binary.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoFile {
    pub widget: Config,
    #[serde(default)]
    pub tuning: Tuning,
}

pub fn from_yaml_str(s: &str) -> Result<DemoFile, Error> {
    let file: DemoFile = serde_yaml::from_str(s)?;
    file.tuning.validate()?;
    Ok(file)
}

pub fn from_yaml_file(path: &Path) -> Result<DemoFile, Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| Error::ConfigIo { path: path.to_path_buf(), source })?;
    from_yaml_str(&text)
}
