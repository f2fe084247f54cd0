// Layer compositor: owns the display surface, the scratch mask and the outline.
// Paint order (back to front):
//   1) scratch color where the mask is still covered
//   2) the overlay image where the mask is revealed (inside the silhouette only)
//   3) the outline, always on top

use image::imageops::{self, FilterType};

use crate::types::{Color, DecodedImage, FrameBuffer, ScratchMask};

/// All per-configuration raster state, built once from the decoded images.
#[derive(Debug, Clone)]
pub struct Layers {
    width: usize,
    height: usize,
    silhouette: Vec<bool>, // inside the shape (alpha >= cutoff)
    overlay: Vec<u32>,     // overlay resized to the shape, 0xAARRGGBB
    outline: Vec<u32>,     // boundary pixels in the outline color, 0 elsewhere
    mask: ScratchMask,
    itchy_pixel_count: usize,
    display: FrameBuffer,
}

impl Layers {
    /// Build every layer for one configuration.
    ///
    /// With `scratchable == false` the mask starts fully revealed, so the
    /// itchy pixel count is zero.
    pub fn build(
        image_map: &DecodedImage,
        image_flag: &DecodedImage,
        scratchable: bool,
        color_outline: Color,
        alpha_cutoff: u8,
    ) -> Self {
        let (w, h) = (image_map.width() as usize, image_map.height() as usize);

        let silhouette: Vec<bool> = image_map.pixels().map(|p| p.0[3] >= alpha_cutoff).collect();

        let mut mask = ScratchMask::from_coverage(w, h, silhouette.clone());
        if !scratchable {
            mask.reveal_all();
        }
        let itchy_pixel_count = mask.covered_count();

        let overlay = fit_overlay(image_flag, w, h);
        let outline = trace_outline(&silhouette, w, h, color_outline);

        Self {
            width: w,
            height: h,
            silhouette,
            overlay,
            outline,
            mask,
            itchy_pixel_count,
            display: FrameBuffer::new(w, h),
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn itchy_pixel_count(&self) -> usize {
        self.itchy_pixel_count
    }

    pub fn mask(&self) -> &ScratchMask {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut ScratchMask {
        &mut self.mask
    }

    pub fn is_outline(&self, x: usize, y: usize) -> bool {
        self.outline[y * self.width + x] != 0
    }

    pub fn display(&self) -> &FrameBuffer {
        &self.display
    }

    /// Composite all layers onto the display surface.
    pub fn draw(&mut self, color_scratch: Color) -> &FrameBuffer {
        let scratch = color_scratch.to_argb();
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let base = if self.mask.is_covered(x, y) {
                    scratch
                } else if self.silhouette[idx] {
                    self.overlay[idx]
                } else {
                    0
                };
                let line = self.outline[idx];
                self.display.pixels[idx] = if line == 0 { base } else { blend_over(base, line) };
            }
        }
        &self.display
    }
}

/// Resize the overlay so it lines up with the shape's bounding box.
fn fit_overlay(image_flag: &DecodedImage, w: usize, h: usize) -> Vec<u32> {
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let fitted;
    let src = if image_flag.dimensions() == (w as u32, h as u32) {
        image_flag
    } else {
        fitted = imageops::resize(image_flag, w as u32, h as u32, FilterType::Triangle);
        &fitted
    };
    src.pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
        })
        .collect()
}

/// Mark inside pixels that touch the outside (4-connected, image edge counts
/// as outside) in the outline color.
fn trace_outline(silhouette: &[bool], w: usize, h: usize, color: Color) -> Vec<u32> {
    let argb = color.to_argb();
    let inside = |x: isize, y: isize| -> bool {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            return false;
        }
        silhouette[y as usize * w + x as usize]
    };
    let mut out = vec![0u32; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            if !inside(x, y) {
                continue;
            }
            let edge = !inside(x - 1, y) || !inside(x + 1, y) || !inside(x, y - 1) || !inside(x, y + 1);
            if edge {
                out[y as usize * w + x as usize] = argb;
            }
        }
    }
    out
}

/// Straight-alpha source-over of `src` onto `dst` (both 0xAARRGGBB).
#[inline]
fn blend_over(dst: u32, src: u32) -> u32 {
    let sa = src >> 24;
    if sa == 0xFF {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst >> 24;
    // out_a = sa + da * (1 - sa), in 0..=255 fixed point
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        return 0;
    }
    let channel = |shift: u32| -> u32 {
        let s = (src >> shift) & 0xFF;
        let d = (dst >> shift) & 0xFF;
        (s * sa + d * da * (255 - sa) / 255) / out_a
    };
    (out_a << 24) | (channel(16) << 16) | (channel(8) << 8) | channel(0)
}
