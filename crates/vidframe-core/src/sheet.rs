use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::video::frame::format_timestamp;
use crate::video::VideoFrame;

/// Fonts tried in order when no font is supplied explicitly.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
];

const CELL_WIDTH: u32 = 320;
const PADDING: u32 = 8;
const LABEL_HEIGHT: u32 = 24;
const TEXT_SCALE: f32 = 20.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BORDER_COLOR: Rgb<u8> = Rgb([90, 90, 90]);
const BACKGROUND: Rgb<u8> = Rgb([24, 24, 24]);

/// Tiles captured frames into a single review image, each labelled with its timestamp.
pub struct ContactSheet {
    font: Option<FontVec>,
}

impl ContactSheet {
    /// Use the first system font that loads; without one, cells are unlabelled.
    pub fn new() -> Self {
        let font = Self::load_font();
        Self { font }
    }

    pub fn with_font(font: FontVec) -> Self {
        Self { font: Some(font) }
    }

    pub fn without_labels() -> Self {
        Self { font: None }
    }

    /// Lay `frames` out left to right, top to bottom, `columns` per row.
    pub fn render(&self, frames: &[VideoFrame], columns: u32) -> Result<RgbImage> {
        if frames.is_empty() {
            bail!("no frames to render");
        }
        if columns == 0 {
            bail!("contact sheet needs at least one column");
        }

        let cells: Vec<RgbImage> = frames.iter().map(|f| scale_to_cell(f.image())).collect();
        let image_height = cells.iter().map(|c| c.height()).max().unwrap_or(0);
        let label_height = if self.font.is_some() { LABEL_HEIGHT } else { 0 };
        let cell_height = image_height + label_height;

        let count = frames.len() as u32;
        let cols = columns.min(count);
        let rows = count.div_ceil(cols);
        let width = cols * (CELL_WIDTH + PADDING) + PADDING;
        let height = rows * (cell_height + PADDING) + PADDING;

        info!(frames = count, cols, rows, width, height, "rendering contact sheet");

        let mut sheet = RgbImage::from_pixel(width, height, BACKGROUND);
        for (i, (frame, cell)) in frames.iter().zip(&cells).enumerate() {
            let i = i as u32;
            let x = PADDING + (i % cols) * (CELL_WIDTH + PADDING);
            let y = PADDING + (i / cols) * (cell_height + PADDING);

            imageops::overlay(&mut sheet, cell, x as i64, y as i64);
            let border = Rect::at(x as i32, y as i32).of_size(CELL_WIDTH, cell_height);
            draw_hollow_rect_mut(&mut sheet, border, BORDER_COLOR);

            if let Some(font) = &self.font {
                let label = format_timestamp(frame.time_millis());
                let text_y = (y + image_height + 2) as i32;
                draw_text_mut(&mut sheet, TEXT_COLOR, x as i32 + 4, text_y, PxScale::from(TEXT_SCALE), font, &label);
            }
            debug!(index = i, x, y, time_millis = frame.time_millis(), "placed frame");
        }

        Ok(sheet)
    }

    pub fn save(&self, frames: &[VideoFrame], columns: u32, path: &Path) -> Result<()> {
        let sheet = self.render(frames, columns)?;
        sheet
            .save(path)
            .with_context(|| format!("failed to save contact sheet to {}", path.display()))?;
        info!(?path, "contact sheet written");
        Ok(())
    }

    fn load_font() -> Option<FontVec> {
        for path in FONT_CANDIDATES {
            let Ok(data) = std::fs::read(path) else {
                continue;
            };
            match FontVec::try_from_vec(data) {
                Ok(font) => {
                    info!(path, "loaded contact sheet font");
                    return Some(font);
                }
                Err(e) => warn!(path, error = %e, "failed to parse font file"),
            }
        }
        warn!("no usable font found, contact sheet cells will be unlabelled");
        None
    }
}

impl Default for ContactSheet {
    fn default() -> Self {
        Self::new()
    }
}

/// Resize to the cell width, keeping the aspect ratio.
fn scale_to_cell(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let height = ((h as u64 * CELL_WIDTH as u64) / w.max(1) as u64).max(1) as u32;
    imageops::resize(image, CELL_WIDTH, height, FilterType::Triangle)
}
