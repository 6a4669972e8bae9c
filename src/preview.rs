//! ROI preview.
//!
//! Before a long extraction run it is worth checking that the configured
//! crop region actually covers the subtitles. The preview grabs a handful of
//! frames spread across the video, draws the region outline on each, and
//! writes them out as PNGs for inspection.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use log::info;
use rayon::prelude::*;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::roi::CropRegion;
use crate::video::FrameSource;

const SAMPLE_COUNT: u32 = 6;
const OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);
const OUTLINE_THICKNESS: u32 = 4;

/// Write preview frames with the crop region outlined into `dir`, returning
/// the saved paths.
///
/// Sample positions are spread evenly across the source duration. Positions
/// the source cannot produce a frame for (very short or damaged files) are
/// skipped.
pub fn render_previews(
    source: &mut impl FrameSource,
    region: &CropRegion,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preview directory {dir:?}"))?;

    let duration = source.total_frames() as f64 / source.frame_rate();
    let mut frames = Vec::new();
    for i in 1..=SAMPLE_COUNT {
        let position = duration * f64::from(i) / f64::from(SAMPLE_COUNT + 1);
        source.seek(position)?;
        if let Some(mut frame) = source.read_frame()? {
            draw_region_outline(&mut frame.image, region);
            frames.push((dir.join(format!("preview_{i:02}.png")), frame.image));
        }
    }

    frames.par_iter().try_for_each(|(path, image)| -> Result<()> {
        image
            .save(path)
            .with_context(|| format!("Failed to save preview frame to {path:?}"))?;
        Ok(())
    })?;

    Ok(frames.into_iter().map(|(path, _)| path).collect())
}

/// Draw a hollow rectangle along the region bounds, clamped to the image.
fn draw_region_outline(image: &mut RgbImage, region: &CropRegion) {
    let (width, height) = image.dimensions();
    let right = region.right.min(width);
    let bottom = region.bottom.min(height);
    for x in region.left..right {
        for t in 0..OUTLINE_THICKNESS {
            if region.top + t < height {
                image.put_pixel(x, region.top + t, OUTLINE);
            }
            if bottom > t {
                image.put_pixel(x, bottom - t - 1, OUTLINE);
            }
        }
    }
    for y in region.top..bottom {
        for t in 0..OUTLINE_THICKNESS {
            if region.left + t < width {
                image.put_pixel(region.left + t, y, OUTLINE);
            }
            if right > t {
                image.put_pixel(right - t - 1, y, OUTLINE);
            }
        }
    }
}

/// Ask on stdin whether to proceed with extraction.
pub fn confirm_proceed() -> Result<bool> {
    print!("Proceed with extraction? [y/N] ");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Render the preview frames and ask the user to confirm the region.
pub fn confirm_region(
    source: &mut impl FrameSource,
    region: &CropRegion,
    dir: &Path,
) -> Result<bool> {
    let paths = render_previews(source, region, dir)?;
    info!(
        "Wrote {} preview frames to {dir:?}; the crop region is outlined in red",
        paths.len()
    );
    confirm_proceed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::FakeSource;

    #[test]
    fn renders_outlined_previews() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::new(10.0, 100);
        let region = CropRegion {
            left: 8,
            top: 30,
            right: 56,
            bottom: 44,
        };
        let paths = render_previews(&mut source, &region, dir.path()).unwrap();
        assert_eq!(paths.len(), 6);
        for path in &paths {
            assert!(path.exists());
        }

        let first = image::open(&paths[0]).unwrap().to_rgb8();
        // Top edge of the outline.
        assert_eq!(first.get_pixel(8, 30), &Rgb([255, 0, 0]));
        // Center of the region stays untouched.
        assert_eq!(first.get_pixel(32, 37), &Rgb([0, 0, 0]));
    }

    #[test]
    fn outline_is_clamped_to_the_frame() {
        let mut image = RgbImage::new(16, 16);
        let region = CropRegion {
            left: 4,
            top: 4,
            right: 16,
            bottom: 16,
        };
        draw_region_outline(&mut image, &region);
        assert_eq!(image.get_pixel(15, 4), &Rgb([255, 0, 0]));
    }
}
