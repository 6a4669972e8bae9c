//! Region-of-interest handling.
//!
//! Hardcoded subtitles sit in a fixed band of every frame. The band is
//! configured as four percentage boundaries and converted once per run into
//! absolute pixel bounds.

use anyhow::{Result, bail};

/// Crop boundaries expressed as percentages of the frame dimensions.
#[derive(Debug, Clone, Copy)]
pub struct RoiPercent {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for RoiPercent {
    /// The lower-center band where burned-in subtitles usually sit.
    fn default() -> Self {
        Self {
            top: 66.0,
            bottom: 95.0,
            left: 10.0,
            right: 90.0,
        }
    }
}

/// Absolute pixel bounds of the crop region within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

impl RoiPercent {
    /// Convert the percentage boundaries into pixel bounds for a frame of the
    /// given dimensions.
    ///
    /// Each bound is `floor(dimension * percent / 100)`. Out-of-range,
    /// inverted, or empty boundaries are a configuration error and abort the
    /// run before any processing starts.
    pub fn to_pixel_region(&self, width: u32, height: u32) -> Result<CropRegion> {
        for (name, value) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("ROI {name} percentage {value} is outside 0-100");
            }
        }

        let region = CropRegion {
            left: (width as f64 * self.left / 100.0).floor() as u32,
            top: (height as f64 * self.top / 100.0).floor() as u32,
            right: (width as f64 * self.right / 100.0).floor() as u32,
            bottom: (height as f64 * self.bottom / 100.0).floor() as u32,
        };
        if region.top >= region.bottom || region.left >= region.right {
            bail!(
                "ROI is empty or inverted: top {}% bottom {}% left {}% right {}% \
                 maps to {:?} on a {}x{} frame",
                self.top,
                self.bottom,
                self.left,
                self.right,
                region,
                width,
                height
            );
        }
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_percentages_with_floor() {
        let roi = RoiPercent {
            top: 66.0,
            bottom: 95.0,
            left: 10.0,
            right: 90.0,
        };
        let region = roi.to_pixel_region(1280, 720).unwrap();
        assert_eq!(
            region,
            CropRegion {
                left: 128,
                top: 475,
                right: 1152,
                bottom: 684
            }
        );
    }

    #[test]
    fn full_frame_region_is_valid() {
        let roi = RoiPercent {
            top: 0.0,
            bottom: 100.0,
            left: 0.0,
            right: 100.0,
        };
        let region = roi.to_pixel_region(640, 480).unwrap();
        assert_eq!((region.width(), region.height()), (640, 480));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let roi = RoiPercent {
            top: 80.0,
            bottom: 20.0,
            ..RoiPercent::default()
        };
        assert!(roi.to_pixel_region(1280, 720).is_err());
    }

    #[test]
    fn out_of_range_percentages_are_rejected() {
        let roi = RoiPercent {
            right: 120.0,
            ..RoiPercent::default()
        };
        assert!(roi.to_pixel_region(1280, 720).is_err());

        let roi = RoiPercent {
            left: -5.0,
            ..RoiPercent::default()
        };
        assert!(roi.to_pixel_region(1280, 720).is_err());
    }

    #[test]
    fn bounds_collapsing_to_the_same_pixel_are_rejected() {
        // 50% and 50.4% of 100 px both floor to pixel 50.
        let roi = RoiPercent {
            top: 50.0,
            bottom: 50.4,
            ..RoiPercent::default()
        };
        assert!(roi.to_pixel_region(100, 100).is_err());
    }
}
