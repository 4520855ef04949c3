//! Local pixel analyzer.
//!
//! Pure and deterministic: one accumulation pass over the RGBA grid, then a
//! handful of derived flags. Callers must hand in a decoded image; the only
//! failure mode is a zero-dimension grid.

use image::RgbaImage;

use crate::error::{AisError, Result};
use crate::types::{
    AnalysisResult, Characteristics, ColorStats, Dimensions, DominantColor, EstimatedType,
    ImageInfo, ImageMetadata,
};

/// Average brightness below this counts as a dark image.
const DARK_THRESHOLD: u8 = 128;

/// Channel spread (max - min of the averages) above this counts as colorful.
const COLORFUL_SPREAD: u8 = 50;

pub fn analyze(image: &RgbaImage, info: &ImageInfo) -> Result<AnalysisResult> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AisError::ZeroSizeImage);
    }

    let mut red_sum = 0u64;
    let mut green_sum = 0u64;
    let mut blue_sum = 0u64;
    let mut brightness_sum = 0f64;

    for pixel in image.pixels() {
        let [r, g, b, _] = pixel.0;
        red_sum += r as u64;
        green_sum += g as u64;
        blue_sum += b as u64;
        // ITU-R 601 luma weighting.
        brightness_sum += 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    }

    let pixel_count = width as u64 * height as u64;
    let avg_red = round_channel(red_sum, pixel_count);
    let avg_green = round_channel(green_sum, pixel_count);
    let avg_blue = round_channel(blue_sum, pixel_count);
    let avg_brightness = (brightness_sum / pixel_count as f64).round() as u8;

    let max = avg_red.max(avg_green).max(avg_blue);
    let min = avg_red.min(avg_green).min(avg_blue);

    Ok(AnalysisResult {
        dimensions: Dimensions {
            width,
            height,
            aspect_ratio: format!("{:.2}", width as f64 / height as f64),
        },
        colors: ColorStats {
            average_red: avg_red,
            average_green: avg_green,
            average_blue: avg_blue,
            dominant_color: dominant_color(avg_red, avg_green, avg_blue),
        },
        characteristics: Characteristics {
            brightness: avg_brightness,
            is_dark: avg_brightness < DARK_THRESHOLD,
            is_colorful: max - min > COLORFUL_SPREAD,
            estimated_type: estimate_type(avg_red, avg_green, avg_blue, avg_brightness),
        },
        metadata: ImageMetadata {
            alt: info.alt.clone(),
            title: info.title.clone(),
            url: info.src.clone(),
        },
        ai_detection: None,
    })
}

fn round_channel(sum: u64, count: u64) -> u8 {
    (sum as f64 / count as f64).round() as u8
}

/// Strict max wins; any tie for the top resolves to Balanced.
fn dominant_color(r: u8, g: u8, b: u8) -> DominantColor {
    if r > g && r > b {
        DominantColor::Red
    } else if g > r && g > b {
        DominantColor::Green
    } else if b > r && b > g {
        DominantColor::Blue
    } else {
        DominantColor::Balanced
    }
}

/// Mutually exclusive buckets, checked in priority order.
fn estimate_type(r: u8, g: u8, b: u8, brightness: u8) -> EstimatedType {
    if brightness < 50 {
        EstimatedType::DarkLowLight
    } else if brightness > 200 {
        EstimatedType::BrightOverexposed
    } else if r.abs_diff(g) < 10 && g.abs_diff(b) < 10 {
        EstimatedType::Grayscale
    } else {
        EstimatedType::Color
    }
}
