// src/services/color_profiler.rs
// Hue is halved into [0, 180); saturation and value span [0, 255].

use crate::errors::ColorAnalysisError;
use crate::models::{ColorProfile, MaturityIndicator, PixelBuffer};

const HUE_BUCKETS: usize = 180;
const SAT_BUCKETS: usize = 256;
const VAL_BUCKETS: usize = 256;

const GRAYSCALE_UNIFORMITY: f64 = 0.8;
const FALLBACK_UNIFORMITY: f64 = 0.7;
const MIN_UNIFORMITY: f64 = 0.1;

/// Result of color profiling. A failed measurement still yields a usable profile.
#[derive(Debug, Clone)]
pub enum ColorOutcome {
    Measured(ColorProfile),
    Degraded {
        profile: ColorProfile,
        cause: ColorAnalysisError,
    },
}

#[cfg(test)]
impl ColorOutcome {
    pub fn profile(&self) -> &ColorProfile {
        match self {
            ColorOutcome::Measured(profile) => profile,
            ColorOutcome::Degraded { profile, .. } => profile,
        }
    }

    pub fn into_profile(self) -> ColorProfile {
        match self {
            ColorOutcome::Measured(profile) => profile,
            ColorOutcome::Degraded { profile, .. } => profile,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ColorOutcome::Degraded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hsv {
    h: u8,
    s: u8,
    v: u8,
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let mut degrees = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }

    Hsv {
        h: ((degrees / 2.0).round() as usize % HUE_BUCKETS) as u8,
        s: s.round() as u8,
        v: max as u8,
    }
}

pub fn maturity_for_hue(hue: u32) -> MaturityIndicator {
    if hue < 30 {
        MaturityIndicator::Ripe
    } else if hue < 90 {
        MaturityIndicator::Unripe
    } else {
        MaturityIndicator::Variable
    }
}

pub fn uniformity_for_variance(hue_variance: f64) -> f64 {
    (1.0 - hue_variance / 1000.0).clamp(MIN_UNIFORMITY, 1.0)
}

pub struct ColorProfiler;

impl ColorProfiler {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, buffer: &PixelBuffer) -> ColorOutcome {
        if buffer.is_grayscale() {
            return ColorOutcome::Measured(grayscale_profile(buffer));
        }

        match measure_color(buffer) {
            Ok(profile) => ColorOutcome::Measured(profile),
            Err(cause) => {
                log::warn!("Color analysis failed, using fallback profile: {}", cause);
                ColorOutcome::Degraded {
                    profile: fallback_profile(buffer),
                    cause,
                }
            }
        }
    }
}

fn grayscale_profile(buffer: &PixelBuffer) -> ColorProfile {
    ColorProfile {
        dominant_hue: 0,
        average_saturation: 0.0,
        average_value: buffer.mean(),
        color_uniformity: GRAYSCALE_UNIFORMITY,
        color_variance: buffer.variance(),
        maturity_indicator: MaturityIndicator::Undetermined,
        is_grayscale: true,
    }
}

fn fallback_profile(buffer: &PixelBuffer) -> ColorProfile {
    ColorProfile {
        dominant_hue: 0,
        average_saturation: 0.0,
        average_value: buffer.mean(),
        color_uniformity: FALLBACK_UNIFORMITY,
        color_variance: 0.0,
        maturity_indicator: MaturityIndicator::Undetermined,
        is_grayscale: true,
    }
}

fn measure_color(buffer: &PixelBuffer) -> Result<ColorProfile, ColorAnalysisError> {
    let expected = buffer.expected_len();
    if buffer.channels != 3 || buffer.data.len() != expected {
        return Err(ColorAnalysisError::BufferSize {
            expected,
            actual: buffer.data.len(),
        });
    }

    let mut hue_hist = [0u64; HUE_BUCKETS];
    let mut sat_hist = [0u64; SAT_BUCKETS];
    let mut val_hist = [0u64; VAL_BUCKETS];

    for px in buffer.data.chunks_exact(3) {
        let hsv = rgb_to_hsv(px[0], px[1], px[2]);
        hue_hist[hsv.h as usize] += 1;
        sat_hist[hsv.s as usize] += 1;
        val_hist[hsv.v as usize] += 1;
    }

    let total: u64 = hue_hist.iter().sum();
    if total == 0 {
        return Err(ColorAnalysisError::EmptyHistogram);
    }

    // First bucket wins on ties.
    let dominant_hue = hue_hist
        .iter()
        .enumerate()
        .fold((0usize, 0u64), |best, (bucket, &count)| {
            if count > best.1 { (bucket, count) } else { best }
        })
        .0 as u32;

    // Per-pixel statistics, weighted by bucket counts rather than taken over the bins.
    let hue_mean = histogram_mean(&hue_hist, total);
    let hue_variance = hue_hist
        .iter()
        .enumerate()
        .map(|(bucket, &count)| {
            let d = bucket as f64 - hue_mean;
            d * d * count as f64
        })
        .sum::<f64>()
        / total as f64;
    let average_saturation = histogram_mean(&sat_hist, total);
    let average_value = histogram_mean(&val_hist, total);

    if !(hue_variance.is_finite() && average_saturation.is_finite() && average_value.is_finite())
    {
        return Err(ColorAnalysisError::NonFinite);
    }

    Ok(ColorProfile {
        dominant_hue,
        average_saturation,
        average_value,
        color_uniformity: uniformity_for_variance(hue_variance),
        color_variance: hue_variance,
        maturity_indicator: maturity_for_hue(dominant_hue),
        is_grayscale: false,
    })
}

fn histogram_mean(hist: &[u64], total: u64) -> f64 {
    hist.iter()
        .enumerate()
        .map(|(bucket, &count)| bucket as f64 * count as f64)
        .sum::<f64>()
        / total as f64
}
