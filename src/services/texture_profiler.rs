// src/services/texture_profiler.rs
use crate::models::{PixelBuffer, TextureClass, TextureProfile};

const MEDIUM_VARIANCE: f64 = 100.0;
const ROUGH_VARIANCE: f64 = 500.0;

pub struct TextureProfiler;

impl TextureProfiler {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, buffer: &PixelBuffer) -> TextureProfile {
        let intensity = to_intensity(buffer);
        let variance =
            laplacian_variance(&intensity, buffer.width as usize, buffer.height as usize);

        TextureProfile {
            texture_type: classify(variance),
            smoothness_score: smoothness(variance),
            laplacian_variance: variance,
        }
    }
}

pub fn classify(variance: f64) -> TextureClass {
    if variance < MEDIUM_VARIANCE {
        TextureClass::Smooth
    } else if variance < ROUGH_VARIANCE {
        TextureClass::Medium
    } else {
        TextureClass::Rough
    }
}

pub fn smoothness(variance: f64) -> f64 {
    let score = 1.0 - variance / 1000.0;
    if score.is_nan() {
        return 0.1;
    }
    score.clamp(0.1, 1.0)
}

fn to_intensity(buffer: &PixelBuffer) -> Vec<f64> {
    if buffer.is_grayscale() {
        return buffer.data.iter().map(|&v| v as f64).collect();
    }
    buffer
        .data
        .chunks_exact(buffer.channels.max(1) as usize)
        .map(|px| match px {
            [r, g, b, ..] => (0.299 * *r as f64 + 0.587 * *g as f64 + 0.114 * *b as f64).round(),
            [v, ..] => *v as f64,
            [] => 0.0,
        })
        .collect()
}

/// Index into `[0, n)` mirroring at the edge without repeating it (`dcb|abcd|cba`).
fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let last = n as isize - 1;
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i > last {
        i = 2 * last - i;
    }
    i as usize
}

/// Population variance of the 4-neighbour Laplacian response.
fn laplacian_variance(intensity: &[f64], width: usize, height: usize) -> f64 {
    if width == 0 || height == 0 || intensity.len() < width * height {
        return 0.0;
    }

    let at = |x: isize, y: isize| {
        intensity[reflect_101(y, height) * width + reflect_101(x, width)]
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..height as isize {
        for x in 0..width as isize {
            let response =
                at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let n = (width * height) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
