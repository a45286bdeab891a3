// src/test_support.rs
use crate::models::PixelBuffer;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use std::io::Cursor;

fn encode_png(img: DynamicImage) -> Vec<u8> {
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .expect("PNG encoding of a test fixture");
    output
}

pub fn encode_png_rgb<F>(width: u32, height: u32, pixel: F) -> Vec<u8>
where
    F: Fn(u32, u32) -> [u8; 3],
{
    encode_png(DynamicImage::ImageRgb8(RgbImage::from_fn(
        width,
        height,
        |x, y| Rgb(pixel(x, y)),
    )))
}

pub fn encode_png_gray<F>(width: u32, height: u32, pixel: F) -> Vec<u8>
where
    F: Fn(u32, u32) -> u8,
{
    encode_png(DynamicImage::ImageLuma8(GrayImage::from_fn(
        width,
        height,
        |x, y| Luma([pixel(x, y)]),
    )))
}

pub fn rgb_buffer<F>(width: u32, height: u32, pixel: F) -> PixelBuffer
where
    F: Fn(u32, u32) -> [u8; 3],
{
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&pixel(x, y));
        }
    }
    PixelBuffer {
        width,
        height,
        channels: 3,
        data,
    }
}

pub fn gray_buffer(width: u32, height: u32, value: u8) -> PixelBuffer {
    PixelBuffer {
        width,
        height,
        channels: 1,
        data: vec![value; (width * height) as usize],
    }
}

/// Deterministic pseudo-noise so texture and defect-count tests have real variance.
pub fn noise(x: u32, y: u32) -> u8 {
    let h = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
    (h.wrapping_mul(2_654_435_761) >> 24) as u8
}
