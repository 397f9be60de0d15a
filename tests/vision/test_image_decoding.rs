// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image decoding tests over real encoded bytes

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use paddle_ocr_server::vision::{decode_image_bytes, DecodeError, PixelBuffer};
use std::io::Cursor;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

#[test]
fn test_png_decodes_to_bgr() {
    let img = RgbImage::from_pixel(5, 3, Rgb([10, 20, 30]));
    let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

    let (buffer, info) = decode_image_bytes(&bytes).unwrap();

    assert_eq!(buffer.shape(), (3, 5, 3));
    assert_eq!(buffer.pixel(0, 0), Some([30, 20, 10]));
    assert_eq!(info.format, ImageFormat::Png);
    assert_eq!(info.size_bytes, bytes.len());
}

#[test]
fn test_alpha_is_dropped() {
    let img = RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 0]));
    let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

    let (buffer, _) = decode_image_bytes(&bytes).unwrap();

    assert_eq!(buffer.channels(), 3);
    assert_eq!(buffer.as_bytes().len(), 4 * 4 * 3);
    assert_eq!(buffer.pixel(3, 3), Some([50, 100, 200]));
}

#[test]
fn test_grayscale_expands_to_three_channels() {
    let img = GrayImage::from_pixel(6, 2, Luma([128]));
    let bytes = encode(DynamicImage::ImageLuma8(img), ImageFormat::Png);

    let (buffer, _) = decode_image_bytes(&bytes).unwrap();

    assert_eq!(buffer.shape(), (2, 6, 3));
    assert_eq!(buffer.pixel(5, 1), Some([128, 128, 128]));
}

#[test]
fn test_jpeg_decodes_with_positive_dimensions() {
    let img = RgbImage::from_pixel(33, 17, Rgb([240, 240, 240]));
    let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);

    let (buffer, info) = decode_image_bytes(&bytes).unwrap();

    assert_eq!((buffer.width(), buffer.height()), (33, 17));
    assert_eq!(info.format, ImageFormat::Jpeg);
}

#[test]
fn test_empty_and_garbage_are_errors() {
    assert!(matches!(decode_image_bytes(&[]), Err(DecodeError::Empty)));
    assert!(matches!(
        decode_image_bytes(b"hello, world"),
        Err(DecodeError::UnsupportedFormat)
    ));
}

#[test]
fn test_png_signature_with_garbage_body() {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0xAB; 64]);

    assert!(decode_image_bytes(&bytes).is_err());
}

#[test]
fn test_pixel_buffer_round_trips_through_rgb() {
    let img = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8 * 40, y as u8 * 90, 7]));
    let buffer = PixelBuffer::from_dynamic_image(&DynamicImage::ImageRgb8(img.clone())).unwrap();

    assert_eq!(buffer.to_rgb_image(), img);
}
