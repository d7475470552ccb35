//! Pixel format conversion. Every path goes through tightly packed RGBA8888.

mod pixel;
mod s3tc;

use crate::error::{check_len, VtfError, VtfResult};
use crate::image_format::{calculate_image_size, is_image_format_supported, ImageFormat};

pub use self::s3tc::DxtQuality;

/// Tunables that affect how formats without a direct RGBA8888 mapping are converted.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvertOptions {
    /// Weights used to collapse RGB into the I8 and IA88 intensity channel.
    pub luminance_weights: [f32; 3],
    /// Colour that marks a transparent pixel in the bluescreen formats.
    pub bluescreen_mask: [u8; 3],
    /// Colour written for transparent pixels decoded from the bluescreen formats.
    pub bluescreen_clear: [u8; 3],
    pub fp16_hdr_key: f32,
    pub fp16_hdr_shift: f32,
    pub fp16_hdr_gamma: f32,
    pub dxt_quality: DxtQuality,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            luminance_weights: [0.299, 0.587, 0.114],
            bluescreen_mask: [0, 0, 255],
            bluescreen_clear: [0, 0, 0],
            fp16_hdr_key: 4.0,
            fp16_hdr_shift: 0.0,
            fp16_hdr_gamma: 2.25,
            dxt_quality: DxtQuality::High,
        }
    }
}

fn check_format(format: ImageFormat) -> VtfResult<()> {
    if !is_image_format_supported(format) {
        return Err(VtfError::UnsupportedFormat(format));
    }
    Ok(())
}

fn is_block_format(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::DXT1
            | ImageFormat::DXT1OneBitAlpha
            | ImageFormat::DXT3
            | ImageFormat::DXT5
            | ImageFormat::ATI1N
            | ImageFormat::ATI2N
    )
}

pub fn to_rgba8888(src: &[u8], width: u32, height: u32, src_format: ImageFormat) -> VtfResult<Vec<u8>> {
    to_rgba8888_with(src, width, height, src_format, &ConvertOptions::default())
}

pub fn to_rgba8888_with(
    src: &[u8],
    width: u32,
    height: u32,
    src_format: ImageFormat,
    options: &ConvertOptions,
) -> VtfResult<Vec<u8>> {
    check_format(src_format)?;
    let src_size = calculate_image_size(width, height, 1, src_format);
    check_len(src, src_size)?;
    let src = &src[..src_size];
    let mut dst = vec![0u8; width as usize * height as usize * 4];

    if src_format == ImageFormat::RGBA8888 {
        dst.copy_from_slice(src);
    } else if is_block_format(src_format) {
        s3tc::decode(src, &mut dst, width, height, src_format);
    } else if !pixel::decode(src, &mut dst, src_format, options) {
        return Err(VtfError::UnsupportedConversion {
            from: src_format,
            to: ImageFormat::RGBA8888,
        });
    }
    Ok(dst)
}

pub fn from_rgba8888(src: &[u8], width: u32, height: u32, dst_format: ImageFormat) -> VtfResult<Vec<u8>> {
    from_rgba8888_with(src, width, height, dst_format, &ConvertOptions::default())
}

pub fn from_rgba8888_with(
    src: &[u8],
    width: u32,
    height: u32,
    dst_format: ImageFormat,
    options: &ConvertOptions,
) -> VtfResult<Vec<u8>> {
    check_format(dst_format)?;
    let src_size = width as usize * height as usize * 4;
    check_len(src, src_size)?;
    let src = &src[..src_size];
    let mut dst = vec![0u8; calculate_image_size(width, height, 1, dst_format)];

    if dst_format == ImageFormat::RGBA8888 {
        dst.copy_from_slice(src);
    } else if is_block_format(dst_format) {
        s3tc::encode(src, &mut dst, width, height, dst_format, options.dxt_quality);
    } else if !pixel::encode(src, &mut dst, dst_format, options) {
        return Err(VtfError::UnsupportedConversion {
            from: ImageFormat::RGBA8888,
            to: dst_format,
        });
    }
    Ok(dst)
}

pub fn convert(
    src: &[u8],
    width: u32,
    height: u32,
    src_format: ImageFormat,
    dst_format: ImageFormat,
) -> VtfResult<Vec<u8>> {
    convert_with(src, width, height, src_format, dst_format, &ConvertOptions::default())
}

pub fn convert_with(
    src: &[u8],
    width: u32,
    height: u32,
    src_format: ImageFormat,
    dst_format: ImageFormat,
    options: &ConvertOptions,
) -> VtfResult<Vec<u8>> {
    check_format(src_format)?;
    check_format(dst_format)?;
    if src_format == dst_format {
        let size = calculate_image_size(width, height, 1, src_format);
        check_len(src, size)?;
        return Ok(src[..size].to_vec());
    }
    let rgba = to_rgba8888_with(src, width, height, src_format, options)?;
    from_rgba8888_with(&rgba, width, height, dst_format, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn test_pattern(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x * 37 + y * 11) as u8);
                data.push((x * 5 + y * 73) as u8);
                data.push((x * 101 + y * 3) as u8);
                data.push((255 - x * 9 - y) as u8);
            }
        }
        data
    }

    fn max_delta(a: &[u8], b: &[u8], channels: std::ops::Range<usize>) -> u8 {
        a.chunks_exact(4)
            .zip(b.chunks_exact(4))
            .flat_map(|(a, b)| channels.clone().map(move |c| a[c].abs_diff(b[c])))
            .max()
            .unwrap_or(0)
    }

    #[rstest]
    #[case(ImageFormat::RGBA8888)]
    #[case(ImageFormat::ABGR8888)]
    #[case(ImageFormat::ARGB8888)]
    #[case(ImageFormat::BGRA8888)]
    #[case(ImageFormat::UVWQ8888)]
    #[case(ImageFormat::UVLX8888)]
    #[case(ImageFormat::RGBA16161616)]
    fn lossless_with_alpha(#[case] format: ImageFormat) {
        let rgba = test_pattern(7, 5);
        let encoded = from_rgba8888(&rgba, 7, 5, format).unwrap();
        assert_eq!(encoded.len(), calculate_image_size(7, 5, 1, format));
        let decoded = to_rgba8888(&encoded, 7, 5, format).unwrap();
        assert_eq!(decoded, rgba);
        let reencoded = from_rgba8888(&decoded, 7, 5, format).unwrap();
        assert_eq!(reencoded, encoded);
    }

    #[rstest]
    #[case(ImageFormat::RGB888)]
    #[case(ImageFormat::BGR888)]
    #[case(ImageFormat::BGRX8888)]
    fn lossless_colour(#[case] format: ImageFormat) {
        let rgba = test_pattern(6, 6);
        let encoded = from_rgba8888(&rgba, 6, 6, format).unwrap();
        let decoded = to_rgba8888(&encoded, 6, 6, format).unwrap();
        assert_eq!(max_delta(&rgba, &decoded, 0..3), 0);
        assert!(decoded.chunks_exact(4).all(|p| p[3] == 255));
        assert_eq!(from_rgba8888(&decoded, 6, 6, format).unwrap(), encoded);
    }

    #[rstest]
    #[case(ImageFormat::RGB565, 8)]
    #[case(ImageFormat::BGR565, 8)]
    #[case(ImageFormat::BGRX5551, 8)]
    #[case(ImageFormat::BGRA5551, 8)]
    #[case(ImageFormat::BGRA4444, 17)]
    fn packed_error_is_bounded(#[case] format: ImageFormat, #[case] step: u8) {
        let rgba = test_pattern(9, 3);
        let encoded = from_rgba8888(&rgba, 9, 3, format).unwrap();
        let decoded = to_rgba8888(&encoded, 9, 3, format).unwrap();
        assert!(max_delta(&rgba, &decoded, 0..3) <= step);
        // the quantized image is a fixed point
        assert_eq!(from_rgba8888(&decoded, 9, 3, format).unwrap(), encoded);
    }

    #[test]
    fn rgb565_channel_positions() {
        let red = [255u8, 0, 0, 255];
        assert_eq!(from_rgba8888(&red, 1, 1, ImageFormat::RGB565).unwrap(), vec![0x1f, 0x00]);
        assert_eq!(from_rgba8888(&red, 1, 1, ImageFormat::BGR565).unwrap(), vec![0x00, 0xf8]);
        let decoded = to_rgba8888(&[0x00, 0xf8], 1, 1, ImageFormat::BGR565).unwrap();
        assert_eq!(decoded, red.to_vec());
    }

    #[test]
    fn byte_orders() {
        let pixel = [1u8, 2, 3, 4];
        assert_eq!(from_rgba8888(&pixel, 1, 1, ImageFormat::BGRA8888).unwrap(), vec![3, 2, 1, 4]);
        assert_eq!(from_rgba8888(&pixel, 1, 1, ImageFormat::ABGR8888).unwrap(), vec![4, 3, 2, 1]);
        assert_eq!(from_rgba8888(&pixel, 1, 1, ImageFormat::ARGB8888).unwrap(), vec![4, 1, 2, 3]);
        assert_eq!(from_rgba8888(&pixel, 1, 1, ImageFormat::BGR888).unwrap(), vec![3, 2, 1]);
        assert_eq!(from_rgba8888(&pixel, 1, 1, ImageFormat::UV88).unwrap(), vec![1, 2]);
        assert_eq!(from_rgba8888(&pixel, 1, 1, ImageFormat::A8).unwrap(), vec![4]);
        assert_eq!(to_rgba8888(&[9], 1, 1, ImageFormat::A8).unwrap(), vec![0, 0, 0, 9]);
    }

    #[test]
    fn luminance() {
        let grey = [80u8, 80, 80, 10];
        assert_eq!(from_rgba8888(&grey, 1, 1, ImageFormat::I8).unwrap(), vec![80]);
        assert_eq!(from_rgba8888(&grey, 1, 1, ImageFormat::IA88).unwrap(), vec![80, 10]);
        assert_eq!(to_rgba8888(&[80, 10], 1, 1, ImageFormat::IA88).unwrap(), grey.to_vec());
        let red = [255u8, 0, 0, 255];
        assert_eq!(from_rgba8888(&red, 1, 1, ImageFormat::I8).unwrap(), vec![76]);
    }

    #[test]
    fn bluescreen_keys_alpha() {
        let pixels = [10u8, 20, 30, 255, 99, 99, 99, 0];
        let encoded = from_rgba8888(&pixels, 2, 1, ImageFormat::RGB888Bluescreen).unwrap();
        assert_eq!(encoded, vec![10, 20, 30, 0, 0, 255]);
        let decoded = to_rgba8888(&encoded, 2, 1, ImageFormat::RGB888Bluescreen).unwrap();
        assert_eq!(decoded, vec![10, 20, 30, 255, 0, 0, 0, 0]);

        let encoded = from_rgba8888(&pixels, 2, 1, ImageFormat::BGR888Bluescreen).unwrap();
        assert_eq!(encoded, vec![30, 20, 10, 255, 0, 0]);
    }

    #[test]
    fn float_formats() {
        let rgba = test_pattern(4, 2);
        for format in [ImageFormat::RGBA32323232F, ImageFormat::RGB323232F, ImageFormat::R32F] {
            let encoded = from_rgba8888(&rgba, 4, 2, format).unwrap();
            let decoded = to_rgba8888(&encoded, 4, 2, format).unwrap();
            assert_eq!(decoded[0], rgba[0]);
            assert_eq!(decoded[4], rgba[4]);
        }
        let encoded = from_rgba8888(&rgba, 4, 2, ImageFormat::RGBA16161616F).unwrap();
        let decoded = to_rgba8888(&encoded, 4, 2, ImageFormat::RGBA16161616F).unwrap();
        assert!(max_delta(&rgba, &decoded, 0..4) <= 2);
    }

    #[rstest]
    #[case(ImageFormat::DXT1, 8, false)]
    #[case(ImageFormat::DXT1OneBitAlpha, 8, false)]
    #[case(ImageFormat::DXT3, 8, true)]
    #[case(ImageFormat::DXT5, 8, true)]
    fn block_formats_on_solid_colour(#[case] format: ImageFormat, #[case] step: u8, #[case] keeps_alpha: bool) {
        let rgba: Vec<u8> = [200u8, 100, 50, 255].iter().copied().cycle().take(8 * 8 * 4).collect();
        let encoded = from_rgba8888(&rgba, 8, 8, format).unwrap();
        assert_eq!(encoded.len(), calculate_image_size(8, 8, 1, format));
        let decoded = to_rgba8888(&encoded, 8, 8, format).unwrap();
        assert!(max_delta(&rgba, &decoded, 0..3) <= step);
        if keeps_alpha {
            assert!(max_delta(&rgba, &decoded, 3..4) == 0);
        }
    }

    /// Colour mostly changes along x inside a block, alpha ramps across the image.
    fn block_gradient() -> Vec<u8> {
        let mut data = Vec::with_capacity(16 * 16 * 4);
        for y in 0..16u32 {
            for x in 0..16u32 {
                data.push((x * 15 + y) as u8);
                data.push((x * 8 + y * 2 + 40) as u8);
                data.push((200 - x * 10) as u8);
                data.push((x * 12 + y * 4) as u8);
            }
        }
        data
    }

    #[rstest]
    #[case(ImageFormat::DXT1, 0..3, 24, None)]
    #[case(ImageFormat::DXT3, 0..3, 24, Some(9))]
    #[case(ImageFormat::DXT5, 0..3, 24, Some(8))]
    #[case(ImageFormat::ATI1N, 0..1, 8, None)]
    #[case(ImageFormat::ATI2N, 0..2, 8, None)]
    fn block_formats_on_gradient(
        #[case] format: ImageFormat,
        #[case] channels: std::ops::Range<usize>,
        #[case] colour_bound: u8,
        #[case] alpha_bound: Option<u8>,
    ) {
        let rgba = block_gradient();
        let encoded = from_rgba8888(&rgba, 16, 16, format).unwrap();
        let decoded = to_rgba8888(&encoded, 16, 16, format).unwrap();
        let colour = max_delta(&rgba, &decoded, channels);
        assert!(colour <= colour_bound, "{:?} colour error {}", format, colour);
        match alpha_bound {
            Some(bound) => {
                let alpha = max_delta(&rgba, &decoded, 3..4);
                assert!(alpha <= bound, "{:?} alpha error {}", format, alpha);
            }
            None => assert!(decoded.chunks_exact(4).all(|p| p[3] == 255)),
        }
    }

    #[test]
    fn one_bit_alpha_on_gradient() {
        let rgba = block_gradient();
        let encoded = from_rgba8888(&rgba, 16, 16, ImageFormat::DXT1OneBitAlpha).unwrap();
        let decoded = to_rgba8888(&encoded, 16, 16, ImageFormat::DXT1OneBitAlpha).unwrap();
        for (source, pixel) in rgba.chunks_exact(4).zip(decoded.chunks_exact(4)) {
            if source[3] < 128 {
                assert_eq!(pixel[3], 0);
            } else {
                assert_eq!(pixel[3], 255);
                let error = (0..3).map(|c| source[c].abs_diff(pixel[c])).max().unwrap_or(0);
                assert!(error <= 24, "colour error {} at {:?}", error, source);
            }
        }
    }

    #[test]
    fn odd_dimensions_are_padded() {
        let rgba = test_pattern(5, 3);
        let encoded = from_rgba8888(&rgba, 5, 3, ImageFormat::DXT5).unwrap();
        assert_eq!(encoded.len(), 2 * 16);
        let decoded = to_rgba8888(&encoded, 5, 3, ImageFormat::DXT5).unwrap();
        assert_eq!(decoded.len(), rgba.len());
    }

    #[test]
    fn unsupported_formats() {
        let rgba = [0u8; 4];
        assert!(matches!(
            from_rgba8888(&rgba, 1, 1, ImageFormat::P8),
            Err(VtfError::UnsupportedFormat(ImageFormat::P8))
        ));
        assert!(matches!(
            from_rgba8888(&rgba, 1, 1, ImageFormat::NvIntz),
            Err(VtfError::UnsupportedConversion { .. })
        ));
        assert!(matches!(
            to_rgba8888(&[0u8; 3], 1, 1, ImageFormat::RGBA8888),
            Err(VtfError::BufferSize { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn convert_between_formats() {
        let rgba = test_pattern(4, 4);
        let bgra = convert(&rgba, 4, 4, ImageFormat::RGBA8888, ImageFormat::BGRA8888).unwrap();
        let abgr = convert(&bgra, 4, 4, ImageFormat::BGRA8888, ImageFormat::ABGR8888).unwrap();
        assert_eq!(to_rgba8888(&abgr, 4, 4, ImageFormat::ABGR8888).unwrap(), rgba);
        let same = convert(&bgra, 4, 4, ImageFormat::BGRA8888, ImageFormat::BGRA8888).unwrap();
        assert_eq!(same, bgra);
    }
}
