use std::cmp::max;
use std::collections::HashMap;
use std::convert::TryFrom;

use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumIter};

use crate::error::{VtfError, VtfResult};

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum ImageFormat {
    RGBA8888 = 0,
    ABGR8888,
    RGB888,
    BGR888,
    RGB565,
    I8,
    IA88,
    P8,
    A8,
    RGB888Bluescreen,
    BGR888Bluescreen,
    ARGB8888,
    BGRA8888,
    DXT1,
    DXT3,
    DXT5,
    BGRX8888,
    BGR565,
    BGRX5551,
    BGRA4444,
    DXT1OneBitAlpha,
    BGRA5551,
    UV88,
    UVWQ8888,
    RGBA16161616F,
    RGBA16161616,
    UVLX8888,
    R32F,
    RGB323232F,
    RGBA32323232F,
    NvDst16,
    NvDst24,
    NvIntz,
    NvRawz,
    AtiDst16,
    AtiDst24,
    NvNull,
    ATI2N,
    ATI1N,
}

/// Raw header value for "no format", used by the thumbnail slot.
pub const IMAGE_FORMAT_NONE: i32 = -1;

impl TryFrom<i32> for ImageFormat {
    type Error = VtfError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|index| ImageFormat::iter().nth(index))
            .ok_or(VtfError::UnknownFormat(value))
    }
}

impl ImageFormat {
    /// Decodes the raw header field, `-1` means there is no format.
    pub fn from_raw(value: u32) -> VtfResult<Option<ImageFormat>> {
        let value = value as i32;
        if value == IMAGE_FORMAT_NONE {
            return Ok(None);
        }
        ImageFormat::try_from(value).map(Some)
    }

    pub fn info(self) -> &'static ImageFormatInfo {
        // Every variant is inserted below.
        &IMAGE_FORMAT_INFO_MAP[&self]
    }

    pub fn is_compressed(self) -> bool {
        self.info().is_compressed()
    }

    pub fn is_supported(self) -> bool {
        self.info().is_supported
    }

    pub fn has_alpha(self) -> bool {
        self.info().alpha_bits_per_pixel() > 0
    }
}

pub enum FormatSizeInfo {
    Pixel {
        red_bits_per_pixel: u8,
        green_bits_per_pixel: u8,
        blue_bits_per_pixel: u8,
        alpha_bits_per_pixel: u8,
        total_bits_per_pixel: u8,
    },
    Block {
        block_width: u8,
        block_height: u8,
        alpha_bits_per_pixel: u8,
        total_bytes_per_block: u8,
    },
}

pub struct ImageFormatInfo {
    pub name: &'static str,
    pub size_info: FormatSizeInfo,
    pub is_supported: bool,
}

impl ImageFormatInfo {
    /// Looks up a raw format value, `NONE` and out of range values fail.
    pub fn for_raw(value: i32) -> VtfResult<&'static ImageFormatInfo> {
        ImageFormat::try_from(value).map(ImageFormat::info)
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.size_info, FormatSizeInfo::Block { .. })
    }

    pub fn bits_per_pixel(&self) -> u32 {
        match self.size_info {
            FormatSizeInfo::Pixel { total_bits_per_pixel, .. } => total_bits_per_pixel as u32,
            FormatSizeInfo::Block {
                block_width,
                block_height,
                total_bytes_per_block,
                ..
            } => total_bytes_per_block as u32 * 8 / (block_width as u32 * block_height as u32),
        }
    }

    /// Zero for block compressed formats.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.size_info {
            FormatSizeInfo::Pixel { total_bits_per_pixel, .. } => total_bits_per_pixel as u32 / 8,
            FormatSizeInfo::Block { .. } => 0,
        }
    }

    pub fn red_bits_per_pixel(&self) -> u32 {
        match self.size_info {
            FormatSizeInfo::Pixel { red_bits_per_pixel, .. } => red_bits_per_pixel as u32,
            FormatSizeInfo::Block { .. } => 0,
        }
    }

    pub fn green_bits_per_pixel(&self) -> u32 {
        match self.size_info {
            FormatSizeInfo::Pixel { green_bits_per_pixel, .. } => green_bits_per_pixel as u32,
            FormatSizeInfo::Block { .. } => 0,
        }
    }

    pub fn blue_bits_per_pixel(&self) -> u32 {
        match self.size_info {
            FormatSizeInfo::Pixel { blue_bits_per_pixel, .. } => blue_bits_per_pixel as u32,
            FormatSizeInfo::Block { .. } => 0,
        }
    }

    pub fn alpha_bits_per_pixel(&self) -> u32 {
        match self.size_info {
            FormatSizeInfo::Pixel { alpha_bits_per_pixel, .. } => alpha_bits_per_pixel as u32,
            FormatSizeInfo::Block { alpha_bits_per_pixel, .. } => alpha_bits_per_pixel as u32,
        }
    }
}

fn pixel(name: &'static str, rgba_bits: [u8; 4], total_bits_per_pixel: u8, is_supported: bool) -> ImageFormatInfo {
    ImageFormatInfo {
        name,
        is_supported,
        size_info: FormatSizeInfo::Pixel {
            red_bits_per_pixel: rgba_bits[0],
            green_bits_per_pixel: rgba_bits[1],
            blue_bits_per_pixel: rgba_bits[2],
            alpha_bits_per_pixel: rgba_bits[3],
            total_bits_per_pixel,
        },
    }
}

fn block(name: &'static str, total_bytes_per_block: u8, alpha_bits_per_pixel: u8) -> ImageFormatInfo {
    ImageFormatInfo {
        name,
        is_supported: true,
        size_info: FormatSizeInfo::Block {
            block_width: 4,
            block_height: 4,
            alpha_bits_per_pixel,
            total_bytes_per_block,
        },
    }
}

lazy_static! {
    static ref IMAGE_FORMAT_INFO_MAP: HashMap<ImageFormat, ImageFormatInfo> = {
        use ImageFormat::*;
        let mut m = HashMap::new();
        m.insert(RGBA8888, pixel("RGBA8888", [8, 8, 8, 8], 32, true));
        m.insert(ABGR8888, pixel("ABGR8888", [8, 8, 8, 8], 32, true));
        m.insert(RGB888, pixel("RGB888", [8, 8, 8, 0], 24, true));
        m.insert(BGR888, pixel("BGR888", [8, 8, 8, 0], 24, true));
        m.insert(RGB565, pixel("RGB565", [5, 6, 5, 0], 16, true));
        m.insert(I8, pixel("I8", [0, 0, 0, 0], 8, true));
        m.insert(IA88, pixel("IA88", [0, 0, 0, 8], 16, true));
        m.insert(P8, pixel("P8", [0, 0, 0, 0], 8, false));
        m.insert(A8, pixel("A8", [0, 0, 0, 8], 8, true));
        m.insert(RGB888Bluescreen, pixel("RGB888 Bluescreen", [8, 8, 8, 0], 24, true));
        m.insert(BGR888Bluescreen, pixel("BGR888 Bluescreen", [8, 8, 8, 0], 24, true));
        m.insert(ARGB8888, pixel("ARGB8888", [8, 8, 8, 8], 32, true));
        m.insert(BGRA8888, pixel("BGRA8888", [8, 8, 8, 8], 32, true));
        m.insert(DXT1, block("DXT1", 8, 0));
        m.insert(DXT3, block("DXT3", 16, 8));
        m.insert(DXT5, block("DXT5", 16, 8));
        m.insert(BGRX8888, pixel("BGRX8888", [8, 8, 8, 0], 32, true));
        m.insert(BGR565, pixel("BGR565", [5, 6, 5, 0], 16, true));
        m.insert(BGRX5551, pixel("BGRX5551", [5, 5, 5, 0], 16, true));
        m.insert(BGRA4444, pixel("BGRA4444", [4, 4, 4, 4], 16, true));
        m.insert(DXT1OneBitAlpha, block("DXT1 One Bit Alpha", 8, 1));
        m.insert(BGRA5551, pixel("BGRA5551", [5, 5, 5, 1], 16, true));
        m.insert(UV88, pixel("UV88", [8, 8, 0, 0], 16, true));
        m.insert(UVWQ8888, pixel("UVWQ8888", [8, 8, 8, 8], 32, true));
        m.insert(RGBA16161616F, pixel("RGBA16161616F", [16, 16, 16, 16], 64, true));
        m.insert(RGBA16161616, pixel("RGBA16161616", [16, 16, 16, 16], 64, true));
        m.insert(UVLX8888, pixel("UVLX8888", [8, 8, 8, 8], 32, true));
        m.insert(R32F, pixel("R32F", [32, 0, 0, 0], 32, true));
        m.insert(RGB323232F, pixel("RGB323232F", [32, 32, 32, 0], 96, true));
        m.insert(RGBA32323232F, pixel("RGBA32323232F", [32, 32, 32, 32], 128, true));
        m.insert(NvDst16, pixel("nVidia DST16", [0, 0, 0, 0], 16, true));
        m.insert(NvDst24, pixel("nVidia DST24", [0, 0, 0, 0], 24, true));
        m.insert(NvIntz, pixel("nVidia INTZ", [0, 0, 0, 0], 32, true));
        m.insert(NvRawz, pixel("nVidia RAWZ", [0, 0, 0, 0], 32, true));
        m.insert(AtiDst16, pixel("ATI DST16", [0, 0, 0, 0], 16, true));
        m.insert(AtiDst24, pixel("ATI DST24", [0, 0, 0, 0], 24, true));
        m.insert(NvNull, pixel("nVidia NULL", [0, 0, 0, 0], 32, true));
        m.insert(ATI2N, block("ATI2N", 16, 0));
        m.insert(ATI1N, block("ATI1N", 8, 0));
        m
    };
}

pub(crate) fn is_image_format_supported(format: ImageFormat) -> bool {
    format.info().is_supported
}

/// Dimensions of a mip level: each level halves, rounding down, never below 1.
pub fn compute_mipmap_dimensions(width: u32, height: u32, depth: u32, level: u32) -> (u32, u32, u32) {
    (
        max(1, width.checked_shr(level).unwrap_or(0)),
        max(1, height.checked_shr(level).unwrap_or(0)),
        max(1, depth.checked_shr(level).unwrap_or(0)),
    )
}

/// Number of levels in a full mip chain down to 1x1x1.
pub fn compute_mipmap_count(width: u32, height: u32, depth: u32) -> u32 {
    let largest = max(width, max(height, depth));
    if largest == 0 {
        return 1;
    }
    32 - largest.leading_zeros()
}

/// Byte size of a single level-0-sized image with the given depth.
pub(crate) fn calculate_image_size(width: u32, height: u32, depth: u32, format: ImageFormat) -> usize {
    checked_image_size(width, height, depth, format).unwrap_or(usize::MAX)
}

/// Byte size of an image, `None` when it does not fit in `usize`.
pub(crate) fn checked_image_size(width: u32, height: u32, depth: u32, format: ImageFormat) -> Option<usize> {
    let info = format.info();
    let (width, height, depth) = (width as usize, height as usize, depth as usize);
    match info.size_info {
        FormatSizeInfo::Pixel {
            total_bits_per_pixel,
            ..
        } => (total_bits_per_pixel as usize / 8)
            .checked_mul(width)?
            .checked_mul(height)?
            .checked_mul(depth),
        FormatSizeInfo::Block {
            block_width,
            block_height,
            total_bytes_per_block,
            ..
        } => width
            .div_ceil(block_width as usize)
            .checked_mul(height.div_ceil(block_height as usize))?
            .checked_mul(total_bytes_per_block as usize)?
            .checked_mul(depth)
    }
}

/// Byte size of one mip level, every slice of that level included.
pub fn compute_mipmap_size(width: u32, height: u32, depth: u32, level: u32, format: ImageFormat) -> usize {
    let (mip_width, mip_height, mip_depth) = compute_mipmap_dimensions(width, height, depth, level);
    calculate_image_size(mip_width, mip_height, mip_depth, format)
}

/// Byte size of the first `mipmap_count` levels of an image.
pub fn compute_image_size(width: u32, height: u32, depth: u32, mipmap_count: u32, format: ImageFormat) -> usize {
    (0..mipmap_count)
        .map(|level| compute_mipmap_size(width, height, depth, level, format))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::{EnumCount, IntoEnumIterator};

    #[rstest]
    #[case(1, 1, 1)]
    #[case(256, 256, 9)]
    #[case(255, 255, 8)]
    #[case(300, 1, 9)]
    #[case(64, 64, 7)]
    #[case(1, 1024, 11)]
    fn mipmap_count(#[case] width: u32, #[case] height: u32, #[case] expected: u32) {
        assert_eq!(compute_mipmap_count(width, height, 1), expected);
    }

    #[test]
    fn depth_counts_towards_mipmap_count() {
        assert_eq!(compute_mipmap_count(4, 4, 32), 6);
    }

    #[rstest]
    #[case(ImageFormat::RGBA8888, 64)]
    #[case(ImageFormat::DXT1, 8)]
    #[case(ImageFormat::DXT5, 16)]
    #[case(ImageFormat::RGB565, 32)]
    #[case(ImageFormat::RGBA32323232F, 256)]
    fn single_4x4_level(#[case] format: ImageFormat, #[case] expected: usize) {
        assert_eq!(compute_image_size(4, 4, 1, 1, format), expected);
    }

    #[test]
    fn block_formats_round_up() {
        assert_eq!(compute_image_size(1, 1, 1, 1, ImageFormat::DXT1), 8);
        assert_eq!(compute_image_size(5, 6, 1, 1, ImageFormat::DXT3), 4 * 16);
        // 8x8, 4x4, 2x2 and 1x1 levels all take at least one block
        assert_eq!(compute_image_size(8, 8, 1, 4, ImageFormat::DXT1), 4 * 8 + 8 + 8 + 8);
    }

    #[test]
    fn full_chain_size() {
        let expected = (256 * 256 + 128 * 128 + 64 * 64 + 32 * 32 + 16 * 16 + 8 * 8 + 4 * 4 + 2 * 2 + 1) * 4;
        assert_eq!(compute_image_size(256, 256, 1, 9, ImageFormat::RGBA8888), expected);
    }

    #[test]
    fn volume_levels_shrink_in_depth() {
        assert_eq!(compute_mipmap_dimensions(16, 8, 4, 3), (2, 1, 1));
        assert_eq!(compute_mipmap_size(16, 8, 4, 1, ImageFormat::I8), 8 * 4 * 2);
    }

    #[test]
    fn raw_values() {
        assert_eq!(ImageFormat::try_from(0).unwrap(), ImageFormat::RGBA8888);
        assert_eq!(ImageFormat::try_from(37).unwrap(), ImageFormat::ATI2N);
        assert_eq!(ImageFormat::try_from(38).unwrap(), ImageFormat::ATI1N);
        assert!(matches!(ImageFormat::try_from(39), Err(VtfError::UnknownFormat(39))));
        assert!(matches!(ImageFormatInfo::for_raw(-1), Err(VtfError::UnknownFormat(-1))));
        assert_eq!(ImageFormat::from_raw(u32::MAX).unwrap(), None);
    }

    #[test]
    fn table_matches_enum() {
        assert_eq!(ImageFormat::iter().count(), ImageFormat::COUNT);
        for (index, format) in ImageFormat::iter().enumerate() {
            assert_eq!(format as usize, index);
            assert_eq!(ImageFormat::try_from(index as i32).unwrap(), format);
            let info = format.info();
            assert!(!info.name.is_empty());
            if !info.is_compressed() {
                assert_eq!(info.bits_per_pixel() % 8, 0);
            }
        }
        assert!(!ImageFormat::P8.is_supported());
        assert_eq!(ImageFormat::DXT1.info().bits_per_pixel(), 4);
        assert_eq!(ImageFormat::DXT5.info().bits_per_pixel(), 8);
        assert_eq!(ImageFormat::BGRA5551.info().alpha_bits_per_pixel(), 1);
    }
}
