//! Mip chain generation.
//!
//! Each level is resampled from the level before it, using an RGBA8888 working
//! copy so that block compressed formats are only quantized once per level.

use log::trace;

use crate::convert::ConvertOptions;
use crate::error::{check_len, VtfResult};
use crate::image_format::compute_mipmap_dimensions;
use crate::texture_data::TextureData;
use crate::transform::{resize_with, MipmapFilter, SharpenFilter, SharpenOptions};

/// Builds levels `1..count` of a 2D RGBA8888 image. Level 0 is not part of the result.
pub fn generate_mip_chain(
    rgba: &[u8],
    width: u32,
    height: u32,
    count: u32,
    filter: MipmapFilter,
    sharpen: SharpenFilter,
) -> VtfResult<Vec<Vec<u8>>> {
    generate_mip_chain_with(rgba, width, height, count, filter, sharpen, &SharpenOptions::default())
}

pub fn generate_mip_chain_with(
    rgba: &[u8],
    width: u32,
    height: u32,
    count: u32,
    filter: MipmapFilter,
    sharpen: SharpenFilter,
    options: &SharpenOptions,
) -> VtfResult<Vec<Vec<u8>>> {
    check_len(rgba, width as usize * height as usize * 4)?;
    let mut levels: Vec<Vec<u8>> = Vec::with_capacity(count.saturating_sub(1) as usize);
    for level in 1..count {
        let (previous_width, previous_height, _) = compute_mipmap_dimensions(width, height, 1, level - 1);
        let (level_width, level_height, _) = compute_mipmap_dimensions(width, height, 1, level);
        let previous = levels.last().map(Vec::as_slice).unwrap_or(rgba);
        let resized = resize_with(
            previous,
            previous_width,
            previous_height,
            level_width,
            level_height,
            filter,
            sharpen,
            options,
        )?;
        levels.push(resized);
    }
    Ok(levels)
}

/// Box average of two slices along Z.
fn average_slices(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(a, b)| ((*a as u16 + *b as u16 + 1) / 2) as u8).collect()
}

/// Regenerates every level below the base level of one frame and face.
pub(crate) fn generate_mipmaps(
    data: &mut TextureData,
    frame: u32,
    face: u32,
    filter: MipmapFilter,
    sharpen: SharpenFilter,
    convert_options: &ConvertOptions,
    sharpen_options: &SharpenOptions,
) -> VtfResult<()> {
    let layout = *data.layout();
    layout.check_cell(frame, face, 0, 0)?;

    let mut previous = Vec::with_capacity(layout.depth as usize);
    for slice in 0..layout.slice_count(0) {
        previous.push(data.cell_rgba8888(frame, face, slice, 0, convert_options)?);
    }

    for level in 1..layout.mipmap_count {
        let (previous_width, previous_height, _) = layout.mip_dimensions(level - 1);
        let (width, height, depth) = layout.mip_dimensions(level);

        let mut resized = Vec::with_capacity(previous.len());
        for slice in &previous {
            resized.push(resize_with(
                slice,
                previous_width,
                previous_height,
                width,
                height,
                filter,
                sharpen,
                sharpen_options,
            )?);
        }

        let mut slices = Vec::with_capacity(depth as usize);
        for slice in 0..depth as usize {
            let first = &resized[(slice * 2).min(resized.len() - 1)];
            slices.push(match resized.get(slice * 2 + 1) {
                Some(second) => average_slices(first, second),
                None => first.clone(),
            });
        }

        for (slice, rgba) in slices.iter().enumerate() {
            data.set_cell_rgba8888(frame, face, slice as u32, level, rgba, convert_options)?;
        }
        trace!(
            "generated mip level {} ({}x{}x{}) of frame {} face {}",
            level,
            width,
            height,
            depth,
            frame,
            face
        );
        previous = slices;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_format::ImageFormat;
    use crate::texture_data::TextureLayout;
    use rstest::rstest;

    #[rstest]
    #[case(MipmapFilter::Box)]
    #[case(MipmapFilter::Point)]
    #[case(MipmapFilter::Triangle)]
    #[case(MipmapFilter::Kaiser)]
    fn solid_colour_chain(#[case] filter: MipmapFilter) {
        let rgba: Vec<u8> = [31u8, 64, 250, 128].iter().copied().cycle().take(256 * 256 * 4).collect();
        let levels = generate_mip_chain(&rgba, 256, 256, 9, filter, SharpenFilter::None).unwrap();
        assert_eq!(levels.len(), 8);
        for (index, level) in levels.iter().enumerate() {
            let size = 256usize >> (index + 1);
            assert_eq!(level.len(), size * size * 4);
            assert!(level.chunks_exact(4).all(|pixel| pixel == [31, 64, 250, 128]));
        }
    }

    #[test]
    fn non_square_chain_reaches_one_pixel() {
        let rgba = vec![200u8; 8 * 2 * 4];
        let levels = generate_mip_chain(&rgba, 8, 2, 4, MipmapFilter::Box, SharpenFilter::None).unwrap();
        let sizes: Vec<usize> = levels.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4 * 1 * 4, 2 * 1 * 4, 1 * 1 * 4]);
    }

    #[test]
    fn volume_slices_are_averaged() {
        let layout = TextureLayout::new(2, 2, ImageFormat::RGBA8888).with_depth(2);
        let mut data = TextureData::new_zeroed(layout).unwrap();
        data.cell_mut(0, 0, 0, 0).unwrap().copy_from_slice(&[100u8; 16]);
        data.cell_mut(0, 0, 1, 0).unwrap().copy_from_slice(&[200u8; 16]);
        generate_mipmaps(
            &mut data,
            0,
            0,
            MipmapFilter::Box,
            SharpenFilter::None,
            &ConvertOptions::default(),
            &SharpenOptions::default(),
        )
        .unwrap();
        assert_eq!(data.cell(0, 0, 0, 1).unwrap(), &[150u8; 4]);
    }

    #[test]
    fn block_format_levels() {
        let layout = TextureLayout::new(16, 16, ImageFormat::DXT1);
        let mut data = TextureData::new_zeroed(layout).unwrap();
        let white = vec![255u8; 16 * 16 * 4];
        data.set_cell_rgba8888(0, 0, 0, 0, &white, &ConvertOptions::default()).unwrap();
        generate_mipmaps(
            &mut data,
            0,
            0,
            MipmapFilter::Box,
            SharpenFilter::None,
            &ConvertOptions::default(),
            &SharpenOptions::default(),
        )
        .unwrap();
        let level = data.cell_rgba8888(0, 0, 0, 4, &ConvertOptions::default()).unwrap();
        assert_eq!(level, vec![255u8; 4]);
    }
}
