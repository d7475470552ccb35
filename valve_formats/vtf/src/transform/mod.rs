//! Operations on tightly packed RGBA8888 buffers.

mod resample;
mod sharpen;

use crate::error::{check_len, VtfError, VtfResult};

pub use self::resample::{resize, resize_with, MipmapFilter};
pub use self::sharpen::{sharpen, SharpenFilter, SharpenOptions};

/// How the create pipeline picks the size of a resized image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResizeMethod {
    NearestPowerTwo,
    #[default]
    BiggestPowerTwo,
    SmallestPowerTwo,
    /// Use the explicitly requested width and height.
    Set,
}

fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Reverses the row order in place.
pub fn flip(buffer: &mut [u8], width: u32, height: u32) -> VtfResult<()> {
    let len = rgba_len(width, height);
    check_len(buffer, len)?;
    let row = width as usize * 4;
    let rows = height as usize;
    for y in 0..rows / 2 {
        let (top, bottom) = buffer[..len].split_at_mut((rows - 1 - y) * row);
        top[y * row..(y + 1) * row].swap_with_slice(&mut bottom[..row]);
    }
    Ok(())
}

/// Reverses the column order in place.
pub fn mirror(buffer: &mut [u8], width: u32, height: u32) -> VtfResult<()> {
    let len = rgba_len(width, height);
    check_len(buffer, len)?;
    let columns = width as usize;
    for row in buffer[..len].chunks_exact_mut(columns * 4) {
        for x in 0..columns / 2 {
            let (left, right) = row.split_at_mut((columns - 1 - x) * 4);
            left[x * 4..x * 4 + 4].swap_with_slice(&mut right[..4]);
        }
    }
    Ok(())
}

/// Applies `out = (in / 255) ^ (1 / gamma)` to the colour channels.
pub fn correct_gamma(buffer: &mut [u8], width: u32, height: u32, gamma: f32) -> VtfResult<()> {
    if gamma.is_nan() || gamma <= 0.0 {
        return Err(VtfError::InvalidParameters(format!("gamma must be positive, got {}", gamma)));
    }
    let len = rgba_len(width, height);
    check_len(buffer, len)?;

    let mut table = [0u8; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        let corrected = (value as f32 / 255.0).powf(1.0 / gamma) * 255.0;
        *entry = corrected.round().clamp(0.0, 255.0) as u8;
    }
    for pixel in buffer[..len].chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            *channel = table[*channel as usize];
        }
    }
    Ok(())
}

/// Average colour of the image, each channel in 0..1.
pub fn compute_reflectivity(buffer: &[u8], width: u32, height: u32) -> VtfResult<[f32; 3]> {
    let len = rgba_len(width, height);
    check_len(buffer, len)?;
    let count = (len / 4) as f64;
    if count == 0.0 {
        return Ok([0.0; 3]);
    }

    let mut sums = [0u64; 3];
    for pixel in buffer[..len].chunks_exact(4) {
        for (sum, channel) in sums.iter_mut().zip(pixel) {
            *sum += *channel as u64;
        }
    }
    Ok(sums.map(|sum| (sum as f64 / count / 255.0) as f32))
}

fn nearest_power_of_two(value: u32) -> u32 {
    let value = value.max(1);
    let lower = previous_power_of_two(value);
    let upper = lower.saturating_mul(2);
    if value - lower < upper - value {
        lower
    } else {
        upper
    }
}

fn previous_power_of_two(value: u32) -> u32 {
    if value == 0 {
        return 1;
    }
    1 << (31 - value.leading_zeros())
}

/// Target size of the create-time resize.
///
/// `requested` is only used by [`ResizeMethod::Set`]. With `clamp`, power of two
/// results are reduced to the largest power of two that fits, other results are
/// clamped directly.
pub fn compute_resize_dimensions(
    width: u32,
    height: u32,
    method: ResizeMethod,
    requested: (u32, u32),
    clamp: Option<(u32, u32)>,
) -> (u32, u32) {
    let resize_axis = |value: u32, requested: u32| match method {
        ResizeMethod::NearestPowerTwo => nearest_power_of_two(value),
        ResizeMethod::BiggestPowerTwo => value.max(1).next_power_of_two(),
        ResizeMethod::SmallestPowerTwo => previous_power_of_two(value),
        ResizeMethod::Set => requested.max(1),
    };
    let clamp_axis = |value: u32, limit: u32| {
        let limit = limit.max(1);
        if value <= limit {
            value
        } else if method == ResizeMethod::Set {
            limit
        } else {
            previous_power_of_two(limit)
        }
    };

    let mut result = (resize_axis(width, requested.0), resize_axis(height, requested.1));
    if let Some((max_width, max_height)) = clamp {
        result = (clamp_axis(result.0, max_width), clamp_axis(result.1, max_height));
    }
    result
}
