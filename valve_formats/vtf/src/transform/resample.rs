use std::f32::consts::PI;

use strum_macros::{EnumCount, EnumIter};

use super::sharpen::{sharpen, SharpenFilter, SharpenOptions};
use crate::error::{check_len, VtfError, VtfResult};

/// Resampling filter used by resizing and mipmap generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MipmapFilter {
    Point,
    #[default]
    Box,
    Triangle,
    Quadratic,
    Cubic,
    CatmullRom,
    Mitchell,
    Gaussian,
    Sinc,
    Bessel,
    Hanning,
    Hamming,
    Blackman,
    Kaiser,
}

const WINDOW_SUPPORT: f32 = 3.0;
const BESSEL_SUPPORT: f32 = 3.2383;
const KAISER_ALPHA: f32 = 4.0;

impl MipmapFilter {
    /// Radius of the kernel in source pixels at a scale of 1.
    pub fn support(self) -> f32 {
        match self {
            MipmapFilter::Point | MipmapFilter::Box => 0.5,
            MipmapFilter::Triangle => 1.0,
            MipmapFilter::Quadratic => 1.5,
            MipmapFilter::Cubic | MipmapFilter::CatmullRom | MipmapFilter::Mitchell => 2.0,
            MipmapFilter::Gaussian => 1.25,
            MipmapFilter::Sinc => 4.0,
            MipmapFilter::Bessel => BESSEL_SUPPORT,
            MipmapFilter::Hanning | MipmapFilter::Hamming | MipmapFilter::Blackman | MipmapFilter::Kaiser => {
                WINDOW_SUPPORT
            }
        }
    }

    /// Kernel weight at distance `x`, not normalized.
    pub fn weight(self, x: f32) -> f32 {
        let x = x.abs();
        match self {
            MipmapFilter::Point | MipmapFilter::Box => {
                if x <= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            MipmapFilter::Triangle => (1.0 - x).max(0.0),
            MipmapFilter::Quadratic => {
                if x < 0.5 {
                    0.75 - x * x
                } else if x < 1.5 {
                    let t = x - 1.5;
                    0.5 * t * t
                } else {
                    0.0
                }
            }
            MipmapFilter::Cubic => mitchell(x, 1.0, 0.0),
            MipmapFilter::CatmullRom => mitchell(x, 0.0, 0.5),
            MipmapFilter::Mitchell => mitchell(x, 1.0 / 3.0, 1.0 / 3.0),
            MipmapFilter::Gaussian => {
                if x < 1.25 {
                    (-2.0 * x * x).exp() * (2.0 / PI).sqrt()
                } else {
                    0.0
                }
            }
            MipmapFilter::Sinc => {
                if x < 4.0 {
                    sinc(x)
                } else {
                    0.0
                }
            }
            MipmapFilter::Bessel => {
                if x < BESSEL_SUPPORT {
                    jinc(x) * blackman_window(x / BESSEL_SUPPORT)
                } else {
                    0.0
                }
            }
            MipmapFilter::Hanning => windowed(x, |t| 0.5 + 0.5 * (PI * t).cos()),
            MipmapFilter::Hamming => windowed(x, |t| 0.54 + 0.46 * (PI * t).cos()),
            MipmapFilter::Blackman => windowed(x, blackman_window),
            MipmapFilter::Kaiser => windowed(x, |t| {
                bessel_i0(KAISER_ALPHA * (1.0 - t * t).max(0.0).sqrt()) / bessel_i0(KAISER_ALPHA)
            }),
        }
    }
}

fn mitchell(x: f32, b: f32, c: f32) -> f32 {
    let x2 = x * x;
    let x3 = x2 * x;
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x3 + (-18.0 + 12.0 * b + 6.0 * c) * x2 + (6.0 - 2.0 * b)) / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x3 + (6.0 * b + 30.0 * c) * x2 + (-12.0 * b - 48.0 * c) * x + (8.0 * b + 24.0 * c)) / 6.0
    } else {
        0.0
    }
}

fn sinc(x: f32) -> f32 {
    if x.abs() < 1e-6 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

fn windowed<W: Fn(f32) -> f32>(x: f32, window: W) -> f32 {
    if x < WINDOW_SUPPORT {
        sinc(x) * window(x / WINDOW_SUPPORT)
    } else {
        0.0
    }
}

fn blackman_window(t: f32) -> f32 {
    0.42 + 0.5 * (PI * t).cos() + 0.08 * (2.0 * PI * t).cos()
}

/// Zeroth order modified Bessel function of the first kind, by its power series.
fn bessel_i0(x: f32) -> f32 {
    let quarter = x * x / 4.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..32 {
        term *= quarter / (k * k) as f32;
        sum += term;
        if term < sum * 1e-8 {
            break;
        }
    }
    sum
}

/// First order Bessel function of the first kind (rational approximations).
fn bessel_j1(x: f32) -> f32 {
    let ax = x.abs() as f64;
    let x = x as f64;
    let result = if ax < 8.0 {
        let y = x * x;
        let numerator = x
            * (72362614232.0
                + y * (-7895059235.0
                    + y * (242396853.1 + y * (-2972611.439 + y * (15704.48260 + y * (-30.16036606))))));
        let denominator = 144725228442.0
            + y * (2300535178.0 + y * (18583304.74 + y * (99447.43394 + y * (376.9991397 + y))));
        numerator / denominator
    } else {
        let z = 8.0 / ax;
        let y = z * z;
        let xx = ax - 2.356194491;
        let p = 1.0
            + y * (0.183105e-2 + y * (-0.3516396496e-4 + y * (0.2457520174e-5 + y * (-0.240337019e-6))));
        let q = 0.04687499995
            + y * (-0.2002690873e-3 + y * (0.8449199096e-5 + y * (-0.88228987e-6 + y * 0.105787412e-6)));
        let value = (0.636619772 / ax).sqrt() * (xx.cos() * p - z * xx.sin() * q);
        if x < 0.0 {
            -value
        } else {
            value
        }
    };
    result as f32
}

/// The circular counterpart of sinc, scaled to 1 at the origin.
fn jinc(x: f32) -> f32 {
    if x.abs() < 1e-6 {
        1.0
    } else {
        2.0 * bessel_j1(PI * x) / (PI * x)
    }
}

struct Contribution {
    start: usize,
    weights: Vec<f32>,
}

/// Per destination pixel weights over the source axis. Samples past either end are clamped onto the edge.
fn contributions(src_len: usize, dst_len: usize, filter: MipmapFilter) -> Vec<Contribution> {
    let scale = dst_len as f32 / src_len as f32;
    let mut result = Vec::with_capacity(dst_len);

    if filter == MipmapFilter::Point {
        for i in 0..dst_len {
            let source = (((i as f32 + 0.5) / scale) as usize).min(src_len - 1);
            result.push(Contribution {
                start: source,
                weights: vec![1.0],
            });
        }
        return result;
    }

    let filter_scale = if scale < 1.0 { 1.0 / scale } else { 1.0 };
    let support = filter.support() * filter_scale;
    for i in 0..dst_len {
        let center = (i as f32 + 0.5) / scale - 0.5;
        let left = (center - support).ceil() as isize;
        let right = (center + support).floor() as isize;
        let first = left.clamp(0, src_len as isize - 1) as usize;
        let last = right.clamp(0, src_len as isize - 1) as usize;

        let mut weights = vec![0f32; last - first + 1];
        let mut total = 0.0;
        for j in left..=right {
            let weight = filter.weight((j as f32 - center) / filter_scale);
            let index = j.clamp(0, src_len as isize - 1) as usize;
            weights[index - first] += weight;
            total += weight;
        }

        if total.abs() < 1e-6 {
            let nearest = (center.round().max(0.0) as usize).min(src_len - 1);
            result.push(Contribution {
                start: nearest,
                weights: vec![1.0],
            });
            continue;
        }
        weights.iter_mut().for_each(|weight| *weight /= total);
        result.push(Contribution { start: first, weights });
    }
    result
}

/// Resamples an RGBA8888 image to `dst_width` x `dst_height`, then applies `sharpen_filter`.
pub fn resize(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    filter: MipmapFilter,
    sharpen_filter: SharpenFilter,
) -> VtfResult<Vec<u8>> {
    resize_with(
        src,
        src_width,
        src_height,
        dst_width,
        dst_height,
        filter,
        sharpen_filter,
        &SharpenOptions::default(),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn resize_with(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    filter: MipmapFilter,
    sharpen_filter: SharpenFilter,
    options: &SharpenOptions,
) -> VtfResult<Vec<u8>> {
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(VtfError::InvalidParameters(format!(
            "cannot resize {}x{} to {}x{}",
            src_width, src_height, dst_width, dst_height
        )));
    }
    let (src_w, src_h) = (src_width as usize, src_height as usize);
    let (dst_w, dst_h) = (dst_width as usize, dst_height as usize);
    check_len(src, src_w * src_h * 4)?;

    let horizontal = contributions(src_w, dst_w, filter);
    let mut intermediate = vec![0f32; dst_w * src_h * 4];
    for y in 0..src_h {
        let row = &src[y * src_w * 4..(y + 1) * src_w * 4];
        for (x, contribution) in horizontal.iter().enumerate() {
            let out = &mut intermediate[(y * dst_w + x) * 4..(y * dst_w + x + 1) * 4];
            for (tap, weight) in contribution.weights.iter().enumerate() {
                let pixel = &row[(contribution.start + tap) * 4..(contribution.start + tap + 1) * 4];
                for (value, channel) in out.iter_mut().zip(pixel) {
                    *value += *channel as f32 * weight;
                }
            }
        }
    }

    let vertical = contributions(src_h, dst_h, filter);
    let mut dst = vec![0u8; dst_w * dst_h * 4];
    let mut sums = [0f32; 4];
    for (y, contribution) in vertical.iter().enumerate() {
        for x in 0..dst_w {
            sums.fill(0.0);
            for (tap, weight) in contribution.weights.iter().enumerate() {
                let offset = ((contribution.start + tap) * dst_w + x) * 4;
                for (sum, value) in sums.iter_mut().zip(&intermediate[offset..offset + 4]) {
                    *sum += value * weight;
                }
            }
            let offset = (y * dst_w + x) * 4;
            for (channel, sum) in dst[offset..offset + 4].iter_mut().zip(sums) {
                *channel = sum.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    sharpen(&mut dst, dst_width, dst_height, sharpen_filter, options)?;
    Ok(dst)
}
