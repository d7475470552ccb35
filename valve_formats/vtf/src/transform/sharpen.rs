use strum_macros::{EnumCount, EnumIter};

use crate::error::{check_len, VtfResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SharpenFilter {
    #[default]
    None,
    Negative,
    Lighter,
    Darker,
    ContrastMore,
    ContrastLess,
    Smoothen,
    SharpenSoft,
    SharpenMedium,
    SharpenStrong,
    FindEdges,
    Contour,
    EdgeDetect,
    EdgeDetectSoft,
    Emboss,
    MeanRemoval,
    Unsharp,
    XSharpen,
    WarpSharp,
}

/// Parameters of the sharpen filters that take any.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SharpenOptions {
    /// Standard deviation of the unsharp mask blur, in pixels.
    pub unsharp_radius: f32,
    pub unsharp_amount: f32,
    /// Differences smaller than this (0..255) are left alone by the unsharp mask.
    pub unsharp_threshold: f32,
    pub xsharpen_strength: u8,
    pub xsharpen_threshold: u8,
}

impl Default for SharpenOptions {
    fn default() -> Self {
        Self {
            unsharp_radius: 2.0,
            unsharp_amount: 0.5,
            unsharp_threshold: 0.0,
            xsharpen_strength: 255,
            xsharpen_threshold: 255,
        }
    }
}

struct Kernel {
    weights: [i32; 9],
    divisor: i32,
    bias: i32,
}

const fn kernel(weights: [i32; 9], divisor: i32, bias: i32) -> Kernel {
    Kernel { weights, divisor, bias }
}

const SMOOTHEN: Kernel = kernel([1, 1, 1, 1, 5, 1, 1, 1, 1], 13, 0);
const SHARPEN_SOFT: Kernel = kernel([-1, -1, -1, -1, 16, -1, -1, -1, -1], 8, 0);
const SHARPEN_MEDIUM: Kernel = kernel([-1, -1, -1, -1, 12, -1, -1, -1, -1], 4, 0);
const SHARPEN_STRONG: Kernel = kernel([-1, -2, -1, -2, 13, -2, -1, -2, -1], 1, 0);
const FIND_EDGES: Kernel = kernel([-1, -1, -1, -1, 8, -1, -1, -1, -1], 1, 0);
const CONTOUR: Kernel = kernel([1, 1, 1, 1, -8, 1, 1, 1, 1], 1, 255);
const EDGE_DETECT: Kernel = kernel([0, -1, 0, -1, 4, -1, 0, -1, 0], 1, 128);
const EDGE_DETECT_SOFT: Kernel = kernel([0, -1, 0, -1, 4, -1, 0, -1, 0], 2, 128);
const EMBOSS: Kernel = kernel([-1, -1, 0, -1, 0, 1, 0, 1, 1], 1, 128);
const MEAN_REMOVAL: Kernel = kernel([-1, -1, -1, -1, 9, -1, -1, -1, -1], 1, 0);

/// Applies `filter` to the colour channels of an RGBA8888 image. Alpha is left untouched.
pub fn sharpen(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    filter: SharpenFilter,
    options: &SharpenOptions,
) -> VtfResult<()> {
    let (width, height) = (width as usize, height as usize);
    check_len(buffer, width * height * 4)?;
    let buffer = &mut buffer[..width * height * 4];

    match filter {
        SharpenFilter::None => {}
        SharpenFilter::Negative => point(buffer, |c| 255.0 - c),
        SharpenFilter::Lighter => point(buffer, |c| c + (255.0 - c) * 0.25),
        SharpenFilter::Darker => point(buffer, |c| c * 0.75),
        SharpenFilter::ContrastMore => point(buffer, |c| (c - 128.0) * 1.25 + 128.0),
        SharpenFilter::ContrastLess => point(buffer, |c| (c - 128.0) * 0.8 + 128.0),
        SharpenFilter::Smoothen => convolve(buffer, width, height, &SMOOTHEN),
        SharpenFilter::SharpenSoft => convolve(buffer, width, height, &SHARPEN_SOFT),
        SharpenFilter::SharpenMedium => convolve(buffer, width, height, &SHARPEN_MEDIUM),
        SharpenFilter::SharpenStrong => convolve(buffer, width, height, &SHARPEN_STRONG),
        SharpenFilter::FindEdges => convolve(buffer, width, height, &FIND_EDGES),
        SharpenFilter::Contour => convolve(buffer, width, height, &CONTOUR),
        SharpenFilter::EdgeDetect => convolve(buffer, width, height, &EDGE_DETECT),
        SharpenFilter::EdgeDetectSoft => convolve(buffer, width, height, &EDGE_DETECT_SOFT),
        SharpenFilter::Emboss => convolve(buffer, width, height, &EMBOSS),
        SharpenFilter::MeanRemoval => convolve(buffer, width, height, &MEAN_REMOVAL),
        SharpenFilter::Unsharp => unsharp(buffer, width, height, options),
        SharpenFilter::XSharpen => xsharpen(buffer, width, height, options),
        SharpenFilter::WarpSharp => warpsharp(buffer, width, height),
    }
    Ok(())
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn point<F: Fn(f32) -> f32>(buffer: &mut [u8], f: F) {
    for pixel in buffer.chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            *channel = to_u8(f(*channel as f32));
        }
    }
}

fn clamped(value: isize, max: usize) -> usize {
    value.clamp(0, max as isize - 1) as usize
}

fn convolve(buffer: &mut [u8], width: usize, height: usize, kernel: &Kernel) {
    let source = buffer.to_vec();
    for y in 0..height {
        for x in 0..width {
            let mut sums = [0i32; 3];
            for (tap, weight) in kernel.weights.iter().enumerate() {
                let sx = clamped(x as isize + (tap % 3) as isize - 1, width);
                let sy = clamped(y as isize + (tap / 3) as isize - 1, height);
                let offset = (sy * width + sx) * 4;
                for (sum, value) in sums.iter_mut().zip(&source[offset..offset + 3]) {
                    *sum += *value as i32 * weight;
                }
            }
            let offset = (y * width + x) * 4;
            for (channel, sum) in buffer[offset..offset + 3].iter_mut().zip(sums) {
                *channel = (sum / kernel.divisor + kernel.bias).clamp(0, 255) as u8;
            }
        }
    }
}

fn gaussian_blur(source: &[u8], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().max(1.0) as isize;
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|offset| (-((offset * offset) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    weights.iter_mut().for_each(|weight| *weight /= total);

    let mut horizontal = vec![0f32; width * height * 3];
    for y in 0..height {
        for x in 0..width {
            for (tap, weight) in weights.iter().enumerate() {
                let sx = clamped(x as isize + tap as isize - radius, width);
                let offset = (y * width + sx) * 4;
                for channel in 0..3 {
                    horizontal[(y * width + x) * 3 + channel] += source[offset + channel] as f32 * weight;
                }
            }
        }
    }

    let mut blurred = vec![0f32; width * height * 3];
    for y in 0..height {
        for x in 0..width {
            for (tap, weight) in weights.iter().enumerate() {
                let sy = clamped(y as isize + tap as isize - radius, height);
                for channel in 0..3 {
                    blurred[(y * width + x) * 3 + channel] += horizontal[(sy * width + x) * 3 + channel] * weight;
                }
            }
        }
    }
    blurred
}

fn unsharp(buffer: &mut [u8], width: usize, height: usize, options: &SharpenOptions) {
    if options.unsharp_radius <= 0.0 {
        return;
    }
    let blurred = gaussian_blur(buffer, width, height, options.unsharp_radius);
    for (index, pixel) in buffer.chunks_exact_mut(4).enumerate() {
        for channel in 0..3 {
            let value = pixel[channel] as f32;
            let difference = value - blurred[index * 3 + channel];
            if difference.abs() >= options.unsharp_threshold {
                pixel[channel] = to_u8(value + difference * options.unsharp_amount);
            }
        }
    }
}

/// Pulls each channel towards whichever extreme of its 3x3 neighbourhood is closer.
fn xsharpen(buffer: &mut [u8], width: usize, height: usize, options: &SharpenOptions) {
    let source = buffer.to_vec();
    let strength = options.xsharpen_strength as f32 / 255.0;
    let threshold = options.xsharpen_threshold as i32;
    for y in 0..height {
        for x in 0..width {
            let offset = (y * width + x) * 4;
            for channel in 0..3 {
                let mut min = 255u8;
                let mut max = 0u8;
                for tap in 0..9 {
                    let sx = clamped(x as isize + (tap % 3) as isize - 1, width);
                    let sy = clamped(y as isize + (tap / 3) as isize - 1, height);
                    let value = source[(sy * width + sx) * 4 + channel];
                    min = min.min(value);
                    max = max.max(value);
                }
                let value = source[offset + channel] as i32;
                let target = if value - min as i32 <= max as i32 - value {
                    min as i32
                } else {
                    max as i32
                };
                if (target - value).abs() <= threshold {
                    buffer[offset + channel] = to_u8(value as f32 + (target - value) as f32 * strength);
                }
            }
        }
    }
}

/// Displaces pixels along the gradient of a blurred edge map, narrowing soft edges.
fn warpsharp(buffer: &mut [u8], width: usize, height: usize) {
    const DEPTH: f32 = 2.0;
    let source = buffer.to_vec();
    let luminance: Vec<f32> = source
        .chunks_exact(4)
        .map(|pixel| pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114)
        .collect();
    let sample = |map: &[f32], x: isize, y: isize| map[clamped(y, height) * width + clamped(x, width)];

    let mut edges = vec![0f32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let dx = sample(&luminance, x + 1, y) - sample(&luminance, x - 1, y);
            let dy = sample(&luminance, x, y + 1) - sample(&luminance, x, y - 1);
            edges[y as usize * width + x as usize] = (dx * dx + dy * dy).sqrt() / 255.0;
        }
    }

    for y in 0..height as isize {
        for x in 0..width as isize {
            let dx = (sample(&edges, x + 1, y) - sample(&edges, x - 1, y)) * 0.5 * DEPTH;
            let dy = (sample(&edges, x, y + 1) - sample(&edges, x, y - 1)) * 0.5 * DEPTH;
            let sx = (x as f32 - dx).clamp(0.0, (width - 1) as f32);
            let sy = (y as f32 - dy).clamp(0.0, (height - 1) as f32);
            let offset = (y as usize * width + x as usize) * 4;
            for channel in 0..3 {
                buffer[offset + channel] = to_u8(bilinear(&source, width, height, sx, sy, channel));
            }
        }
    }
}

fn bilinear(source: &[u8], width: usize, height: usize, x: f32, y: f32, channel: usize) -> f32 {
    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);
    let at = |x: usize, y: usize| source[(y * width + x) * 4 + channel] as f32;
    let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
    let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}
