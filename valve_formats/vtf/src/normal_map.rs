//! Tangent space normal maps from height data.

use crate::error::{check_len, VtfError, VtfResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KernelFilter {
    /// Central difference of the four direct neighbours.
    Filter4x,
    #[default]
    Filter3x3,
    Filter5x5,
    Filter7x7,
    Filter9x9,
    /// Forward difference, as used for du/dv maps.
    DuDv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeightConversionMethod {
    Alpha,
    #[default]
    AverageRgb,
    BiasedRgb,
    Red,
    Green,
    Blue,
    MaxRgb,
    ColorSpace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NormalAlphaResult {
    NoChange,
    Height,
    Black,
    #[default]
    White,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalMapOptions {
    pub kernel: KernelFilter,
    pub height_method: HeightConversionMethod,
    pub alpha_result: NormalAlphaResult,
    /// Smallest Z component in 1/255 steps, 0 disables the clamp.
    pub minimum_z: u8,
    pub scale: f32,
    /// Sample across the opposite edge instead of repeating the border.
    pub wrap: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    /// Negates Z, only while the minimum Z clamp is active.
    pub invert_z: bool,
}

impl Default for NormalMapOptions {
    fn default() -> Self {
        Self {
            kernel: KernelFilter::Filter3x3,
            height_method: HeightConversionMethod::AverageRgb,
            alpha_result: NormalAlphaResult::White,
            minimum_z: 0,
            scale: 2.0,
            wrap: false,
            invert_x: false,
            invert_y: false,
            invert_z: false,
        }
    }
}

impl HeightConversionMethod {
    /// Height of one RGBA8888 pixel in 0..1.
    fn height(self, pixel: &[u8]) -> f32 {
        let [r, g, b, a] = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32, pixel[3] as f32];
        let value = match self {
            HeightConversionMethod::Alpha => a,
            HeightConversionMethod::AverageRgb => (r + g + b) / 3.0,
            HeightConversionMethod::BiasedRgb => r * 0.3086 + g * 0.6094 + b * 0.0820,
            HeightConversionMethod::Red => r,
            HeightConversionMethod::Green => g,
            HeightConversionMethod::Blue => b,
            HeightConversionMethod::MaxRgb => r.max(g).max(b),
            HeightConversionMethod::ColorSpace => r * 0.2126 + g * 0.7152 + b * 0.0722,
        };
        value / 255.0
    }
}

/// Weights of the x derivative, `(dx, dy, weight)`. The y derivative uses the transposed taps.
fn kernel_taps(kernel: KernelFilter) -> Vec<(isize, isize, f32)> {
    match kernel {
        KernelFilter::Filter4x => vec![(-1, 0, -0.5), (1, 0, 0.5)],
        KernelFilter::DuDv => vec![(0, 0, -1.0), (1, 0, 1.0)],
        KernelFilter::Filter3x3 => distance_weighted(1),
        KernelFilter::Filter5x5 => distance_weighted(2),
        KernelFilter::Filter7x7 => distance_weighted(3),
        KernelFilter::Filter9x9 => distance_weighted(4),
    }
}

/// `i / (i^2 + j^2)` over a square of the given radius, scaled so a unit ramp has a unit gradient.
/// The 3x3 case is the Sobel operator.
fn distance_weighted(radius: isize) -> Vec<(isize, isize, f32)> {
    let mut taps = Vec::new();
    let mut ramp = 0.0;
    // opposite taps sit next to each other so a flat field sums to exactly zero
    for j in -radius..=radius {
        for i in 1..=radius {
            let weight = i as f32 / (i * i + j * j) as f32;
            ramp += 2.0 * weight * i as f32;
            taps.push((i, j, weight));
            taps.push((-i, j, -weight));
        }
    }
    for tap in &mut taps {
        tap.2 /= ramp;
    }
    taps
}

struct HeightField {
    heights: Vec<f32>,
    width: usize,
    height: usize,
    wrap: bool,
}

impl HeightField {
    fn sample(&self, x: isize, y: isize) -> f32 {
        let (width, height) = (self.width as isize, self.height as isize);
        let (x, y) = if self.wrap {
            (x.rem_euclid(width), y.rem_euclid(height))
        } else {
            (x.clamp(0, width - 1), y.clamp(0, height - 1))
        };
        self.heights[y as usize * self.width + x as usize]
    }
}

fn encode(value: f32) -> u8 {
    ((value * 0.5 + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Builds a normal map from an RGBA8888 image.
pub fn convert_to_normal_map(rgba: &[u8], width: u32, height: u32, options: &NormalMapOptions) -> VtfResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(VtfError::InvalidParameters(format!("cannot build a {}x{} normal map", width, height)));
    }
    let (width, height) = (width as usize, height as usize);
    check_len(rgba, width * height * 4)?;

    let field = HeightField {
        heights: rgba[..width * height * 4]
            .chunks_exact(4)
            .map(|pixel| options.height_method.height(pixel))
            .collect(),
        width,
        height,
        wrap: options.wrap,
    };
    let taps = kernel_taps(options.kernel);
    let minimum_z = options.minimum_z as f32 / 255.0;

    let mut normals = vec![0u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            let (mut dx, mut dy) = (0.0, 0.0);
            for (i, j, weight) in &taps {
                dx += field.sample(x as isize + i, y as isize + j) * weight;
                dy += field.sample(x as isize + j, y as isize + i) * weight;
            }

            let mut normal = [-dx * options.scale, -dy * options.scale, 1.0];
            let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
            normal.iter_mut().for_each(|component| *component /= length);

            if options.minimum_z > 0 && normal[2] < minimum_z {
                let planar = (normal[0] * normal[0] + normal[1] * normal[1]).sqrt();
                let target = (1.0 - minimum_z * minimum_z).max(0.0).sqrt();
                if planar > 0.0 {
                    normal[0] *= target / planar;
                    normal[1] *= target / planar;
                }
                normal[2] = if options.invert_z { -minimum_z } else { minimum_z };
            }
            if options.invert_x {
                normal[0] = -normal[0];
            }
            if options.invert_y {
                normal[1] = -normal[1];
            }

            let index = y * width + x;
            let out = &mut normals[index * 4..index * 4 + 4];
            out[0] = encode(normal[0]);
            out[1] = encode(normal[1]);
            out[2] = encode(normal[2]);
            out[3] = match options.alpha_result {
                NormalAlphaResult::NoChange => rgba[index * 4 + 3],
                NormalAlphaResult::Height => (field.heights[index] * 255.0).round() as u8,
                NormalAlphaResult::Black => 0,
                NormalAlphaResult::White => 255,
            };
        }
    }
    Ok(normals)
}
