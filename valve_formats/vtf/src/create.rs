use log::debug;

use crate::convert::ConvertOptions;
use crate::error::{check_len, VtfError, VtfResult};
use crate::header::check_version;
use crate::image_format::{is_image_format_supported, ImageFormat};
use crate::normal_map::NormalMapOptions;
use crate::texture::{VtfTexture, DEFAULT_VERSION};
use crate::texture_data::TextureLayout;
use crate::texture_flags::TextureFlags;
use crate::transform::{
  compute_resize_dimensions, correct_gamma, resize_with, MipmapFilter, ResizeMethod, SharpenFilter, SharpenOptions
};

/// Everything [`VtfTexture::create_single`] and [`VtfTexture::create_multiple`] do to the input.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CreateOptions {
  pub version: [u32; 2],
  pub format: ImageFormat,
  /// Alpha and environment map bits are replaced by what the image contains.
  pub flags: TextureFlags,
  pub start_frame: u32,
  pub bump_scale: f32,
  /// Used when `compute_reflectivity` is off.
  pub reflectivity: [f32; 3],

  pub mipmaps: bool,
  pub mipmap_filter: MipmapFilter,
  pub mipmap_sharpen: SharpenFilter,

  pub thumbnail: bool,
  pub compute_reflectivity: bool,

  pub resize: bool,
  pub resize_method: ResizeMethod,
  pub resize_filter: MipmapFilter,
  pub resize_sharpen: SharpenFilter,
  /// Target size for [`ResizeMethod::Set`].
  pub resize_width: u32,
  pub resize_height: u32,
  pub resize_clamp: bool,
  pub resize_clamp_width: u32,
  pub resize_clamp_height: u32,

  pub gamma_correction: bool,
  pub gamma: f32,

  pub normal_map: bool,
  pub normal_map_options: NormalMapOptions,

  /// Adds the sphere map face to cubemaps, where the version allows one.
  pub sphere_map: bool
}

impl Default for CreateOptions {
  fn default() -> Self {
    Self {
      version: DEFAULT_VERSION,
      format: ImageFormat::RGBA8888,
      flags: TextureFlags::empty(),
      start_frame: 0,
      bump_scale: 1.0,
      reflectivity: [1.0; 3],
      mipmaps: true,
      mipmap_filter: MipmapFilter::Box,
      mipmap_sharpen: SharpenFilter::None,
      thumbnail: true,
      compute_reflectivity: true,
      resize: false,
      resize_method: ResizeMethod::BiggestPowerTwo,
      resize_filter: MipmapFilter::Triangle,
      resize_sharpen: SharpenFilter::None,
      resize_width: 0,
      resize_height: 0,
      resize_clamp: true,
      resize_clamp_width: 4096,
      resize_clamp_height: 4096,
      gamma_correction: false,
      gamma: 2.0,
      normal_map: false,
      normal_map_options: NormalMapOptions::default(),
      sphere_map: true
    }
  }
}

fn check_shape(images: usize, frames: u32, faces: u32, depth: u32) -> VtfResult<()> {
  if !matches!(faces, 1 | 6 | 7) {
    return Err(VtfError::InvalidParameters(format!("{} faces, expected 1, 6 or 7", faces)));
  }
  if depth > 1 && faces > 1 {
    return Err(VtfError::InvalidParameters("volume textures cannot be cubemaps".to_string()));
  }
  if frames == 0 || depth == 0 {
    return Err(VtfError::InvalidParameters(format!("{} frames and {} slices", frames, depth)));
  }
  let expected = frames as usize * faces as usize * depth as usize;
  if images != expected {
    return Err(VtfError::InvalidParameters(format!(
      "{} images for {} frames, {} faces and {} slices",
      images, frames, faces, depth
    )));
  }
  Ok(())
}

/// Runs the create pipeline: gamma, resize, normal map, sphere map,
/// reflectivity, mipmaps, thumbnail and finally the format conversion.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create_texture(
  images: &[&[u8]],
  width: u32,
  height: u32,
  frames: u32,
  faces: u32,
  depth: u32,
  options: &CreateOptions,
  convert_options: &ConvertOptions,
  sharpen_options: &SharpenOptions
) -> VtfResult<VtfTexture> {
  check_version(options.version)?;
  check_shape(images.len(), frames, faces, depth)?;
  if options.start_frame >= frames {
    return Err(VtfError::OutOfRange {
      what: "start frame",
      index: options.start_frame,
      count: frames
    });
  }
  if !is_image_format_supported(options.format) {
    return Err(VtfError::UnsupportedFormat(options.format));
  }
  if width == 0 || height == 0 {
    return Err(VtfError::InvalidParameters(format!("cannot create a {}x{} texture", width, height)));
  }

  let len = width as usize * height as usize * 4;
  let mut buffers = Vec::<Vec<u8>>::with_capacity(images.len());
  for image in images {
    check_len(image, len)?;
    buffers.push(image[..len].to_vec());
  }

  if options.gamma_correction {
    for buffer in &mut buffers {
      correct_gamma(buffer, width, height, options.gamma)?;
    }
  }

  let (mut width, mut height) = (width, height);
  if options.resize {
    let clamp = if options.resize_clamp {
      Some((options.resize_clamp_width, options.resize_clamp_height))
    } else {
      None
    };
    let (new_width, new_height) = compute_resize_dimensions(
      width,
      height,
      options.resize_method,
      (options.resize_width, options.resize_height),
      clamp
    );
    if (new_width, new_height) != (width, height) {
      buffers = buffers
        .iter()
        .map(|buffer| {
          resize_with(
            buffer,
            width,
            height,
            new_width,
            new_height,
            options.resize_filter,
            options.resize_sharpen,
            sharpen_options
          )
        })
        .collect::<VtfResult<Vec<_>>>()?;
      width = new_width;
      height = new_height;
    }
  }

  let sphere_map = options.sphere_map && faces == 6 && options.version[1] < 5;
  let layout = TextureLayout::new(width, height, ImageFormat::RGBA8888)
    .with_frames(frames)
    .with_faces(if sphere_map { 7 } else { faces })
    .with_depth(depth)
    .with_mipmaps(options.mipmaps);
  let mut texture = VtfTexture::create(layout, false, false)?;
  texture.set_version(options.version)?;

  for frame in 0..frames {
    for face in 0..faces {
      for slice in 0..depth {
        let index = ((frame * faces + face) * depth + slice) as usize;
        texture.set_data(frame, face, slice, 0, &buffers[index])?;
      }
    }
  }
  drop(buffers);

  if options.normal_map {
    texture.generate_all_normal_maps_with(&options.normal_map_options, convert_options)?;
  }
  if sphere_map {
    texture.generate_sphere_map_with(convert_options)?;
  }
  if options.compute_reflectivity {
    texture.compute_reflectivity_with(convert_options)?;
  } else {
    texture.set_reflectivity(options.reflectivity);
  }
  if layout.mipmap_count > 1 {
    texture.generate_all_mipmaps_with(options.mipmap_filter, options.mipmap_sharpen, convert_options, sharpen_options)?;
  }
  texture.set_start_frame(options.start_frame)?;
  if options.thumbnail {
    texture.generate_thumbnail_with(convert_options)?;
  }
  if options.format != ImageFormat::RGBA8888 {
    texture.convert_format_with(options.format, convert_options)?;
  }

  let mut flags = options.flags - TextureFlags::DERIVED;
  flags.set(TextureFlags::NORMAL, options.normal_map || flags.contains(TextureFlags::NORMAL));
  texture.set_flags(flags);
  texture.update_alpha_flags();
  texture.set_bump_scale(options.bump_scale);

  debug!(
    "created {}x{} {:?} texture with {} frames, {} faces, {} slices and {} mipmaps",
    width,
    height,
    options.format,
    frames,
    texture.faces(),
    depth,
    layout.mipmap_count
  );
  Ok(texture)
}
