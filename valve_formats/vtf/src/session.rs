use std::cell::RefCell;
use std::path::Path;

use log::debug;

use crate::convert::ConvertOptions;
use crate::create::{create_texture, CreateOptions};
use crate::error::{VtfError, VtfResult};
use crate::normal_map::NormalMapOptions;
use crate::texture::VtfTexture;
use crate::texture_data::TextureLayout;
use crate::transform::{MipmapFilter, SharpenFilter, SharpenOptions};

/// Owns at most one bound texture plus the conversion and sharpening
/// options used by every call made through it.
///
/// Failed calls keep the previously bound texture and record their message,
/// see [`Session::last_error`].
#[derive(Debug, Default)]
pub struct Session {
  image: Option<VtfTexture>,
  last_error: RefCell<String>,
  convert_options: ConvertOptions,
  sharpen_options: SharpenOptions
}

impl Session {
  pub fn open() -> Self {
    Self::default()
  }

  /// Releases the bound texture and the session with it.
  pub fn close(self) {
    if let Some(image) = &self.image {
      debug!("closing session with a bound {}x{} texture", image.width(), image.height());
    }
  }

  fn record<T>(&self, result: VtfResult<T>) -> VtfResult<T> {
    if let Err(error) = &result {
      *self.last_error.borrow_mut() = error.to_string();
    }
    result
  }

  /// Message of the most recent failure, empty if nothing failed yet.
  pub fn last_error(&self) -> String {
    self.last_error.borrow().clone()
  }

  pub fn convert_options(&self) -> &ConvertOptions {
    &self.convert_options
  }

  pub fn convert_options_mut(&mut self) -> &mut ConvertOptions {
    &mut self.convert_options
  }

  pub fn set_convert_options(&mut self, options: ConvertOptions) {
    self.convert_options = options;
  }

  pub fn sharpen_options(&self) -> &SharpenOptions {
    &self.sharpen_options
  }

  pub fn sharpen_options_mut(&mut self) -> &mut SharpenOptions {
    &mut self.sharpen_options
  }

  pub fn set_sharpen_options(&mut self, options: SharpenOptions) {
    self.sharpen_options = options;
  }

  pub fn is_image_loaded(&self) -> bool {
    self.image.is_some()
  }

  pub fn image(&self) -> VtfResult<&VtfTexture> {
    let result = self.image.as_ref().ok_or(VtfError::NoImageBound);
    self.record(result)
  }

  pub fn image_mut(&mut self) -> VtfResult<&mut VtfTexture> {
    if self.image.is_none() {
      return self.record(Err(VtfError::NoImageBound));
    }
    self.image.as_mut().ok_or(VtfError::NoImageBound)
  }

  /// Unbinds and returns the texture.
  pub fn destroy_image(&mut self) -> Option<VtfTexture> {
    self.image.take()
  }

  fn bind(&mut self, result: VtfResult<VtfTexture>) -> VtfResult<()> {
    let image = self.record(result)?;
    self.image = Some(image);
    Ok(())
  }

  /// Binds an empty texture.
  pub fn create_image(&mut self, layout: TextureLayout, thumbnail: bool, null_data: bool) -> VtfResult<()> {
    let result = VtfTexture::create(layout, thumbnail, null_data);
    self.bind(result)
  }

  /// Binds a texture built from RGBA8888 images, see [`VtfTexture::create_multiple`].
  #[allow(clippy::too_many_arguments)]
  pub fn create_image_from(
    &mut self,
    images: &[&[u8]],
    width: u32,
    height: u32,
    frames: u32,
    faces: u32,
    depth: u32,
    options: &CreateOptions
  ) -> VtfResult<()> {
    let result = create_texture(
      images,
      width,
      height,
      frames,
      faces,
      depth,
      options,
      &self.convert_options,
      &self.sharpen_options
    );
    self.bind(result)
  }

  pub fn load_bytes(&mut self, bytes: &[u8], header_only: bool) -> VtfResult<()> {
    let result = VtfTexture::load_bytes(bytes, header_only);
    self.bind(result)
  }

  pub fn load_path<P: AsRef<Path>>(&mut self, path: P, header_only: bool) -> VtfResult<()> {
    let result = VtfTexture::load_path(path, header_only);
    self.bind(result)
  }

  pub fn save_bytes(&self) -> VtfResult<Vec<u8>> {
    let result = self.image().and_then(VtfTexture::save_bytes);
    self.record(result)
  }

  pub fn save_path<P: AsRef<Path>>(&self, path: P) -> VtfResult<()> {
    let result = self.image().and_then(|image| image.save_path(path));
    self.record(result)
  }

  fn with_image<T>(&mut self, operation: impl FnOnce(&mut VtfTexture, &ConvertOptions, &SharpenOptions) -> VtfResult<T>) -> VtfResult<T> {
    let result = match self.image.as_mut() {
      Some(image) => operation(image, &self.convert_options, &self.sharpen_options),
      None => Err(VtfError::NoImageBound)
    };
    self.record(result)
  }

  pub fn generate_mipmaps(&mut self, frame: u32, face: u32, filter: MipmapFilter, sharpen: SharpenFilter) -> VtfResult<()> {
    self.with_image(|image, convert, sharpen_options| {
      image.generate_mipmaps_with(frame, face, filter, sharpen, convert, sharpen_options)
    })
  }

  pub fn generate_all_mipmaps(&mut self, filter: MipmapFilter, sharpen: SharpenFilter) -> VtfResult<()> {
    self.with_image(|image, convert, sharpen_options| {
      image.generate_all_mipmaps_with(filter, sharpen, convert, sharpen_options)
    })
  }

  pub fn generate_normal_map(&mut self, frame: u32, options: &NormalMapOptions) -> VtfResult<()> {
    self.with_image(|image, convert, _| image.generate_normal_map_with(frame, options, convert))
  }

  pub fn generate_all_normal_maps(&mut self, options: &NormalMapOptions) -> VtfResult<()> {
    self.with_image(|image, convert, _| image.generate_all_normal_maps_with(options, convert))
  }

  pub fn generate_sphere_map(&mut self) -> VtfResult<()> {
    self.with_image(|image, convert, _| image.generate_sphere_map_with(convert))
  }

  pub fn generate_thumbnail(&mut self) -> VtfResult<()> {
    self.with_image(|image, convert, _| image.generate_thumbnail_with(convert))
  }

  pub fn compute_reflectivity(&mut self) -> VtfResult<()> {
    self.with_image(|image, convert, _| image.compute_reflectivity_with(convert))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::image_format::ImageFormat;

  #[test]
  fn fresh_session_has_no_image() {
    let mut session = Session::open();
    assert!(!session.is_image_loaded());
    assert!(session.last_error().is_empty());
    assert!(matches!(session.image(), Err(VtfError::NoImageBound)));
    assert!(matches!(session.generate_sphere_map(), Err(VtfError::NoImageBound)));
    assert!(matches!(session.save_bytes(), Err(VtfError::NoImageBound)));
    assert_eq!(session.last_error(), VtfError::NoImageBound.to_string());
  }

  #[test]
  fn failed_load_keeps_bound_image() {
    let mut session = Session::open();
    session
      .create_image(TextureLayout::new(4, 4, ImageFormat::RGBA8888), false, false)
      .unwrap();
    assert!(matches!(session.load_bytes(b"not a texture at all", false), Err(VtfError::BadMagic)));
    assert!(session.is_image_loaded());
    assert_eq!(session.last_error(), VtfError::BadMagic.to_string());
    assert_eq!(session.image().unwrap().width(), 4);
  }

  #[test]
  fn bind_save_load() {
    let mut session = Session::open();
    let rgba = vec![128u8; 16 * 16 * 4];
    session
      .create_image_from(&[&rgba], 16, 16, 1, 1, 1, &CreateOptions::default())
      .unwrap();
    let bytes = session.save_bytes().unwrap();

    let mut other = Session::open();
    other.load_bytes(&bytes, false).unwrap();
    assert_eq!(other.image().unwrap(), session.image().unwrap());
    assert!(other.destroy_image().is_some());
    assert!(!other.is_image_loaded());
    other.close();
  }

  #[test]
  fn session_options_reach_generators() {
    let mut session = Session::open();
    session.convert_options_mut().fp16_hdr_key = 8.0;
    session
      .create_image(TextureLayout::new(8, 8, ImageFormat::RGBA8888), false, false)
      .unwrap();
    session.generate_all_mipmaps(MipmapFilter::Box, SharpenFilter::None).unwrap();
    session.generate_thumbnail().unwrap();
    assert!(session.image().unwrap().has_thumbnail());
    assert!(matches!(session.generate_sphere_map(), Err(VtfError::RequiresCubemap)));
    assert_eq!(session.last_error(), VtfError::RequiresCubemap.to_string());
  }
}
