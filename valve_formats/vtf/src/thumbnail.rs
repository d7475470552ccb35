use crate::convert::{from_rgba8888_with, to_rgba8888_with, ConvertOptions};
use crate::error::{check_len, VtfError, VtfResult};
use crate::image_format::{calculate_image_size, ImageFormat};
use crate::transform::{resize, MipmapFilter, SharpenFilter};

pub const THUMBNAIL_FORMAT: ImageFormat = ImageFormat::DXT1;
const MAX_THUMBNAIL_SIZE: u32 = 16;

/// The low resolution image stored next to the header.
#[derive(Clone, Debug, PartialEq)]
pub struct Thumbnail {
  data: Box<[u8]>,
  format: ImageFormat,
  width: u32,
  height: u32
}

/// Halves the size until both sides fit 16 pixels.
pub fn thumbnail_dimensions(width: u32, height: u32) -> (u32, u32) {
  let (mut width, mut height) = (width.max(1), height.max(1));
  while width > MAX_THUMBNAIL_SIZE || height > MAX_THUMBNAIL_SIZE {
    width = (width / 2).max(1);
    height = (height / 2).max(1);
  }
  (width, height)
}

impl Thumbnail {
  pub fn new(data: Box<[u8]>, format: ImageFormat, width: u32, height: u32) -> VtfResult<Self> {
    if width == 0 || height == 0 || width > u8::MAX as u32 || height > u8::MAX as u32 {
      return Err(VtfError::InvalidParameters(format!("thumbnail size {}x{} does not fit the header", width, height)));
    }
    let expected = calculate_image_size(width, height, 1, format);
    if data.len() != expected {
      return Err(VtfError::BufferSize { expected, actual: data.len() });
    }
    Ok(Self { data, format, width, height })
  }

  pub(crate) fn zeroed(width: u32, height: u32) -> Self {
    let (width, height) = thumbnail_dimensions(width, height);
    Self {
      data: vec![0u8; calculate_image_size(width, height, 1, THUMBNAIL_FORMAT)].into_boxed_slice(),
      format: THUMBNAIL_FORMAT,
      width,
      height
    }
  }

  /// Box filtered, DXT1 compressed copy of an RGBA8888 image.
  pub fn generate(rgba: &[u8], width: u32, height: u32, options: &ConvertOptions) -> VtfResult<Self> {
    check_len(rgba, width as usize * height as usize * 4)?;
    let (thumbnail_width, thumbnail_height) = thumbnail_dimensions(width, height);
    let resized = resize(rgba, width, height, thumbnail_width, thumbnail_height, MipmapFilter::Box, SharpenFilter::None)?;
    let data = from_rgba8888_with(&resized, thumbnail_width, thumbnail_height, THUMBNAIL_FORMAT, options)?;
    Ok(Self {
      data: data.into_boxed_slice(),
      format: THUMBNAIL_FORMAT,
      width: thumbnail_width,
      height: thumbnail_height
    })
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  pub fn format(&self) -> ImageFormat {
    self.format
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn to_rgba8888(&self, options: &ConvertOptions) -> VtfResult<Vec<u8>> {
    to_rgba8888_with(&self.data, self.width, self.height, self.format, options)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[rstest]
  #[case((64, 64), (16, 16))]
  #[case((256, 64), (16, 4))]
  #[case((16, 16), (16, 16))]
  #[case((8, 2), (8, 2))]
  #[case((1024, 1), (16, 1))]
  fn dimensions(#[case] size: (u32, u32), #[case] expected: (u32, u32)) {
    assert_eq!(thumbnail_dimensions(size.0, size.1), expected);
  }

  #[test]
  fn generated_from_solid_colour() {
    let rgba: Vec<u8> = [0u8, 0, 255, 255].iter().copied().cycle().take(64 * 32 * 4).collect();
    let thumbnail = Thumbnail::generate(&rgba, 64, 32, &ConvertOptions::default()).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (16, 8));
    assert_eq!(thumbnail.format(), ImageFormat::DXT1);
    assert_eq!(thumbnail.data().len(), 4 * 2 * 8);
    let decoded = thumbnail.to_rgba8888(&ConvertOptions::default()).unwrap();
    assert!(decoded.chunks_exact(4).all(|pixel| pixel == [0, 0, 255, 255]));
  }

  #[test]
  fn rejects_wrong_size() {
    assert!(matches!(
      Thumbnail::new(vec![0; 7].into_boxed_slice(), ImageFormat::DXT1, 4, 4),
      Err(VtfError::BufferSize { expected: 8, actual: 7 })
    ));
    assert!(Thumbnail::new(vec![0; 8].into_boxed_slice(), ImageFormat::DXT1, 4, 4).is_ok());
  }
}
