use std::cmp::max;

use crate::convert::{from_rgba8888_with, to_rgba8888_with, ConvertOptions};
use crate::error::{try_alloc_zeroed, VtfError, VtfResult};
use crate::image_format::{calculate_image_size, checked_image_size, compute_mipmap_count, compute_mipmap_dimensions, ImageFormat};

/// Dimensions and counts that decide how pixel data is laid out.
///
/// Data is stored the way it is in the file: mip levels from smallest to
/// largest, inside a level every frame, inside a frame every face and inside
/// a face every slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureLayout {
  pub width: u32,
  pub height: u32,
  pub depth: u32,
  pub frames: u32,
  pub faces: u32,
  pub mipmap_count: u32,
  pub format: ImageFormat
}

impl TextureLayout {
  /// A single frame, single face 2D layout with a full mip chain.
  pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
    Self {
      width,
      height,
      depth: 1,
      frames: 1,
      faces: 1,
      mipmap_count: compute_mipmap_count(width, height, 1),
      format
    }
  }

  pub fn with_frames(mut self, frames: u32) -> Self {
    self.frames = frames;
    self
  }

  pub fn with_faces(mut self, faces: u32) -> Self {
    self.faces = faces;
    self
  }

  /// Sets the depth and recomputes a full mip chain if the layout had one.
  pub fn with_depth(mut self, depth: u32) -> Self {
    let full = self.mipmap_count == compute_mipmap_count(self.width, self.height, self.depth);
    self.depth = depth;
    if full {
      self.mipmap_count = compute_mipmap_count(self.width, self.height, depth);
    }
    self
  }

  /// Full mip chain when `mipmaps` is set, otherwise only the base level.
  pub fn with_mipmaps(mut self, mipmaps: bool) -> Self {
    self.mipmap_count = if mipmaps { compute_mipmap_count(self.width, self.height, self.depth) } else { 1 };
    self
  }

  pub fn with_format(mut self, format: ImageFormat) -> Self {
    self.format = format;
    self
  }

  pub(crate) fn validate(&self) -> VtfResult<()> {
    if self.width == 0 || self.height == 0 || self.depth == 0 || self.frames == 0 {
      return Err(VtfError::InvalidParameters(format!(
        "dimensions must not be zero ({}x{}x{}, {} frames)",
        self.width, self.height, self.depth, self.frames
      )));
    }
    if self.width > u16::MAX as u32 || self.height > u16::MAX as u32 || self.depth > u16::MAX as u32 || self.frames > u16::MAX as u32 {
      return Err(VtfError::InvalidParameters(format!(
        "dimensions do not fit the header ({}x{}x{}, {} frames)",
        self.width, self.height, self.depth, self.frames
      )));
    }
    if !matches!(self.faces, 1 | 6 | 7) {
      return Err(VtfError::InvalidParameters(format!("face count must be 1, 6 or 7, got {}", self.faces)));
    }
    if self.depth > 1 && self.faces > 1 {
      return Err(VtfError::InvalidParameters("volume textures cannot be cubemaps".to_string()));
    }
    let max_mipmaps = compute_mipmap_count(self.width, self.height, self.depth);
    if self.mipmap_count == 0 || self.mipmap_count > max_mipmaps {
      return Err(VtfError::InvalidParameters(format!(
        "mipmap count {} is outside 1..={}",
        self.mipmap_count, max_mipmaps
      )));
    }
    if !self.format.is_supported() {
      return Err(VtfError::UnsupportedFormat(self.format));
    }
    if self.checked_total_size().is_none() {
      return Err(VtfError::InvalidParameters(format!(
        "{}x{}x{} {:?} with {} frames and {} faces is too large to address",
        self.width, self.height, self.depth, self.format, self.frames, self.faces
      )));
    }
    Ok(())
  }

  /// Width, height and slice count of a mip level.
  pub fn mip_dimensions(&self, level: u32) -> (u32, u32, u32) {
    compute_mipmap_dimensions(self.width, self.height, self.depth, level)
  }

  pub fn slice_count(&self, level: u32) -> u32 {
    max(1, self.depth.checked_shr(level).unwrap_or(0))
  }

  /// Bytes of one 2D slice at `level`.
  pub fn slice_size(&self, level: u32) -> usize {
    let (width, height, _) = self.mip_dimensions(level);
    calculate_image_size(width, height, 1, self.format)
  }

  /// Bytes of every slice of one face at `level`.
  pub fn face_size(&self, level: u32) -> usize {
    self.slice_size(level) * self.slice_count(level) as usize
  }

  /// Bytes of every frame and face at `level`.
  pub fn level_size(&self, level: u32) -> usize {
    self.face_size(level) * self.frames as usize * self.faces as usize
  }

  pub fn total_size(&self) -> usize {
    (0..self.mipmap_count).map(|level| self.level_size(level)).sum()
  }

  /// Like [`total_size`](Self::total_size), `None` on overflow.
  pub fn checked_total_size(&self) -> Option<usize> {
    (0..self.mipmap_count).try_fold(0usize, |total, level| {
      let (width, height, _) = self.mip_dimensions(level);
      let level_size = checked_image_size(width, height, 1, self.format)?
        .checked_mul(self.slice_count(level) as usize)?
        .checked_mul(self.frames as usize)?
        .checked_mul(self.faces as usize)?;
      total.checked_add(level_size)
    })
  }

  /// Offset of the first byte of `level`. Smaller levels come first.
  fn level_offset(&self, level: u32) -> usize {
    (level + 1..self.mipmap_count).map(|smaller| self.level_size(smaller)).sum()
  }

  pub(crate) fn check_cell(&self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<()> {
    let check = |what: &'static str, index: u32, count: u32| {
      if index >= count {
        Err(VtfError::OutOfRange { what, index, count })
      } else {
        Ok(())
      }
    };
    check("mipmap level", level, self.mipmap_count)?;
    check("frame", frame, self.frames)?;
    check("face", face, self.faces)?;
    check("slice", slice, self.slice_count(level))
  }

  /// Byte offset of one cell inside the pixel data.
  pub fn offset(&self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<usize> {
    self.check_cell(frame, face, slice, level)?;
    let face_size = self.face_size(level);
    Ok(
      self.level_offset(level)
        + face_size * (frame as usize * self.faces as usize)
        + face_size * face as usize
        + self.slice_size(level) * slice as usize
    )
  }
}

/// Pixel data of every cell of a texture in one contiguous buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
  layout: TextureLayout,
  bytes: Vec<u8>
}

impl TextureData {
  pub(crate) fn new_zeroed(layout: TextureLayout) -> VtfResult<Self> {
    layout.validate()?;
    let bytes = try_alloc_zeroed(layout.total_size())?;
    Ok(Self { layout, bytes })
  }

  pub(crate) fn from_bytes(layout: TextureLayout, bytes: Vec<u8>) -> VtfResult<Self> {
    let expected = layout.total_size();
    if bytes.len() != expected {
      return Err(VtfError::BufferSize { expected, actual: bytes.len() });
    }
    Ok(Self { layout, bytes })
  }

  pub fn layout(&self) -> &TextureLayout {
    &self.layout
  }

  pub fn format(&self) -> ImageFormat {
    self.layout.format
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn cell(&self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<&[u8]> {
    let offset = self.layout.offset(frame, face, slice, level)?;
    Ok(&self.bytes[offset..offset + self.layout.slice_size(level)])
  }

  pub fn cell_mut(&mut self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<&mut [u8]> {
    let offset = self.layout.offset(frame, face, slice, level)?;
    let size = self.layout.slice_size(level);
    Ok(&mut self.bytes[offset..offset + size])
  }

  pub(crate) fn cell_rgba8888(&self, frame: u32, face: u32, slice: u32, level: u32, options: &ConvertOptions) -> VtfResult<Vec<u8>> {
    let (width, height, _) = self.layout.mip_dimensions(level);
    to_rgba8888_with(self.cell(frame, face, slice, level)?, width, height, self.layout.format, options)
  }

  pub(crate) fn set_cell_rgba8888(
    &mut self,
    frame: u32,
    face: u32,
    slice: u32,
    level: u32,
    rgba: &[u8],
    options: &ConvertOptions
  ) -> VtfResult<()> {
    let (width, height, _) = self.layout.mip_dimensions(level);
    let encoded = from_rgba8888_with(rgba, width, height, self.layout.format, options)?;
    self.cell_mut(frame, face, slice, level)?.copy_from_slice(&encoded);
    Ok(())
  }

  /// Converts every cell to `format`. The receiver is unchanged if a cell fails to convert.
  pub(crate) fn convert(&self, format: ImageFormat, options: &ConvertOptions) -> VtfResult<TextureData> {
    let mut converted = TextureData::new_zeroed(self.layout.with_format(format))?;
    for level in 0..self.layout.mipmap_count {
      for frame in 0..self.layout.frames {
        for face in 0..self.layout.faces {
          for slice in 0..self.layout.slice_count(level) {
            let rgba = self.cell_rgba8888(frame, face, slice, level, options)?;
            converted.set_cell_rgba8888(frame, face, slice, level, &rgba, options)?;
          }
        }
      }
    }
    Ok(converted)
  }

  /// Borrowed view of one mip level, split into frames, faces and slices.
  pub fn mip_map(&self, level: u32) -> VtfResult<MipMap<'_>> {
    self.layout.check_cell(0, 0, 0, level)?;
    let (width, height, depth) = self.layout.mip_dimensions(level);
    let mut frames = Vec::<Frame>::with_capacity(self.layout.frames as usize);
    for frame in 0..self.layout.frames {
      let mut faces = Vec::<Face>::with_capacity(self.layout.faces as usize);
      for face in 0..self.layout.faces {
        let mut slices = Vec::<Slice>::with_capacity(depth as usize);
        for slice in 0..depth {
          slices.push(Slice {
            data: self.cell(frame, face, slice, level)?
          });
        }
        faces.push(Face {
          slices
        });
      }
      frames.push(Frame {
        faces
      });
    }

    Ok(MipMap {
      frames,
      format: self.layout.format,
      width,
      height
    })
  }
}

pub struct MipMap<'a> {
  pub frames: Vec<Frame<'a>>,
  pub format: ImageFormat,
  pub width: u32,
  pub height: u32
}

pub struct Frame<'a> {
  pub faces: Vec<Face<'a>>
}

pub struct Face<'a> {
  pub slices: Vec<Slice<'a>>
}

pub struct Slice<'a> {
  pub data: &'a [u8]
}
