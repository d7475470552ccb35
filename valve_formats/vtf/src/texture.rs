use std::cmp::min;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use crate::codec;
use crate::convert::{convert_with, ConvertOptions};
use crate::create::{create_texture, CreateOptions};
use crate::error::{VtfError, VtfResult};
use crate::header::{check_version, Header, MAX_RESOURCES};
use crate::image_format::{compute_mipmap_count, ImageFormat};
use crate::mipmap;
use crate::normal_map::{convert_to_normal_map, NormalMapOptions};
use crate::resource::{LodControl, Resource, ResourceType};
use crate::sphere_map::generate_sphere_map;
use crate::texture_data::{MipMap, TextureData, TextureLayout};
use crate::texture_flags::TextureFlags;
use crate::thumbnail::Thumbnail;
use crate::transform::{self, MipmapFilter, SharpenFilter, SharpenOptions};

pub const DEFAULT_VERSION: [u32; 2] = [7, 2];

/// Directory entries the codec adds for the thumbnail and the image.
const RESERVED_RESOURCES: usize = 2;

/// One texture with all of its pixel data, thumbnail and resources.
#[derive(Clone, Debug, PartialEq)]
pub struct VtfTexture {
  pub(crate) version: [u32; 2],
  pub(crate) layout: TextureLayout,
  pub(crate) flags: TextureFlags,
  pub(crate) start_frame: u32,
  pub(crate) bump_scale: f32,
  pub(crate) reflectivity: [f32; 3],
  pub(crate) thumbnail: Option<Thumbnail>,
  pub(crate) resources: Vec<Resource>,
  pub(crate) data: Option<TextureData>
}

impl VtfTexture {
  pub fn check_file<T: Read>(reader: &mut T) -> VtfResult<bool> {
    Header::check_file(reader)
  }

  /// An empty texture. With `null_data` no pixel buffer is allocated, like
  /// a texture loaded header only.
  pub fn create(layout: TextureLayout, thumbnail: bool, null_data: bool) -> VtfResult<Self> {
    layout.validate()?;
    let mut flags = TextureFlags::empty();
    flags.set(TextureFlags::ENVMAP, layout.faces >= 6);
    Ok(Self {
      version: DEFAULT_VERSION,
      layout,
      flags,
      start_frame: 0,
      bump_scale: 1.0,
      reflectivity: [1.0; 3],
      thumbnail: if thumbnail { Some(Thumbnail::zeroed(layout.width, layout.height)) } else { None },
      resources: Vec::new(),
      data: if null_data { None } else { Some(TextureData::new_zeroed(layout)?) }
    })
  }

  /// Builds a texture from one RGBA8888 image.
  pub fn create_single(rgba: &[u8], width: u32, height: u32, options: &CreateOptions) -> VtfResult<Self> {
    create_texture(
      &[rgba],
      width,
      height,
      1,
      1,
      1,
      options,
      &ConvertOptions::default(),
      &SharpenOptions::default()
    )
  }

  /// Builds a texture from `frames * faces * depth` RGBA8888 images, ordered
  /// by frame, then face, then slice.
  pub fn create_multiple(
    images: &[&[u8]],
    width: u32,
    height: u32,
    frames: u32,
    faces: u32,
    depth: u32,
    options: &CreateOptions
  ) -> VtfResult<Self> {
    create_texture(
      images,
      width,
      height,
      frames,
      faces,
      depth,
      options,
      &ConvertOptions::default(),
      &SharpenOptions::default()
    )
  }

  pub fn load<R: Read + Seek>(reader: &mut R, header_only: bool) -> VtfResult<Self> {
    codec::read(reader, header_only)
  }

  pub fn load_bytes(bytes: &[u8], header_only: bool) -> VtfResult<Self> {
    Self::load(&mut Cursor::new(bytes), header_only)
  }

  pub fn load_path<P: AsRef<Path>>(path: P, header_only: bool) -> VtfResult<Self> {
    let mut reader = BufReader::new(File::open(path)?);
    Self::load(&mut reader, header_only)
  }

  pub fn save<W: Write>(&self, writer: &mut W) -> VtfResult<()> {
    codec::write(self, writer)
  }

  pub fn save_bytes(&self) -> VtfResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(self.size()?);
    self.save(&mut bytes)?;
    Ok(bytes)
  }

  pub fn save_path<P: AsRef<Path>>(&self, path: P) -> VtfResult<()> {
    if self.data.is_none() {
      return Err(VtfError::NoBaseLevel);
    }
    let mut writer = BufWriter::new(File::create(path)?);
    self.save(&mut writer)?;
    writer.flush()?;
    Ok(())
  }

  /// Size of the file [`VtfTexture::save`] writes.
  pub fn size(&self) -> VtfResult<usize> {
    codec::serialized_size(self)
  }

  pub fn version(&self) -> [u32; 2] {
    self.version
  }

  pub fn set_version(&mut self, version: [u32; 2]) -> VtfResult<()> {
    check_version(version)?;
    codec::check_layout(version, &self.layout)?;
    self.version = version;
    Ok(())
  }

  pub fn layout(&self) -> &TextureLayout {
    &self.layout
  }

  pub fn width(&self) -> u32 {
    self.layout.width
  }

  pub fn height(&self) -> u32 {
    self.layout.height
  }

  pub fn depth(&self) -> u32 {
    self.layout.depth
  }

  pub fn frames(&self) -> u32 {
    self.layout.frames
  }

  pub fn faces(&self) -> u32 {
    self.layout.faces
  }

  pub fn mipmap_count(&self) -> u32 {
    self.layout.mipmap_count
  }

  pub fn format(&self) -> ImageFormat {
    self.layout.format
  }

  pub fn flags(&self) -> TextureFlags {
    self.flags
  }

  /// Replaces the flags. `ENVMAP` always follows the face count.
  pub fn set_flags(&mut self, mut flags: TextureFlags) {
    flags.set(TextureFlags::ENVMAP, self.layout.faces >= 6);
    self.flags = flags;
  }

  pub fn flag(&self, flag: TextureFlags) -> bool {
    self.flags.contains(flag)
  }

  pub fn set_flag(&mut self, flag: TextureFlags, value: bool) {
    let mut flags = self.flags;
    flags.set(flag, value);
    self.set_flags(flags);
  }

  pub fn start_frame(&self) -> u32 {
    self.start_frame
  }

  pub fn set_start_frame(&mut self, start_frame: u32) -> VtfResult<()> {
    if start_frame >= self.layout.frames {
      return Err(VtfError::OutOfRange {
        what: "start frame",
        index: start_frame,
        count: self.layout.frames
      });
    }
    self.start_frame = start_frame;
    Ok(())
  }

  pub fn bump_scale(&self) -> f32 {
    self.bump_scale
  }

  pub fn set_bump_scale(&mut self, bump_scale: f32) {
    self.bump_scale = bump_scale;
  }

  pub fn reflectivity(&self) -> [f32; 3] {
    self.reflectivity
  }

  pub fn set_reflectivity(&mut self, reflectivity: [f32; 3]) {
    self.reflectivity = reflectivity;
  }

  pub fn has_image(&self) -> bool {
    self.data.is_some()
  }

  pub fn has_thumbnail(&self) -> bool {
    self.thumbnail.is_some()
  }

  pub fn thumbnail(&self) -> Option<&Thumbnail> {
    self.thumbnail.as_ref()
  }

  pub fn set_thumbnail(&mut self, thumbnail: Option<Thumbnail>) {
    self.thumbnail = thumbnail;
  }

  pub fn texture_data(&self) -> Option<&TextureData> {
    self.data.as_ref()
  }

  fn base(&self) -> VtfResult<&TextureData> {
    self.data.as_ref().ok_or(VtfError::NoBaseLevel)
  }

  fn base_mut(&mut self) -> VtfResult<&mut TextureData> {
    self.data.as_mut().ok_or(VtfError::NoBaseLevel)
  }

  /// Raw bytes of one cell in the texture format.
  pub fn data(&self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<&[u8]> {
    self.base()?.cell(frame, face, slice, level)
  }

  pub fn data_mut(&mut self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<&mut [u8]> {
    self.base_mut()?.cell_mut(frame, face, slice, level)
  }

  /// Replaces one cell. `bytes` has to be exactly the size of the cell.
  pub fn set_data(&mut self, frame: u32, face: u32, slice: u32, level: u32, bytes: &[u8]) -> VtfResult<()> {
    let cell = self.data_mut(frame, face, slice, level)?;
    if cell.len() != bytes.len() {
      return Err(VtfError::BufferSize { expected: cell.len(), actual: bytes.len() });
    }
    cell.copy_from_slice(bytes);
    Ok(())
  }

  pub fn rgba8888(&self, frame: u32, face: u32, slice: u32, level: u32) -> VtfResult<Vec<u8>> {
    self.rgba8888_with(frame, face, slice, level, &ConvertOptions::default())
  }

  pub fn rgba8888_with(&self, frame: u32, face: u32, slice: u32, level: u32, options: &ConvertOptions) -> VtfResult<Vec<u8>> {
    self.base()?.cell_rgba8888(frame, face, slice, level, options)
  }

  pub fn set_rgba8888(&mut self, frame: u32, face: u32, slice: u32, level: u32, rgba: &[u8]) -> VtfResult<()> {
    self.set_rgba8888_with(frame, face, slice, level, rgba, &ConvertOptions::default())
  }

  pub fn set_rgba8888_with(
    &mut self,
    frame: u32,
    face: u32,
    slice: u32,
    level: u32,
    rgba: &[u8],
    options: &ConvertOptions
  ) -> VtfResult<()> {
    self.base_mut()?.set_cell_rgba8888(frame, face, slice, level, rgba, options)
  }

  /// One cell converted to `format`.
  pub fn data_as(
    &self,
    frame: u32,
    face: u32,
    slice: u32,
    level: u32,
    format: ImageFormat,
    options: &ConvertOptions
  ) -> VtfResult<Vec<u8>> {
    let (width, height, _) = self.layout.mip_dimensions(level);
    let cell = self.data(frame, face, slice, level)?;
    convert_with(cell, width, height, self.layout.format, format, options)
  }

  /// Replaces one cell with `src`, converted from `format`.
  #[allow(clippy::too_many_arguments)]
  pub fn set_data_from(
    &mut self,
    frame: u32,
    face: u32,
    slice: u32,
    level: u32,
    src: &[u8],
    format: ImageFormat,
    options: &ConvertOptions
  ) -> VtfResult<()> {
    let (width, height, _) = self.layout.mip_dimensions(level);
    let converted = convert_with(src, width, height, format, self.layout.format, options)?;
    self.set_data(frame, face, slice, level, &converted)
  }

  pub fn mip_map(&self, level: u32) -> VtfResult<MipMap<'_>> {
    self.base()?.mip_map(level)
  }

  pub fn resources(&self) -> &[Resource] {
    &self.resources
  }

  pub fn resource(&self, resource_type: ResourceType) -> Option<&Resource> {
    self.resources.iter().find(|resource| resource.resource_type() == resource_type)
  }

  /// Adds a resource or replaces the one with the same type.
  pub fn set_resource(&mut self, resource: Resource) -> VtfResult<()> {
    if self.version < [7, 3] {
      return Err(VtfError::InvalidParameters(format!(
        "version {}.{} files cannot hold resources",
        self.version[0], self.version[1]
      )));
    }
    if let Some(existing) = self
      .resources
      .iter_mut()
      .find(|existing| existing.resource_type() == resource.resource_type())
    {
      *existing = resource;
      return Ok(());
    }
    if self.resources.len() + RESERVED_RESOURCES >= MAX_RESOURCES as usize {
      return Err(VtfError::InvalidResourceDirectory("too many resources".to_string()));
    }
    self.resources.push(resource);
    Ok(())
  }

  pub fn remove_resource(&mut self, resource_type: ResourceType) -> Option<Resource> {
    let index = self
      .resources
      .iter()
      .position(|resource| resource.resource_type() == resource_type)?;
    Some(self.resources.remove(index))
  }

  pub fn lod_control(&self) -> Option<LodControl> {
    self.resource(ResourceType::LOD_CONTROL).and_then(LodControl::from_resource)
  }

  pub fn set_lod_control(&mut self, lod: LodControl) -> VtfResult<()> {
    self.set_resource(lod.to_resource())
  }

  pub fn generate_thumbnail(&mut self) -> VtfResult<()> {
    self.generate_thumbnail_with(&ConvertOptions::default())
  }

  /// Thumbnail of the base level of the start frame.
  pub fn generate_thumbnail_with(&mut self, options: &ConvertOptions) -> VtfResult<()> {
    let frame = min(self.start_frame, self.layout.frames - 1);
    let rgba = self.rgba8888_with(frame, 0, 0, 0, options)?;
    self.thumbnail = Some(Thumbnail::generate(&rgba, self.layout.width, self.layout.height, options)?);
    Ok(())
  }

  /// Mean colour of the base level over every frame, face and slice.
  pub fn compute_reflectivity(&mut self) -> VtfResult<()> {
    self.compute_reflectivity_with(&ConvertOptions::default())
  }

  pub fn compute_reflectivity_with(&mut self, options: &ConvertOptions) -> VtfResult<()> {
    let layout = self.layout;
    let mut sum = [0f32; 3];
    let mut count = 0f32;
    for frame in 0..layout.frames {
      for face in 0..layout.faces {
        for slice in 0..layout.depth {
          let rgba = self.rgba8888_with(frame, face, slice, 0, options)?;
          let value = transform::compute_reflectivity(&rgba, layout.width, layout.height)?;
          for (sum, value) in sum.iter_mut().zip(value) {
            *sum += value;
          }
          count += 1.0;
        }
      }
    }
    self.reflectivity = sum.map(|sum| sum / count);
    Ok(())
  }

  pub fn generate_mipmaps(&mut self, frame: u32, face: u32, filter: MipmapFilter, sharpen: SharpenFilter) -> VtfResult<()> {
    self.generate_mipmaps_with(
      frame,
      face,
      filter,
      sharpen,
      &ConvertOptions::default(),
      &SharpenOptions::default()
    )
  }

  pub fn generate_mipmaps_with(
    &mut self,
    frame: u32,
    face: u32,
    filter: MipmapFilter,
    sharpen: SharpenFilter,
    convert_options: &ConvertOptions,
    sharpen_options: &SharpenOptions
  ) -> VtfResult<()> {
    let data = self.base_mut()?;
    mipmap::generate_mipmaps(data, frame, face, filter, sharpen, convert_options, sharpen_options)
  }

  /// Regenerates the mip chain of every frame and face. Levels already
  /// written stay written when a later frame fails.
  pub fn generate_all_mipmaps(&mut self, filter: MipmapFilter, sharpen: SharpenFilter) -> VtfResult<()> {
    self.generate_all_mipmaps_with(filter, sharpen, &ConvertOptions::default(), &SharpenOptions::default())
  }

  pub fn generate_all_mipmaps_with(
    &mut self,
    filter: MipmapFilter,
    sharpen: SharpenFilter,
    convert_options: &ConvertOptions,
    sharpen_options: &SharpenOptions
  ) -> VtfResult<()> {
    let layout = self.layout;
    for frame in 0..layout.frames {
      for face in 0..layout.faces {
        self.generate_mipmaps_with(frame, face, filter, sharpen, convert_options, sharpen_options)?;
      }
    }
    Ok(())
  }

  /// Turns the base level of every face and slice of `frame` into a normal map.
  pub fn generate_normal_map(&mut self, frame: u32, options: &NormalMapOptions) -> VtfResult<()> {
    self.generate_normal_map_with(frame, options, &ConvertOptions::default())
  }

  pub fn generate_normal_map_with(
    &mut self,
    frame: u32,
    options: &NormalMapOptions,
    convert_options: &ConvertOptions
  ) -> VtfResult<()> {
    let layout = self.layout;
    let data = self.base_mut()?;
    layout.check_cell(frame, 0, 0, 0)?;
    for face in 0..layout.faces {
      for slice in 0..layout.depth {
        let rgba = data.cell_rgba8888(frame, face, slice, 0, convert_options)?;
        let normals = convert_to_normal_map(&rgba, layout.width, layout.height, options)?;
        data.set_cell_rgba8888(frame, face, slice, 0, &normals, convert_options)?;
      }
    }
    self.flags.insert(TextureFlags::NORMAL);
    Ok(())
  }

  pub fn generate_all_normal_maps(&mut self, options: &NormalMapOptions) -> VtfResult<()> {
    self.generate_all_normal_maps_with(options, &ConvertOptions::default())
  }

  pub fn generate_all_normal_maps_with(&mut self, options: &NormalMapOptions, convert_options: &ConvertOptions) -> VtfResult<()> {
    for frame in 0..self.layout.frames {
      self.generate_normal_map_with(frame, options, convert_options)?;
    }
    Ok(())
  }

  /// Renders the seventh face of every frame from the other six.
  pub fn generate_sphere_map(&mut self) -> VtfResult<()> {
    self.generate_sphere_map_with(&ConvertOptions::default())
  }

  pub fn generate_sphere_map_with(&mut self, options: &ConvertOptions) -> VtfResult<()> {
    let layout = self.layout;
    if layout.faces != 7 {
      return Err(VtfError::RequiresCubemap);
    }
    let data = self.base_mut()?;
    for frame in 0..layout.frames {
      let mut faces = Vec::with_capacity(6);
      for face in 0..6 {
        faces.push(data.cell_rgba8888(frame, face, 0, 0, options)?);
      }
      let sphere = generate_sphere_map(
        [
          faces[0].as_slice(),
          faces[1].as_slice(),
          faces[2].as_slice(),
          faces[3].as_slice(),
          faces[4].as_slice(),
          faces[5].as_slice()
        ],
        layout.width,
        layout.height
      )?;
      data.set_cell_rgba8888(frame, 6, 0, 0, &sphere, options)?;
    }
    Ok(())
  }

  pub fn convert_format(&mut self, format: ImageFormat) -> VtfResult<()> {
    self.convert_format_with(format, &ConvertOptions::default())
  }

  /// Converts all pixel data and updates the alpha flags to match `format`.
  pub fn convert_format_with(&mut self, format: ImageFormat, options: &ConvertOptions) -> VtfResult<()> {
    let layout = self.layout.with_format(format);
    layout.validate()?;
    let converted = self.base()?.convert(format, options)?;
    self.data = Some(converted);
    self.layout = layout;
    self.update_alpha_flags();
    Ok(())
  }

  pub(crate) fn update_alpha_flags(&mut self) {
    let alpha_bits = self.layout.format.info().alpha_bits_per_pixel();
    self.flags.set(TextureFlags::ONE_BIT_ALPHA, alpha_bits == 1);
    self.flags.set(TextureFlags::EIGHT_BIT_ALPHA, alpha_bits > 1);
  }

  /// Replaces every cell with a resampled copy of `width` x `height`. The mip
  /// chain is rebuilt from the resized base level.
  pub fn resize(
    &mut self,
    width: u32,
    height: u32,
    filter: MipmapFilter,
    sharpen: SharpenFilter,
    options: &ConvertOptions
  ) -> VtfResult<()> {
    let old = self.layout;
    let mut layout = old;
    layout.width = width;
    layout.height = height;
    layout.mipmap_count = if old.mipmap_count > 1 {
      compute_mipmap_count(width, height, old.depth)
    } else {
      1
    };
    layout.validate()?;

    let source = self.base()?;
    let mut resized = TextureData::new_zeroed(layout)?;
    for frame in 0..old.frames {
      for face in 0..old.faces {
        for slice in 0..old.depth {
          let rgba = source.cell_rgba8888(frame, face, slice, 0, options)?;
          let rgba = transform::resize(&rgba, old.width, old.height, width, height, filter, sharpen)?;
          resized.set_cell_rgba8888(frame, face, slice, 0, &rgba, options)?;
        }
      }
    }
    for frame in 0..old.frames {
      for face in 0..old.faces {
        mipmap::generate_mipmaps(
          &mut resized,
          frame,
          face,
          filter,
          SharpenFilter::None,
          options,
          &SharpenOptions::default()
        )?;
      }
    }
    self.data = Some(resized);
    self.layout = layout;
    Ok(())
  }
}
