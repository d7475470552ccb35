use std::cmp::max;
use std::collections::HashSet;
use std::convert::TryFrom;
use std::io::{Read, Seek, SeekFrom, Write};

use io_util::{PrimitiveRead, PrimitiveWrite, RawDataRead, StreamLength};
use log::{debug, warn};

use crate::error::{try_alloc_zeroed, VtfError, VtfResult};
use crate::header::{
  fixed_size, has_depth, has_resources, Header, MAX_RESOURCES, NO_FORMAT, NO_SPHERE_MAP_START_FRAME, SIZE_73
};
use crate::image_format::{calculate_image_size, ImageFormat};
use crate::resource::{Resource, ResourceType};
use crate::texture::VtfTexture;
use crate::texture_data::{TextureData, TextureLayout};
use crate::texture_flags::TextureFlags;
use crate::thumbnail::Thumbnail;

/// The face count is not stored, it follows from the flags, the version and the start frame.
pub(crate) fn face_count(version: [u32; 2], flags: TextureFlags, start_frame: u16) -> u32 {
  if !flags.contains(TextureFlags::ENVMAP) {
    1
  } else if version[1] < 5 && start_frame != NO_SPHERE_MAP_START_FRAME {
    7
  } else {
    6
  }
}

/// Whether `version` can describe a texture with this layout.
pub(crate) fn check_layout(version: [u32; 2], layout: &TextureLayout) -> VtfResult<()> {
  if layout.faces == 7 && version[1] >= 5 {
    return Err(VtfError::InvalidParameters(format!(
      "version {}.{} files cannot hold a sphere map face",
      version[0], version[1]
    )));
  }
  if layout.depth > 1 && !has_depth(version) {
    return Err(VtfError::InvalidParameters(format!(
      "version {}.{} files cannot hold volume textures",
      version[0], version[1]
    )));
  }
  Ok(())
}

fn directory_error<T>(message: String) -> VtfResult<T> {
  Err(VtfError::InvalidResourceDirectory(message))
}

fn check_range(offset: u64, len: u64, stream_len: u64, what: &str) -> VtfResult<()> {
  match offset.checked_add(len) {
    Some(end) if end <= stream_len => Ok(()),
    _ => directory_error(format!(
      "{} at offset {} with {} bytes runs past the end of the file ({} bytes)",
      what, offset, len, stream_len
    ))
  }
}

struct Directory {
  thumbnail_offset: Option<u64>,
  image_offset: u64,
  resources: Vec<Resource>
}

fn read_directory<R: Read + Seek>(reader: &mut R, header: &Header, start: u64, stream_len: u64) -> VtfResult<Directory> {
  if header.num_resources > MAX_RESOURCES {
    return directory_error(format!("{} entries, at most {} are allowed", header.num_resources, MAX_RESOURCES));
  }
  let directory_end = SIZE_73 as u64 + 8 * header.num_resources as u64;
  if (header.header_size as u64) < directory_end {
    return directory_error(format!(
      "header size {} does not cover {} entries",
      header.header_size, header.num_resources
    ));
  }

  let mut entries = Vec::<(ResourceType, u32)>::with_capacity(header.num_resources as usize);
  let mut seen = HashSet::<ResourceType>::new();
  for _ in 0..header.num_resources {
    let resource_type = ResourceType::from_raw(reader.read_u32()?);
    let value = reader.read_u32()?;
    if !seen.insert(resource_type) {
      return directory_error(format!("duplicate entry {:?}", resource_type));
    }
    entries.push((resource_type, value));
  }

  let mut directory = Directory {
    thumbnail_offset: None,
    image_offset: 0,
    resources: Vec::new()
  };
  let mut has_image = false;
  for (resource_type, value) in entries {
    if resource_type == ResourceType::THUMBNAIL {
      check_range(start + value as u64, 0, stream_len, "thumbnail")?;
      directory.thumbnail_offset = Some(start + value as u64);
    } else if resource_type == ResourceType::IMAGE {
      check_range(start + value as u64, 0, stream_len, "image data")?;
      directory.image_offset = start + value as u64;
      has_image = true;
    } else {
      if !resource_type.is_known() {
        warn!("unknown resource {:?}", resource_type);
      }
      if resource_type.has_data_chunk() {
        let offset = start + value as u64;
        check_range(offset, 4, stream_len, "resource length")?;
        reader.seek(SeekFrom::Start(offset))?;
        let len = reader.read_u32()? as u64;
        check_range(offset + 4, len, stream_len, "resource data")?;
        let data = reader.read_data_exact(len as usize)?;
        directory.resources.push(Resource::new(resource_type, data.into_vec())?);
      } else {
        directory.resources.push(Resource::inline(resource_type, value));
      }
    }
  }

  if !has_image {
    return directory_error("missing image entry".to_string());
  }
  Ok(directory)
}

/// Reads a texture. In header only mode everything but the pixel data is loaded.
pub(crate) fn read<R: Read + Seek>(reader: &mut R, header_only: bool) -> VtfResult<VtfTexture> {
  let start = reader.stream_position()?;
  let stream_len = reader.stream_length()?;
  let header = Header::read(reader)?;

  let format = ImageFormat::try_from(header.high_res_image_format as i32)?;
  let faces = face_count(header.version, header.flags, header.first_frame);
  let layout = TextureLayout {
    width: header.width as u32,
    height: header.height as u32,
    depth: max(1, header.depth as u32),
    frames: max(1, header.frames as u32),
    faces,
    mipmap_count: header.mipmap_count as u32,
    format
  };
  layout.validate()?;

  let thumbnail_format = ImageFormat::from_raw(header.low_res_image_format)?;
  let thumbnail_size = match thumbnail_format {
    Some(format) if header.low_res_image_width != 0 && header.low_res_image_height != 0 => {
      calculate_image_size(header.low_res_image_width as u32, header.low_res_image_height as u32, 1, format)
    }
    _ => 0
  };

  let directory = if has_resources(header.version) {
    read_directory(reader, &header, start, stream_len)?
  } else {
    let thumbnail_offset = start + header.header_size as u64;
    Directory {
      thumbnail_offset: if thumbnail_size > 0 { Some(thumbnail_offset) } else { None },
      image_offset: thumbnail_offset + thumbnail_size as u64,
      resources: Vec::new()
    }
  };

  let mut thumbnail = None;
  if let (Some(offset), Some(format)) = (directory.thumbnail_offset, thumbnail_format) {
    if thumbnail_size == 0 || !format.is_supported() {
      warn!("ignoring thumbnail of format {:?}", format);
    } else {
      reader.seek(SeekFrom::Start(offset))?;
      let data = reader.read_data_exact(thumbnail_size)?;
      thumbnail = Some(Thumbnail::new(
        data,
        format,
        header.low_res_image_width as u32,
        header.low_res_image_height as u32
      )?);
    }
  }

  let data = if header_only {
    None
  } else {
    let size = layout.total_size();
    match directory.image_offset.checked_add(size as u64) {
      Some(end) if end <= stream_len => {}
      _ => return Err(VtfError::TruncatedData)
    }
    reader.seek(SeekFrom::Start(directory.image_offset))?;
    let mut bytes = try_alloc_zeroed(size)?;
    reader.read_exact(&mut bytes)?;
    Some(TextureData::from_bytes(layout, bytes)?)
  };

  let start_frame = if faces == 6 && header.first_frame == NO_SPHERE_MAP_START_FRAME {
    0
  } else {
    header.first_frame as u32
  };

  debug!(
    "read VTF {}.{}: {}x{}x{} {:?}, {} frames, {} faces, {} mipmaps, {} resources{}",
    header.version[0],
    header.version[1],
    layout.width,
    layout.height,
    layout.depth,
    layout.format,
    layout.frames,
    layout.faces,
    layout.mipmap_count,
    directory.resources.len(),
    if header_only { ", header only" } else { "" }
  );

  Ok(VtfTexture {
    version: header.version,
    layout,
    flags: header.flags,
    start_frame,
    bump_scale: header.bumpmap_scale,
    reflectivity: header.reflectivity,
    thumbnail,
    resources: directory.resources,
    data
  })
}

/// Byte layout of a file about to be written.
struct Plan<'a> {
  header: Header,
  directory: Vec<(ResourceType, u32)>,
  chunks: Vec<&'a Resource>
}

fn plan(texture: &VtfTexture) -> VtfResult<Plan<'_>> {
  let version = texture.version;
  let layout = &texture.layout;
  check_layout(version, layout)?;

  let mut flags = texture.flags;
  flags.set(TextureFlags::ENVMAP, layout.faces >= 6);
  let first_frame = if layout.faces == 6 && version[1] < 5 {
    NO_SPHERE_MAP_START_FRAME
  } else {
    texture.start_frame as u16
  };

  let thumbnail_size = texture.thumbnail.as_ref().map_or(0, |thumbnail| thumbnail.data().len()) as u32;
  let mut directory = Vec::<(ResourceType, u32)>::new();
  let mut chunks = Vec::<&Resource>::new();
  let header_size = if has_resources(version) {
    let count = texture.resources.len() as u32 + 1 + texture.thumbnail.is_some() as u32;
    if count > MAX_RESOURCES {
      return directory_error(format!("{} entries, at most {} are allowed", count, MAX_RESOURCES));
    }
    let header_size = SIZE_73 + 8 * count;

    let mut offset = header_size;
    if texture.thumbnail.is_some() {
      directory.push((ResourceType::THUMBNAIL, offset));
      offset += thumbnail_size;
    }
    for resource in &texture.resources {
      match resource.inline_value() {
        Some(value) => directory.push((resource.resource_type(), value)),
        None => {
          directory.push((resource.resource_type(), offset));
          chunks.push(resource);
          offset += 4 + resource.data().len() as u32;
        }
      }
    }
    directory.push((ResourceType::IMAGE, offset));
    header_size
  } else {
    if !texture.resources.is_empty() {
      warn!(
        "{} resources are not written, version {}.{} has no resource directory",
        texture.resources.len(),
        version[0],
        version[1]
      );
    }
    fixed_size(version)
  };

  let header = Header {
    version,
    header_size,
    width: layout.width as u16,
    height: layout.height as u16,
    flags,
    frames: layout.frames as u16,
    first_frame,
    reflectivity: texture.reflectivity,
    bumpmap_scale: texture.bump_scale,
    high_res_image_format: layout.format as u32,
    mipmap_count: layout.mipmap_count as u8,
    low_res_image_format: texture.thumbnail.as_ref().map_or(NO_FORMAT, |thumbnail| thumbnail.format() as u32),
    low_res_image_width: texture.thumbnail.as_ref().map_or(0, |thumbnail| thumbnail.width() as u8),
    low_res_image_height: texture.thumbnail.as_ref().map_or(0, |thumbnail| thumbnail.height() as u8),
    depth: layout.depth as u16,
    num_resources: directory.len() as u32
  };

  Ok(Plan { header, directory, chunks })
}

/// Size of the file [`write`] produces.
pub(crate) fn serialized_size(texture: &VtfTexture) -> VtfResult<usize> {
  let plan = plan(texture)?;
  let thumbnail = texture.thumbnail.as_ref().map_or(0, |thumbnail| thumbnail.data().len());
  let chunks: usize = plan.chunks.iter().map(|resource| 4 + resource.data().len()).sum();
  Ok(plan.header.header_size as usize + thumbnail + chunks + texture.layout.total_size())
}

pub(crate) fn write<W: Write>(texture: &VtfTexture, writer: &mut W) -> VtfResult<()> {
  let data = texture.data.as_ref().ok_or(VtfError::NoBaseLevel)?;
  let plan = plan(texture)?;

  plan.header.write(writer)?;
  for (resource_type, value) in &plan.directory {
    writer.write_u32(resource_type.raw())?;
    writer.write_u32(*value)?;
  }
  if let Some(thumbnail) = &texture.thumbnail {
    writer.write_all(thumbnail.data())?;
  }
  for resource in &plan.chunks {
    writer.write_u32(resource.data().len() as u32)?;
    writer.write_all(resource.data())?;
  }
  writer.write_all(data.as_bytes())?;

  debug!(
    "wrote VTF {}.{}: {}x{} {:?}, {} directory entries",
    texture.version[0],
    texture.version[1],
    texture.layout.width,
    texture.layout.height,
    texture.layout.format,
    plan.directory.len()
  );
  Ok(())
}
