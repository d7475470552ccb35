use std::io::{Read, Write};

use io_util::{PrimitiveRead, PrimitiveWrite, RawDataRead, RawDataWrite};

use crate::error::{VtfError, VtfResult};
use crate::texture_flags::TextureFlags;

pub(crate) const SIZE_73: u32 = 80;
pub(crate) const SIZE_72: u32 = 80;
pub(crate) const SIZE_71: u32 = 64;

pub(crate) const EXPECTED_SIGNATURE: u32 = 0x00465456;

/// Raw `low_res_image_format` value of a file without a thumbnail.
pub(crate) const NO_FORMAT: u32 = 0xFFFF_FFFF;

/// Start frame written for 6 face cubemaps in files that would otherwise be read as having a sphere map.
pub(crate) const NO_SPHERE_MAP_START_FRAME: u16 = 0xFFFF;

pub(crate) const MAX_RESOURCES: u32 = 32;

pub const MIN_VERSION: [u32; 2] = [7, 0];
pub const MAX_VERSION: [u32; 2] = [7, 5];

pub(crate) fn has_depth(version: [u32; 2]) -> bool {
  version[1] >= 2
}

pub(crate) fn has_resources(version: [u32; 2]) -> bool {
  version[1] >= 3
}

pub(crate) fn check_version(version: [u32; 2]) -> VtfResult<()> {
  if version[0] != MIN_VERSION[0] || version[1] > MAX_VERSION[1] {
    return Err(VtfError::UnsupportedVersion { major: version[0], minor: version[1] });
  }
  Ok(())
}

/// Size of the fixed part of the header, the resource directory not included.
pub(crate) fn fixed_size(version: [u32; 2]) -> u32 {
  if has_resources(version) {
    SIZE_73
  } else if has_depth(version) {
    SIZE_72
  } else {
    SIZE_71
  }
}

/// Header as stored in the file. Raw values are kept raw, interpreting them is up to the codec.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
  /// version[0].version[1]
  pub version: [u32; 2],
  /// Size of the header struct (16 byte aligned) + size of the resource directory (7.3+).
  pub header_size: u32,
  /// Width of the largest mipmap in pixels.
  pub width: u16,
  /// Height of the largest mipmap in pixels.
  pub height: u16,
  pub flags: TextureFlags,
  /// Number of frames, if animated (1 for no animation).
  pub frames: u16,
  /// First frame in animation (0 based).
  pub first_frame: u16,
  pub reflectivity: [f32; 3],
  pub bumpmap_scale: f32,
  /// High resolution image format, raw.
  pub high_res_image_format: u32,
  pub mipmap_count: u8,
  /// Low resolution image format, raw. `0xFFFFFFFF` when there is no thumbnail.
  pub low_res_image_format: u32,
  pub low_res_image_width: u8,
  pub low_res_image_height: u8,

  // 7.2+
  /// Depth of the largest mipmap in pixels. Can be 0 or 1 for a 2D texture.
  pub depth: u16,

  // 7.3+
  pub num_resources: u32
}

impl Header {
  pub fn check_file<T: Read>(reader: &mut T) -> VtfResult<bool> {
    let signature = reader.read_u32()?;
    Ok(signature == EXPECTED_SIGNATURE)
  }

  /// Reads the fixed part of the header, leaving the reader at the start of the resource directory (7.3+)
  /// or at the end of the 16 byte aligned header struct.
  pub fn read<T: Read>(reader: &mut T) -> VtfResult<Self> {
    let signature = reader.read_u32()?;
    if signature != EXPECTED_SIGNATURE {
      return Err(VtfError::BadMagic);
    }
    let version = [reader.read_u32()?, reader.read_u32()?];
    check_version(version)?;
    let header_size = reader.read_u32()?;
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let flags = TextureFlags::from_bits_retain(reader.read_u32()?);
    let frames = reader.read_u16()?;
    let first_frame = reader.read_u16()?;
    reader.skip_bytes(4)?;
    let reflectivity = [reader.read_f32()?, reader.read_f32()?, reader.read_f32()?];
    reader.skip_bytes(4)?;
    let bumpmap_scale = reader.read_f32()?;
    let high_res_image_format = reader.read_u32()?;
    let mipmap_count = reader.read_u8()?;
    let low_res_image_format = reader.read_u32()?;
    let low_res_image_width = reader.read_u8()?;
    let low_res_image_height = reader.read_u8()?;

    let mut read = 63u32;
    let depth = if has_depth(version) {
      read += 2;
      reader.read_u16()?
    } else {
      0u16
    };

    let num_resources = if has_resources(version) {
      reader.skip_bytes(3)?;
      let num_resources = reader.read_u32()?;
      read += 7;
      num_resources
    } else {
      0u32
    };
    reader.skip_bytes((fixed_size(version) - read) as usize)?;

    Ok(Self {
      version,
      header_size,
      width,
      height,
      flags,
      frames,
      first_frame,
      reflectivity,
      bumpmap_scale,
      high_res_image_format,
      mipmap_count,
      low_res_image_format,
      low_res_image_width,
      low_res_image_height,
      depth,
      num_resources
    })
  }

  /// Writes the fixed part of the header. The resource directory is up to the caller.
  pub fn write<T: Write>(&self, writer: &mut T) -> VtfResult<()> {
    check_version(self.version)?;
    writer.write_u32(EXPECTED_SIGNATURE)?;
    writer.write_u32(self.version[0])?;
    writer.write_u32(self.version[1])?;
    writer.write_u32(self.header_size)?;
    writer.write_u16(self.width)?;
    writer.write_u16(self.height)?;
    writer.write_u32(self.flags.bits())?;
    writer.write_u16(self.frames)?;
    writer.write_u16(self.first_frame)?;
    writer.write_zeros(4)?;
    for value in self.reflectivity {
      writer.write_f32(value)?;
    }
    writer.write_zeros(4)?;
    writer.write_f32(self.bumpmap_scale)?;
    writer.write_u32(self.high_res_image_format)?;
    writer.write_u8(self.mipmap_count)?;
    writer.write_u32(self.low_res_image_format)?;
    writer.write_u8(self.low_res_image_width)?;
    writer.write_u8(self.low_res_image_height)?;

    let mut written = 63u32;
    if has_depth(self.version) {
      writer.write_u16(self.depth)?;
      written += 2;
    }
    if has_resources(self.version) {
      writer.write_zeros(3)?;
      writer.write_u32(self.num_resources)?;
      written += 7;
    }
    writer.write_zeros((fixed_size(self.version) - written) as usize)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;
  use std::io::Cursor;

  fn header(version: [u32; 2]) -> Header {
    Header {
      version,
      header_size: fixed_size(version) + if has_resources(version) { 16 } else { 0 },
      width: 256,
      height: 128,
      flags: TextureFlags::CLAMP_S | TextureFlags::EIGHT_BIT_ALPHA,
      frames: 3,
      first_frame: 1,
      reflectivity: [0.25, 0.5, 0.75],
      bumpmap_scale: 1.0,
      high_res_image_format: 15,
      mipmap_count: 9,
      low_res_image_format: 13,
      low_res_image_width: 16,
      low_res_image_height: 8,
      depth: if has_depth(version) { 1 } else { 0 },
      num_resources: if has_resources(version) { 2 } else { 0 }
    }
  }

  #[rstest]
  #[case([7, 0], 64)]
  #[case([7, 1], 64)]
  #[case([7, 2], 80)]
  #[case([7, 3], 80)]
  #[case([7, 5], 80)]
  fn write_then_read(#[case] version: [u32; 2], #[case] size: usize) {
    let header = header(version);
    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();
    assert_eq!(bytes.len(), size);
    assert_eq!(&bytes[0..4], b"VTF\0");

    let mut cursor = Cursor::new(&bytes);
    assert_eq!(Header::read(&mut cursor).unwrap(), header);
    assert_eq!(cursor.position() as usize, size);
  }

  #[test]
  fn field_offsets() {
    let mut bytes = Vec::new();
    header([7, 3]).write(&mut bytes).unwrap();
    assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), 256);
    assert_eq!(u32::from_le_bytes([bytes[52], bytes[53], bytes[54], bytes[55]]), 15);
    assert_eq!(bytes[56], 9);
    assert_eq!(bytes[61], 16);
    assert_eq!(u16::from_le_bytes([bytes[63], bytes[64]]), 1);
    assert_eq!(u32::from_le_bytes([bytes[68], bytes[69], bytes[70], bytes[71]]), 2);
  }

  #[test]
  fn bad_magic() {
    let mut bytes = Vec::new();
    header([7, 2]).write(&mut bytes).unwrap();
    bytes[3] = b'X';
    assert!(matches!(Header::read(&mut Cursor::new(&bytes)), Err(VtfError::BadMagic)));
    assert!(!Header::check_file(&mut Cursor::new(&bytes)).unwrap());
  }

  #[rstest]
  #[case([7, 6])]
  #[case([6, 2])]
  #[case([8, 0])]
  fn unsupported_versions(#[case] version: [u32; 2]) {
    let mut bytes = Vec::new();
    header([7, 2]).write(&mut bytes).unwrap();
    bytes[4..8].copy_from_slice(&version[0].to_le_bytes());
    bytes[8..12].copy_from_slice(&version[1].to_le_bytes());
    assert!(matches!(
      Header::read(&mut Cursor::new(&bytes)),
      Err(VtfError::UnsupportedVersion { major, minor }) if [major, minor] == version
    ));
  }

  #[test]
  fn truncated() {
    let mut bytes = Vec::new();
    header([7, 2]).write(&mut bytes).unwrap();
    bytes.truncate(40);
    assert!(matches!(Header::read(&mut Cursor::new(&bytes)), Err(VtfError::TruncatedData)));
  }
}
