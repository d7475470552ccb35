use std::fmt;

use crate::error::{VtfError, VtfResult};

bitflags! {
  /// Flag byte of a resource directory entry.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
  pub struct ResourceFlags: u8 {
    /// The directory value is the resource itself, there is no data chunk.
    const HAS_NO_DATA_CHUNK = 0x02;
  }
}

/// 24 bit tag plus flag byte, as packed into the first four bytes of a directory entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceType(u32);

impl ResourceType {
  pub const THUMBNAIL: ResourceType = ResourceType::new([0x01, 0, 0], ResourceFlags::empty());
  pub const IMAGE: ResourceType = ResourceType::new([0x30, 0, 0], ResourceFlags::empty());
  /// Particle sheet.
  pub const SHEET: ResourceType = ResourceType::new([0x10, 0, 0], ResourceFlags::empty());
  pub const CRC: ResourceType = ResourceType::new(*b"CRC", ResourceFlags::HAS_NO_DATA_CHUNK);
  /// Clamps the mip levels the engine loads, see [`LodControl`].
  pub const LOD_CONTROL: ResourceType = ResourceType::new(*b"LOD", ResourceFlags::HAS_NO_DATA_CHUNK);
  pub const TEXTURE_SETTINGS_EX: ResourceType = ResourceType::new(*b"TSO", ResourceFlags::HAS_NO_DATA_CHUNK);
  pub const KEY_VALUE_DATA: ResourceType = ResourceType::new(*b"KVD", ResourceFlags::empty());

  pub const fn new(tag: [u8; 3], flags: ResourceFlags) -> Self {
    Self(tag[0] as u32 | (tag[1] as u32) << 8 | (tag[2] as u32) << 16 | (flags.bits() as u32) << 24)
  }

  pub const fn from_raw(raw: u32) -> Self {
    Self(raw)
  }

  pub const fn raw(self) -> u32 {
    self.0
  }

  pub fn tag(self) -> [u8; 3] {
    let bytes = self.0.to_le_bytes();
    [bytes[0], bytes[1], bytes[2]]
  }

  pub fn flags(self) -> ResourceFlags {
    ResourceFlags::from_bits_retain((self.0 >> 24) as u8)
  }

  pub fn has_data_chunk(self) -> bool {
    !self.flags().contains(ResourceFlags::HAS_NO_DATA_CHUNK)
  }

  /// Thumbnail and image entries describe data the texture owns itself.
  pub(crate) fn is_builtin(self) -> bool {
    self == Self::THUMBNAIL || self == Self::IMAGE
  }

  pub(crate) fn is_known(self) -> bool {
    [
      Self::THUMBNAIL,
      Self::IMAGE,
      Self::SHEET,
      Self::CRC,
      Self::LOD_CONTROL,
      Self::TEXTURE_SETTINGS_EX,
      Self::KEY_VALUE_DATA
    ]
    .contains(&self)
  }
}

impl fmt::Debug for ResourceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let tag = self.tag();
    if tag.iter().all(|c| c.is_ascii_alphanumeric()) {
      write!(f, "ResourceType({}, {:?})", String::from_utf8_lossy(&tag), self.flags())
    } else {
      write!(f, "ResourceType({:#010x})", self.0)
    }
  }
}

/// An auxiliary resource stored in the directory of a 7.3+ file.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resource {
  resource_type: ResourceType,
  data: Vec<u8>
}

impl Resource {
  /// Resources without a data chunk carry exactly four bytes, the directory value.
  pub fn new(resource_type: ResourceType, data: Vec<u8>) -> VtfResult<Self> {
    if resource_type.is_builtin() {
      return Err(VtfError::InvalidParameters(format!(
        "{:?} is written from the texture itself",
        resource_type
      )));
    }
    if !resource_type.has_data_chunk() && data.len() != 4 {
      return Err(VtfError::InvalidParameters(format!(
        "{:?} is stored inline and needs 4 bytes, got {}",
        resource_type,
        data.len()
      )));
    }
    if data.len() > u32::MAX as usize {
      return Err(VtfError::InvalidParameters(format!("{:?} is too large", resource_type)));
    }
    Ok(Self { resource_type, data })
  }

  pub(crate) fn inline(resource_type: ResourceType, value: u32) -> Self {
    Self {
      resource_type,
      data: value.to_le_bytes().to_vec()
    }
  }

  pub fn crc(value: u32) -> Self {
    Self::inline(ResourceType::CRC, value)
  }

  /// Key-value text. The text is kept as is, it is not parsed.
  pub fn key_values(text: &str) -> Self {
    Self {
      resource_type: ResourceType::KEY_VALUE_DATA,
      data: text.as_bytes().to_vec()
    }
  }

  pub fn resource_type(&self) -> ResourceType {
    self.resource_type
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// The directory value of an inline resource.
  pub fn inline_value(&self) -> Option<u32> {
    if self.resource_type.has_data_chunk() {
      return None;
    }
    let bytes: [u8; 4] = self.data.as_slice().try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
  }

  pub fn as_key_values(&self) -> Option<&str> {
    if self.resource_type != ResourceType::KEY_VALUE_DATA {
      return None;
    }
    std::str::from_utf8(&self.data).ok()
  }
}

/// Contents of the `LOD` resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LodControl {
  pub resolution_clamp_u: u8,
  pub resolution_clamp_v: u8
}

impl LodControl {
  pub fn to_resource(self) -> Resource {
    Resource::inline(
      ResourceType::LOD_CONTROL,
      u32::from_le_bytes([self.resolution_clamp_u, self.resolution_clamp_v, 0, 0])
    )
  }

  pub fn from_resource(resource: &Resource) -> Option<Self> {
    if resource.resource_type() != ResourceType::LOD_CONTROL {
      return None;
    }
    let bytes = resource.inline_value()?.to_le_bytes();
    Some(Self {
      resolution_clamp_u: bytes[0],
      resolution_clamp_v: bytes[1]
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn packed_ids() {
    assert_eq!(ResourceType::THUMBNAIL.raw(), 0x01);
    assert_eq!(ResourceType::IMAGE.raw(), 0x30);
    assert_eq!(ResourceType::CRC.raw(), 0x0243_5243);
    assert_eq!(ResourceType::LOD_CONTROL.tag(), *b"LOD");
    assert!(!ResourceType::LOD_CONTROL.has_data_chunk());
    assert!(ResourceType::KEY_VALUE_DATA.has_data_chunk());
    assert!(ResourceType::SHEET.is_known());
    assert!(!ResourceType::from_raw(0x0058_5858).is_known());
  }

  #[test]
  fn inline_resources_need_four_bytes() {
    assert!(Resource::new(ResourceType::CRC, vec![1, 2, 3]).is_err());
    let crc = Resource::new(ResourceType::CRC, vec![1, 2, 3, 4]).unwrap();
    assert_eq!(crc.inline_value(), Some(0x0403_0201));
    assert!(Resource::new(ResourceType::IMAGE, vec![]).is_err());
    let sheet = Resource::new(ResourceType::SHEET, vec![9; 10]).unwrap();
    assert_eq!(sheet.inline_value(), None);
  }

  #[test]
  fn lod_control() {
    let lod = LodControl {
      resolution_clamp_u: 8,
      resolution_clamp_v: 6
    };
    let resource = lod.to_resource();
    assert_eq!(resource.data(), &[8, 6, 0, 0]);
    assert_eq!(LodControl::from_resource(&resource), Some(lod));
    assert_eq!(LodControl::from_resource(&Resource::crc(0)), None);
  }

  #[test]
  fn key_values() {
    let resource = Resource::key_values("\"LOD\" { \"pc\" \"1\" }");
    assert_eq!(resource.as_key_values(), Some("\"LOD\" { \"pc\" \"1\" }"));
  }
}
