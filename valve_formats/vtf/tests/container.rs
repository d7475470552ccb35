use std::io::Cursor;

use rstest::rstest;
use vtf_engine::{
  CreateOptions, ImageFormat, LodControl, Resource, ResourceType, TextureFlags, TextureLayout, VtfError, VtfTexture
};

fn gradient(width: u32, height: u32) -> Vec<u8> {
  let mut rgba = Vec::with_capacity((width * height * 4) as usize);
  for y in 0..height {
    for x in 0..width {
      rgba.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 77, 200]);
    }
  }
  rgba
}

fn created(version: [u32; 2], format: ImageFormat) -> VtfTexture {
  let options = CreateOptions {
    version,
    format,
    ..Default::default()
  };
  VtfTexture::create_single(&gradient(32, 16), 32, 16, &options).unwrap()
}

#[rstest]
#[case([7, 0], ImageFormat::RGBA8888)]
#[case([7, 1], ImageFormat::DXT1)]
#[case([7, 2], ImageFormat::BGRA8888)]
#[case([7, 3], ImageFormat::DXT5)]
#[case([7, 4], ImageFormat::RGB565)]
#[case([7, 5], ImageFormat::RGBA16161616F)]
fn save_load_save_is_identical(#[case] version: [u32; 2], #[case] format: ImageFormat) {
  let texture = created(version, format);
  let bytes = texture.save_bytes().unwrap();
  assert_eq!(bytes.len(), texture.size().unwrap());

  let loaded = VtfTexture::load_bytes(&bytes, false).unwrap();
  assert_eq!(loaded, texture);
  assert_eq!(loaded.save_bytes().unwrap(), bytes);
}

#[rstest]
#[case([7, 1], 64)]
#[case([7, 2], 80)]
#[case([7, 3], 96)]
fn header_sizes(#[case] version: [u32; 2], #[case] header_size: u32) {
  let bytes = created(version, ImageFormat::RGBA8888).save_bytes().unwrap();
  assert_eq!(&bytes[0..4], b"VTF\0");
  assert_eq!(u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]), header_size);
}

#[test]
fn resources_survive_round_trip() {
  let mut texture = created([7, 3], ImageFormat::DXT1);
  texture.set_resource(Resource::crc(0xDEAD_BEEF)).unwrap();
  texture
    .set_lod_control(LodControl {
      resolution_clamp_u: 5,
      resolution_clamp_v: 6
    })
    .unwrap();
  texture.set_resource(Resource::key_values("\"settings\" { \"x\" \"1\" }")).unwrap();
  texture
    .set_resource(Resource::new(ResourceType::SHEET, vec![1, 2, 3, 4, 5]).unwrap())
    .unwrap();

  let bytes = texture.save_bytes().unwrap();
  let loaded = VtfTexture::load_bytes(&bytes, false).unwrap();
  assert_eq!(loaded.resources(), texture.resources());
  assert_eq!(loaded.resource(ResourceType::CRC).and_then(Resource::inline_value), Some(0xDEAD_BEEF));
  assert_eq!(loaded.lod_control(), Some(LodControl { resolution_clamp_u: 5, resolution_clamp_v: 6 }));
  assert_eq!(
    loaded.resource(ResourceType::KEY_VALUE_DATA).and_then(Resource::as_key_values),
    Some("\"settings\" { \"x\" \"1\" }")
  );
  assert_eq!(loaded.save_bytes().unwrap(), bytes);
}

#[test]
fn resources_are_dropped_before_7_3() {
  let mut texture = created([7, 4], ImageFormat::RGBA8888);
  texture.set_resource(Resource::crc(1)).unwrap();
  texture.set_version([7, 2]).unwrap();
  let loaded = VtfTexture::load_bytes(&texture.save_bytes().unwrap(), false).unwrap();
  assert!(loaded.resources().is_empty());
}

#[test]
fn header_only_load() {
  let texture = created([7, 4], ImageFormat::DXT5);
  let bytes = texture.save_bytes().unwrap();
  let header_only = VtfTexture::load_bytes(&bytes, true).unwrap();
  assert!(!header_only.has_image());
  assert!(header_only.has_thumbnail());
  assert_eq!(header_only.thumbnail(), texture.thumbnail());
  assert_eq!(header_only.layout(), texture.layout());
  assert!(matches!(header_only.rgba8888(0, 0, 0, 0), Err(VtfError::NoBaseLevel)));
}

#[test]
fn load_from_reader_at_offset() {
  let bytes = created([7, 3], ImageFormat::RGBA8888).save_bytes().unwrap();
  let mut padded = vec![0xAAu8; 13];
  padded.extend_from_slice(&bytes);
  let mut cursor = Cursor::new(padded);
  cursor.set_position(13);
  let loaded = VtfTexture::load(&mut cursor, false).unwrap();
  assert_eq!(loaded.save_bytes().unwrap(), bytes);
}

#[test]
fn cubemap_round_trips() {
  let faces: Vec<Vec<u8>> = (0..6u8).map(|face| vec![face * 30; 8 * 8 * 4]).collect();
  let faces: Vec<&[u8]> = faces.iter().map(Vec::as_slice).collect();
  for (version, expected_faces) in [([7, 2], 7), ([7, 5], 6)] {
    let options = CreateOptions {
      version,
      ..Default::default()
    };
    let texture = VtfTexture::create_multiple(&faces, 8, 8, 1, 6, 1, &options).unwrap();
    assert_eq!(texture.faces(), expected_faces);
    let loaded = VtfTexture::load_bytes(&texture.save_bytes().unwrap(), false).unwrap();
    assert_eq!(loaded.faces(), expected_faces);
    assert!(loaded.flag(TextureFlags::ENVMAP));
  }

  let options = CreateOptions {
    sphere_map: false,
    ..Default::default()
  };
  let texture = VtfTexture::create_multiple(&faces, 8, 8, 1, 6, 1, &options).unwrap();
  let bytes = texture.save_bytes().unwrap();
  // a six face cubemap before 7.5 marks the missing sphere map in the start frame field
  assert_eq!(&bytes[26..28], &[0xFF, 0xFF]);
  assert_eq!(VtfTexture::load_bytes(&bytes, false).unwrap().faces(), 6);
}

#[test]
fn volume_texture_round_trips() {
  let slices: Vec<Vec<u8>> = (0..4u8).map(|slice| vec![slice * 60; 4 * 4 * 4]).collect();
  let slices: Vec<&[u8]> = slices.iter().map(Vec::as_slice).collect();
  let texture = VtfTexture::create_multiple(&slices, 4, 4, 1, 1, 4, &CreateOptions::default()).unwrap();
  assert_eq!(texture.mipmap_count(), 3);
  let bytes = texture.save_bytes().unwrap();
  let loaded = VtfTexture::load_bytes(&bytes, false).unwrap();
  assert_eq!(loaded.depth(), 4);
  assert_eq!(loaded.mip_map(1).unwrap().frames[0].faces[0].slices.len(), 2);
  assert_eq!(loaded, texture);
}

#[test]
fn rejects_bad_magic_and_version() {
  let mut bytes = created([7, 2], ImageFormat::RGBA8888).save_bytes().unwrap();
  assert!(VtfTexture::check_file(&mut Cursor::new(&bytes)).unwrap());

  bytes[4] = 8;
  assert!(matches!(
    VtfTexture::load_bytes(&bytes, false),
    Err(VtfError::UnsupportedVersion { major: 8, minor: 2 })
  ));
  bytes[0] = b'X';
  assert!(!VtfTexture::check_file(&mut Cursor::new(&bytes)).unwrap());
  assert!(matches!(VtfTexture::load_bytes(&bytes, false), Err(VtfError::BadMagic)));
}

#[test]
fn truncated_file() {
  let bytes = created([7, 2], ImageFormat::RGBA8888).save_bytes().unwrap();
  assert!(matches!(VtfTexture::load_bytes(&bytes[..bytes.len() - 1], false), Err(VtfError::TruncatedData)));
  assert!(matches!(VtfTexture::load_bytes(&bytes[..40], false), Err(VtfError::TruncatedData)));
  // the pixel data is not needed for a header only load
  assert!(VtfTexture::load_bytes(&bytes[..bytes.len() - 1], true).is_ok());
}

fn patch_u16(bytes: &mut [u8], offset: usize, value: u16) {
  bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[test]
fn oversized_header_dimensions() {
  let options = CreateOptions {
    format: ImageFormat::RGBA32323232F,
    ..Default::default()
  };
  let bytes = VtfTexture::create_single(&gradient(4, 4), 4, 4, &options)
    .unwrap()
    .save_bytes()
    .unwrap();

  // width, height, frames and depth all at their maximum with a single mip level
  let mut huge = bytes.clone();
  patch_u16(&mut huge, 16, 0xFFFF);
  patch_u16(&mut huge, 18, 0xFFFF);
  patch_u16(&mut huge, 24, 0xFFFF);
  patch_u16(&mut huge, 63, 0xFFFF);
  huge[56] = 1;
  assert!(matches!(VtfTexture::load_bytes(&huge, false), Err(VtfError::InvalidParameters(_))));
  assert!(matches!(VtfTexture::load_bytes(&huge, true), Err(VtfError::InvalidParameters(_))));

  // addressable, but far more pixel data than the file holds
  let mut wide = bytes;
  patch_u16(&mut wide, 16, 0xFFFF);
  wide[56] = 1;
  assert!(matches!(VtfTexture::load_bytes(&wide, false), Err(VtfError::TruncatedData)));
}

fn directory_entry(bytes: &mut [u8], index: usize, tag: [u8; 4], value: u32) {
  let offset = 80 + index * 8;
  bytes[offset..offset + 4].copy_from_slice(&tag);
  bytes[offset + 4..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[test]
fn invalid_resource_directories() {
  let mut texture = created([7, 3], ImageFormat::RGBA8888);
  texture.set_resource(Resource::crc(7)).unwrap();
  let bytes = texture.save_bytes().unwrap();
  // thumbnail, CRC, image
  assert_eq!(u32::from_le_bytes([bytes[68], bytes[69], bytes[70], bytes[71]]), 3);

  let mut duplicate = bytes.clone();
  directory_entry(&mut duplicate, 1, [0x01, 0, 0, 0], 104);
  assert!(matches!(
    VtfTexture::load_bytes(&duplicate, false),
    Err(VtfError::InvalidResourceDirectory(_))
  ));

  let mut missing_image = bytes.clone();
  directory_entry(&mut missing_image, 2, *b"ABC\x02", 0);
  assert!(matches!(
    VtfTexture::load_bytes(&missing_image, false),
    Err(VtfError::InvalidResourceDirectory(_))
  ));

  let mut past_end = bytes.clone();
  directory_entry(&mut past_end, 2, [0x30, 0, 0, 0], u32::MAX - 200);
  assert!(matches!(
    VtfTexture::load_bytes(&past_end, false),
    Err(VtfError::InvalidResourceDirectory(_))
  ));

  let mut too_many = bytes;
  too_many[68..72].copy_from_slice(&33u32.to_le_bytes());
  assert!(matches!(
    VtfTexture::load_bytes(&too_many, false),
    Err(VtfError::InvalidResourceDirectory(_))
  ));
}

#[test]
fn unknown_inline_resource_is_kept() {
  let mut texture = created([7, 3], ImageFormat::RGBA8888);
  let custom = ResourceType::from_raw(u32::from_le_bytes(*b"ABC\x02"));
  texture.set_resource(Resource::new(custom, 42u32.to_le_bytes().to_vec()).unwrap()).unwrap();
  let loaded = VtfTexture::load_bytes(&texture.save_bytes().unwrap(), false).unwrap();
  assert_eq!(loaded.resource(custom).and_then(Resource::inline_value), Some(42));
}

#[test]
fn null_data_cannot_be_saved() {
  let texture = VtfTexture::create(TextureLayout::new(16, 16, ImageFormat::DXT1), true, true).unwrap();
  assert!(matches!(texture.save_bytes(), Err(VtfError::NoBaseLevel)));
}
