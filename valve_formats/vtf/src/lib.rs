#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;

extern crate io_util;

mod codec;
mod create;
mod error;
mod header;
mod image_format;
mod mipmap;
mod normal_map;
mod resource;
mod session;
mod sphere_map;
mod texture;
mod texture_data;
mod texture_flags;
mod thumbnail;

pub mod convert;
pub mod transform;

pub use self::create::CreateOptions;
pub use self::error::{VtfError, VtfResult};
pub use self::header::{Header, MAX_VERSION, MIN_VERSION};
pub use self::image_format::{
  compute_image_size, compute_mipmap_count, compute_mipmap_dimensions, compute_mipmap_size, FormatSizeInfo,
  ImageFormat, ImageFormatInfo, IMAGE_FORMAT_NONE
};
pub use self::mipmap::{generate_mip_chain, generate_mip_chain_with};
pub use self::normal_map::{
  convert_to_normal_map, HeightConversionMethod, KernelFilter, NormalAlphaResult, NormalMapOptions
};
pub use self::resource::{LodControl, Resource, ResourceFlags, ResourceType};
pub use self::session::Session;
pub use self::sphere_map::generate_sphere_map;
pub use self::texture::{VtfTexture, DEFAULT_VERSION};
pub use self::texture_data::*;
pub use self::texture_flags::TextureFlags;
pub use self::thumbnail::{thumbnail_dimensions, Thumbnail, THUMBNAIL_FORMAT};
