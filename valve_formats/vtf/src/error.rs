use std::collections::TryReserveError;
use std::io::{Error as IOError, ErrorKind};

use thiserror::Error;

use crate::image_format::ImageFormat;

#[derive(Debug, Error)]
pub enum VtfError {
  #[error("file is not a VTF file")]
  BadMagic,
  #[error("unsupported VTF version {major}.{minor}")]
  UnsupportedVersion { major: u32, minor: u32 },
  #[error("unexpected end of data")]
  TruncatedData,
  #[error("invalid resource directory: {0}")]
  InvalidResourceDirectory(String),
  #[error("unknown image format {0}")]
  UnknownFormat(i32),
  #[error("image format {0:?} is not supported")]
  UnsupportedFormat(ImageFormat),
  #[error("cannot convert from {from:?} to {to:?}")]
  UnsupportedConversion { from: ImageFormat, to: ImageFormat },
  #[error("no base level image data")]
  NoBaseLevel,
  #[error("operation requires a cubemap with a sphere map face")]
  RequiresCubemap,
  #[error("no image bound")]
  NoImageBound,
  #[error("could not allocate {0} bytes")]
  AllocationFailure(usize),
  #[error("buffer holds {actual} bytes, expected {expected}")]
  BufferSize { expected: usize, actual: usize },
  #[error("{what} {index} is out of range (count {count})")]
  OutOfRange { what: &'static str, index: u32, count: u32 },
  #[error("invalid parameters: {0}")]
  InvalidParameters(String),
  #[error("I/O error: {0}")]
  Io(IOError),
}

pub type VtfResult<T> = Result<T, VtfError>;

impl From<IOError> for VtfError {
  fn from(error: IOError) -> Self {
    if error.kind() == ErrorKind::UnexpectedEof {
      VtfError::TruncatedData
    } else {
      VtfError::Io(error)
    }
  }
}

pub(crate) fn try_alloc_zeroed(len: usize) -> VtfResult<Vec<u8>> {
  let mut buffer = Vec::new();
  buffer
    .try_reserve_exact(len)
    .map_err(|_: TryReserveError| VtfError::AllocationFailure(len))?;
  buffer.resize(len, 0u8);
  Ok(buffer)
}

pub(crate) fn check_len(buffer: &[u8], expected: usize) -> VtfResult<()> {
  if buffer.len() < expected {
    return Err(VtfError::BufferSize { expected, actual: buffer.len() });
  }
  Ok(())
}
