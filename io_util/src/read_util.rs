use std::io::{Read, Result as IOResult, Seek, SeekFrom};

pub trait RawDataRead {
  fn read_data_exact(&mut self, len: usize) -> IOResult<Box<[u8]>>;
  fn skip_bytes(&mut self, len: usize) -> IOResult<()>;
}

impl<T: Read + ?Sized> RawDataRead for T {
  fn read_data_exact(&mut self, len: usize) -> IOResult<Box<[u8]>> {
    let mut buffer = vec![0u8; len];
    self.read_exact(&mut buffer)?;
    Ok(buffer.into_boxed_slice())
  }

  fn skip_bytes(&mut self, len: usize) -> IOResult<()> {
    let mut buffer = [0u8; 16];
    let mut remaining = len;
    while remaining > 0 {
      let chunk = remaining.min(buffer.len());
      self.read_exact(&mut buffer[..chunk])?;
      remaining -= chunk;
    }
    Ok(())
  }
}

pub trait StreamLength {
  /// Total length of the stream. Leaves the position where it was.
  fn stream_length(&mut self) -> IOResult<u64>;
}

impl<T: Seek + ?Sized> StreamLength for T {
  fn stream_length(&mut self) -> IOResult<u64> {
    let position = self.stream_position()?;
    let len = self.seek(SeekFrom::End(0))?;
    if position != len {
      self.seek(SeekFrom::Start(position))?;
    }
    Ok(len)
  }
}

pub trait PrimitiveRead {
  fn read_u8(&mut self) -> IOResult<u8>;
  fn read_u16(&mut self) -> IOResult<u16>;
  fn read_u32(&mut self) -> IOResult<u32>;
  fn read_f32(&mut self) -> IOResult<f32>;
}

macro_rules! read_le {
  ($reader:expr, $ty:ty) => {{
    let mut buffer = [0u8; std::mem::size_of::<$ty>()];
    $reader.read_exact(&mut buffer)?;
    Ok(<$ty>::from_le_bytes(buffer))
  }};
}

impl<T: Read + ?Sized> PrimitiveRead for T {
  fn read_u8(&mut self) -> IOResult<u8> {
    read_le!(self, u8)
  }

  fn read_u16(&mut self) -> IOResult<u16> {
    read_le!(self, u16)
  }

  fn read_u32(&mut self) -> IOResult<u32> {
    read_le!(self, u32)
  }

  fn read_f32(&mut self) -> IOResult<f32> {
    read_le!(self, f32)
  }
}
