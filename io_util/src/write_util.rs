use std::io::{Result as IOResult, Write};

pub trait PrimitiveWrite {
  fn write_u8(&mut self, value: u8) -> IOResult<()>;
  fn write_u16(&mut self, value: u16) -> IOResult<()>;
  fn write_u32(&mut self, value: u32) -> IOResult<()>;
  fn write_f32(&mut self, value: f32) -> IOResult<()>;
}

impl<T: Write + ?Sized> PrimitiveWrite for T {
  fn write_u8(&mut self, value: u8) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_u16(&mut self, value: u16) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_u32(&mut self, value: u32) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }

  fn write_f32(&mut self, value: f32) -> IOResult<()> {
    self.write_all(&value.to_le_bytes())
  }
}

pub trait RawDataWrite {
  fn write_zeros(&mut self, len: usize) -> IOResult<()>;
}

impl<T: Write + ?Sized> RawDataWrite for T {
  fn write_zeros(&mut self, len: usize) -> IOResult<()> {
    const ZEROS: [u8; 16] = [0u8; 16];
    let mut remaining = len;
    while remaining > 0 {
      let chunk = remaining.min(ZEROS.len());
      self.write_all(&ZEROS[..chunk])?;
      remaining -= chunk;
    }
    Ok(())
  }
}
