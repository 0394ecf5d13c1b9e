use crate::SerdeError;

/// A cursor over received wire bytes.
///
/// Every read is bounds-checked; running past the end of the buffer yields
/// [`SerdeError::BufferTooShort`] instead of panicking, since the input may
/// come straight off the network.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], SerdeError> {
        if self.remaining() < count {
            return Err(SerdeError::BufferTooShort {
                needed: count - self.remaining(),
                offset: self.offset,
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, SerdeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeError> {
        let bytes = self.take(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(array))
    }

    pub fn read_f32(&mut self) -> Result<f32, SerdeError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bool(&mut self) -> Result<bool, SerdeError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a u32 length prefix followed by that many raw bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], SerdeError> {
        let offset = self.offset;
        let length = self.read_u32()? as usize;
        if self.remaining() < length {
            return Err(SerdeError::InvalidLength {
                length,
                offset,
                remaining: self.remaining(),
            });
        }
        self.take(length)
    }

    pub fn read_string(&mut self) -> Result<String, SerdeError> {
        let offset = self.offset;
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeError::InvalidUtf8 { offset })
    }
}
