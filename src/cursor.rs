use crate::error::{DecodeError, Result};

/// Little-endian word reader over the bytes of one instruction.
///
/// Reads are bounds-checked against the slice; nothing past the end of the
/// slice is ever touched.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    address: u64,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], address: u64) -> Self {
        Cursor {
            data,
            address,
            pos: 0,
        }
    }

    /// Address of the first byte of the slice.
    pub fn base_address(&self) -> u64 {
        self.address
    }

    /// Address of the next unread byte.
    pub fn address(&self) -> u64 {
        self.address.wrapping_add(self.pos as u64)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail unless `bytes` more bytes are available.
    pub fn ensure(&self, bytes: usize) -> Result<()> {
        if self.remaining() < bytes {
            return Err(DecodeError::TruncatedInstruction {
                address: self.address,
                needed: self.pos + bytes,
                available: self.data.len(),
            });
        }
        Ok(())
    }

    /// Word `index` words past the current position, without consuming.
    pub fn peek_u16(&self, index: usize) -> Result<u16> {
        let at = self.pos + index * 2;
        match self.data.get(at..at + 2) {
            Some(bytes) => Ok(u16::from_le_bytes([bytes[0], bytes[1]])),
            None => Err(DecodeError::TruncatedInstruction {
                address: self.address,
                needed: at + 2,
                available: self.data.len(),
            }),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let word = self.peek_u16(0)?;
        self.pos += 2;
        Ok(word)
    }
}
