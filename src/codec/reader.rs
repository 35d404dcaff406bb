//! Bounds-checked byte cursor shared by the protocol codecs.

use super::DecodeError;

/// Marker byte for a NULL length-encoded value in the MySQL protocol.
pub const LENENC_NULL: u8 = 0xfb;

/// A forward-only cursor over a byte slice.
///
/// Every read names the field it is reading so that truncation errors are
/// actionable.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a cursor at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// `true` once every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Current offset from the start of the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Consumes exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Short`] if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::short(field, n, self.remaining()));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Consumes everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    fn array<const N: usize>(&mut self, field: &str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is exhausted.
    pub fn u8(&mut self, field: &str) -> Result<u8, DecodeError> {
        Ok(self.take(1, field)?[0])
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 2 bytes remain.
    pub fn u16_le(&mut self, field: &str) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array(field)?))
    }

    /// Reads a little-endian 24-bit unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 3 bytes remain.
    pub fn u24_le(&mut self, field: &str) -> Result<u32, DecodeError> {
        let b: [u8; 3] = self.array(field)?;
        Ok(u32::from(b[0]) | u32::from(b[1]) << 8 | u32::from(b[2]) << 16)
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 4 bytes remain.
    pub fn u32_le(&mut self, field: &str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    /// Reads a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 4 bytes remain.
    pub fn i32_le(&mut self, field: &str) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array(field)?))
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 8 bytes remain.
    pub fn u64_le(&mut self, field: &str) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array(field)?))
    }

    /// Reads a little-endian `i64`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 8 bytes remain.
    pub fn i64_le(&mut self, field: &str) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array(field)?))
    }

    /// Reads a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 4 bytes remain.
    pub fn u32_be(&mut self, field: &str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.array(field)?))
    }

    /// Reads a big-endian `i16`.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 2 bytes remain.
    pub fn i16_be(&mut self, field: &str) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.array(field)?))
    }

    /// Reads bytes up to (not including) the next NUL and consumes the NUL.
    ///
    /// # Errors
    ///
    /// Returns an error if no NUL terminator is present.
    pub fn cstr_bytes(&mut self, field: &str) -> Result<&'a [u8], DecodeError> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| DecodeError::invalid(field, "missing NUL terminator"))?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    /// Reads a NUL-terminated UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminator is missing or the bytes are not UTF-8.
    pub fn cstring(&mut self, field: &str) -> Result<String, DecodeError> {
        let bytes = self.cstr_bytes(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::invalid(field, e))
    }

    /// Reads a MySQL length-encoded integer. `None` means the NULL marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the integer is truncated or uses the reserved
    /// `0xff` prefix.
    pub fn lenenc_int(&mut self, field: &str) -> Result<Option<u64>, DecodeError> {
        let first = self.u8(field)?;
        let value = match first {
            LENENC_NULL => return Ok(None),
            0xfc => u64::from(self.u16_le(field)?),
            0xfd => u64::from(self.u24_le(field)?),
            0xfe => self.u64_le(field)?,
            0xff => return Err(DecodeError::invalid(field, "0xff is not a length prefix")),
            small => u64::from(small),
        };
        Ok(Some(value))
    }

    /// Reads a MySQL length-encoded string as raw bytes. `None` means NULL.
    ///
    /// # Errors
    ///
    /// Returns an error if the length or the payload is truncated.
    pub fn lenenc_bytes(&mut self, field: &str) -> Result<Option<&'a [u8]>, DecodeError> {
        match self.lenenc_int(field)? {
            None => Ok(None),
            Some(len) => {
                let len = usize::try_from(len)
                    .map_err(|_| DecodeError::invalid(field, "length does not fit in memory"))?;
                Ok(Some(self.take(len, field)?))
            }
        }
    }

    /// Reads a non-NULL MySQL length-encoded UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error on truncation, NULL, or invalid UTF-8.
    pub fn lenenc_string(&mut self, field: &str) -> Result<String, DecodeError> {
        let bytes =
            self.lenenc_bytes(field)?.ok_or_else(|| DecodeError::invalid(field, "unexpected NULL"))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::invalid(field, e))
    }
}

/// Appends a 24-bit little-endian integer. Callers keep `value` within 24
/// bits; MySQL frames longer than that are split before this point.
pub fn put_u24_le(out: &mut Vec<u8>, value: u32) {
    debug_assert!(value <= 0x00ff_ffff, "{value} does not fit in 24 bits");
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Appends a MySQL length-encoded integer using the shortest form.
pub fn put_lenenc_int(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfc);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0x00ff_ffff {
        out.push(0xfd);
        put_u24_le(out, value as u32);
    } else {
        out.push(0xfe);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Appends a MySQL length-encoded byte string.
pub fn put_lenenc_bytes(out: &mut Vec<u8>, value: &[u8]) {
    put_lenenc_int(out, value.len() as u64);
    out.extend_from_slice(value);
}

/// Appends a NUL-terminated string.
pub fn put_cstr(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(value);
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut r = Reader::new(&bytes);
        assert_eq!(r.u24_le("len").unwrap(), 0x0003_0201);
        assert_eq!(r.u32_le("id").unwrap(), 0x0706_0504);
        assert!(r.is_empty());
    }

    #[test]
    fn short_read_names_the_field() {
        let mut r = Reader::new(&[0x01]);
        let err = r.u32_le("request id").unwrap_err();
        assert_eq!(err, DecodeError::short("request id", 4, 1));
    }

    #[test]
    fn cstring_consumes_terminator() {
        let mut r = Reader::new(b"db.coll\0rest");
        assert_eq!(r.cstring("collection").unwrap(), "db.coll");
        assert_eq!(r.rest(), b"rest");
    }

    #[test]
    fn cstring_without_terminator_fails() {
        let mut r = Reader::new(b"abc");
        assert!(matches!(r.cstring("name"), Err(DecodeError::Invalid { .. })));
    }

    #[test]
    fn lenenc_int_forms_round_trip() {
        for value in [0u64, 250, 251, 0xffff, 0x1_0000, 0xff_ffff, 0x100_0000, u64::MAX] {
            let mut out = Vec::new();
            put_lenenc_int(&mut out, value);
            let mut r = Reader::new(&out);
            assert_eq!(r.lenenc_int("n").unwrap(), Some(value), "value {value}");
            assert!(r.is_empty());
        }
    }

    #[test]
    fn lenenc_null_marker() {
        let mut r = Reader::new(&[LENENC_NULL]);
        assert_eq!(r.lenenc_bytes("col").unwrap(), None);
    }
}
