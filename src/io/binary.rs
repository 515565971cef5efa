use crate::types::{FmtResult, FormatError};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Fixed-field reader over a seekable byte source.
///
/// Satellite ground-segment formats lay records out as big-endian binary
/// fields and fixed-width ASCII numerals. All reads consume exactly the
/// declared width; a short read surfaces the byte offset at the time of
/// failure. Seeking past end-of-stream is not validated eagerly — the
/// next read reports it.
pub struct BinaryReader<R: Read + Seek> {
    source: R,
    length: u64,
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(mut source: R) -> FmtResult<Self> {
        let length = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        Ok(Self { source, length })
    }

    /// Total length of the underlying stream in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Current absolute byte position.
    pub fn position(&mut self) -> FmtResult<u64> {
        Ok(self.source.stream_position()?)
    }

    pub fn seek(&mut self, pos: u64) -> FmtResult<()> {
        self.source.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn skip(&mut self, n: i64) -> FmtResult<()> {
        self.source.seek(SeekFrom::Current(n))?;
        Ok(())
    }

    fn short_read(&mut self) -> FormatError {
        let offset = self.source.stream_position().unwrap_or(u64::MAX);
        FormatError::ShortRead { offset }
    }

    /// Read a big-endian signed binary integer of 1, 2, 4 or 8 bytes.
    pub fn read_binary_int(&mut self, width: usize) -> FmtResult<i64> {
        match width {
            1 => self.read_b1().map(i64::from),
            2 => self.read_b2().map(i64::from),
            4 => self.read_b4().map(i64::from),
            8 => self.read_b8(),
            _ => Err(FormatError::Schema(format!(
                "unsupported binary integer width {}",
                width
            ))),
        }
    }

    /// Read a big-endian unsigned binary integer of 1, 2, 4 or 8 bytes.
    pub fn read_binary_uint(&mut self, width: usize) -> FmtResult<u64> {
        match width {
            1 => self.source.read_u8().map(u64::from),
            2 => self.source.read_u16::<BigEndian>().map(u64::from),
            4 => self.source.read_u32::<BigEndian>().map(u64::from),
            8 => self.source.read_u64::<BigEndian>(),
            _ => {
                return Err(FormatError::Schema(format!(
                    "unsupported binary integer width {}",
                    width
                )))
            }
        }
        .map_err(|_| self.short_read())
    }

    pub fn read_b1(&mut self) -> FmtResult<i8> {
        self.source.read_i8().map_err(|_| self.short_read())
    }

    pub fn read_b2(&mut self) -> FmtResult<i16> {
        self.source
            .read_i16::<BigEndian>()
            .map_err(|_| self.short_read())
    }

    pub fn read_b4(&mut self) -> FmtResult<i32> {
        self.source
            .read_i32::<BigEndian>()
            .map_err(|_| self.short_read())
    }

    pub fn read_b8(&mut self) -> FmtResult<i64> {
        self.source
            .read_i64::<BigEndian>()
            .map_err(|_| self.short_read())
    }

    /// Read a big-endian IEEE float of 4 or 8 bytes.
    pub fn read_binary_float(&mut self, width: usize) -> FmtResult<f64> {
        match width {
            4 => self.read_f4().map(f64::from),
            8 => self.read_f8(),
            _ => Err(FormatError::Schema(format!(
                "unsupported binary float width {}",
                width
            ))),
        }
    }

    pub fn read_f4(&mut self) -> FmtResult<f32> {
        self.source
            .read_f32::<BigEndian>()
            .map_err(|_| self.short_read())
    }

    pub fn read_f8(&mut self) -> FmtResult<f64> {
        self.source
            .read_f64::<BigEndian>()
            .map_err(|_| self.short_read())
    }

    fn read_exact_bytes(&mut self, n: usize) -> FmtResult<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.source
            .read_exact(&mut buf)
            .map_err(|_| self.short_read())?;
        Ok(buf)
    }

    /// Read `n` bytes into a buffer supplied by the caller (row reads).
    pub fn read_into(&mut self, buf: &mut [u8]) -> FmtResult<()> {
        self.source
            .read_exact(buf)
            .map_err(|_| self.short_read())?;
        Ok(())
    }

    /// Read exactly `n` bytes as an ASCII string. Embedded NUL bytes are
    /// replaced with spaces; some producers null-pad instead of space-pad.
    pub fn read_ascii_string(&mut self, n: usize) -> FmtResult<String> {
        let buf = self.read_exact_bytes(n)?;
        Ok(buf
            .iter()
            .map(|&b| if b == 0 { ' ' } else { b as char })
            .collect())
    }

    /// Read exactly `n` bytes as a fixed-width ASCII integer.
    ///
    /// An all-whitespace field parses to 0 — a deliberate legacy-format
    /// tolerance. Otherwise a failed parse is retried after stripping
    /// characters that cannot appear in an integer numeral.
    pub fn read_ascii_int(&mut self, n: usize) -> FmtResult<i64> {
        let start = self.position()?;
        let text = self.read_ascii_string(n)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Ok(v);
        }
        let cleaned: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
            .collect();
        match cleaned.parse::<i64>() {
            Ok(v) => {
                log::warn!(
                    "recovered ASCII integer {:?} -> {} at byte offset {}",
                    trimmed,
                    v,
                    start
                );
                Ok(v)
            }
            Err(_) => Err(FormatError::AsciiNumeral {
                text: trimmed.to_string(),
                offset: start,
            }),
        }
    }

    /// Read exactly `n` bytes as a fixed-width ASCII float. Same tolerance
    /// rules as `read_ascii_int`; Fortran-style `D` exponents are accepted.
    pub fn read_ascii_float(&mut self, n: usize) -> FmtResult<f64> {
        let start = self.position()?;
        let text = self.read_ascii_string(n)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0.0);
        }
        let normalized = trimmed.replace(['D', 'd'], "E");
        if let Ok(v) = normalized.parse::<f64>() {
            return Ok(v);
        }
        let cleaned: String = normalized
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'E' | 'e'))
            .collect();
        match cleaned.parse::<f64>() {
            Ok(v) => {
                log::warn!(
                    "recovered ASCII float {:?} -> {} at byte offset {}",
                    trimmed,
                    v,
                    start
                );
                Ok(v)
            }
            Err(_) => Err(FormatError::AsciiNumeral {
                text: trimmed.to_string(),
                offset: start,
            }),
        }
    }
}
