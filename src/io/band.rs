//! Raster band reading: interleave-aware row access over a shared file
//! handle, sample decoding to f64, and cooperative cancellation.

use crate::io::binary::BinaryReader;
use crate::types::{DataType, FmtResult, FormatError, Interleave, SampleByteOrder};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use parking_lot::Mutex;
use std::io::{Read, Seek};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and in-flight
/// row reads. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Decode raw sample bytes into f64 values.
pub fn decode_samples(
    bytes: &[u8],
    data_type: DataType,
    byte_order: SampleByteOrder,
) -> FmtResult<Vec<f64>> {
    let size = data_type.size_in_bytes();
    if bytes.len() % size != 0 {
        return Err(FormatError::Schema(format!(
            "sample buffer length {} is not a multiple of sample size {}",
            bytes.len(),
            size
        )));
    }
    let count = bytes.len() / size;
    let mut out = Vec::with_capacity(count);
    for chunk in bytes.chunks_exact(size) {
        out.push(decode_one(chunk, data_type, byte_order));
    }
    Ok(out)
}

fn decode_one(chunk: &[u8], data_type: DataType, byte_order: SampleByteOrder) -> f64 {
    match byte_order {
        SampleByteOrder::LittleEndian => decode_one_ordered::<LittleEndian>(chunk, data_type),
        SampleByteOrder::BigEndian => decode_one_ordered::<BigEndian>(chunk, data_type),
    }
}

fn decode_one_ordered<E: ByteOrder>(chunk: &[u8], data_type: DataType) -> f64 {
    match data_type {
        DataType::UInt8 => chunk[0] as f64,
        DataType::Int16 => E::read_i16(chunk) as f64,
        DataType::UInt16 => E::read_u16(chunk) as f64,
        DataType::Int32 => E::read_i32(chunk) as f64,
        DataType::UInt32 => E::read_u32(chunk) as f64,
        DataType::Int64 => E::read_i64(chunk) as f64,
        DataType::UInt64 => E::read_u64(chunk) as f64,
        DataType::Float32 => E::read_f32(chunk) as f64,
        DataType::Float64 => E::read_f64(chunk),
    }
}

/// Byte layout of one band within an interleaved raster payload.
#[derive(Debug, Clone, Copy)]
pub struct BandLayout {
    /// Absolute offset of the band's first sample.
    pub band_offset: u64,
    /// Bytes between the starts of consecutive rows.
    pub row_stride: u64,
    /// Bytes between consecutive samples within a row.
    pub sample_stride: u64,
}

impl BandLayout {
    /// Layout of band `band` (0-based) for the given interleave scheme.
    pub fn for_band(
        interleave: Interleave,
        band: usize,
        width: usize,
        height: usize,
        bands: usize,
        data_type: DataType,
        header_offset: u64,
    ) -> Self {
        let size = data_type.size_in_bytes() as u64;
        let (w, h, b, n) = (width as u64, height as u64, bands as u64, band as u64);
        match interleave {
            Interleave::Bsq => BandLayout {
                band_offset: header_offset + n * w * h * size,
                row_stride: w * size,
                sample_stride: size,
            },
            Interleave::Bil => BandLayout {
                band_offset: header_offset + n * w * size,
                row_stride: w * b * size,
                sample_stride: size,
            },
            Interleave::Bip => BandLayout {
                band_offset: header_offset + n * size,
                row_stride: w * b * size,
                sample_stride: b * size,
            },
        }
    }
}

/// Row-oriented reader for one band of a raster payload.
///
/// The underlying file handle is shared between the bands of a product, so
/// every row read takes the lock, seeks, and reads as one atomic unit.
pub struct BandRowReader<R: Read + Seek> {
    source: Arc<Mutex<BinaryReader<R>>>,
    layout: BandLayout,
    width: usize,
    height: usize,
    data_type: DataType,
    byte_order: SampleByteOrder,
}

impl<R: Read + Seek> BandRowReader<R> {
    pub fn new(
        source: Arc<Mutex<BinaryReader<R>>>,
        layout: BandLayout,
        width: usize,
        height: usize,
        data_type: DataType,
        byte_order: SampleByteOrder,
    ) -> Self {
        Self {
            source,
            layout,
            width,
            height,
            data_type,
            byte_order,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Read one full-width row of samples, decoded to f64.
    pub fn read_row(&self, row: usize) -> FmtResult<Vec<f64>> {
        if row >= self.height {
            return Err(FormatError::Schema(format!(
                "row {} out of range for band of {} rows",
                row, self.height
            )));
        }
        let size = self.data_type.size_in_bytes() as u64;
        let row_start = self.layout.band_offset + row as u64 * self.layout.row_stride;

        let mut reader = self.source.lock();
        if self.layout.sample_stride == size {
            // Contiguous samples: one seek, one read.
            let mut raw = vec![0u8; self.width * size as usize];
            reader.seek(row_start)?;
            reader.read_into(&mut raw)?;
            decode_samples(&raw, self.data_type, self.byte_order)
        } else {
            // Pixel-interleaved: read the whole row span, then stride.
            let span = (self.width as u64 - 1) * self.layout.sample_stride + size;
            let mut raw = vec![0u8; span as usize];
            reader.seek(row_start)?;
            reader.read_into(&mut raw)?;
            let mut out = Vec::with_capacity(self.width);
            for x in 0..self.width {
                let at = x as u64 * self.layout.sample_stride;
                let chunk = &raw[at as usize..at as usize + size as usize];
                out.push(decode_one(chunk, self.data_type, self.byte_order));
            }
            Ok(out)
        }
    }

    /// Read `count` consecutive rows starting at `first_row` into one flat
    /// buffer, checking the cancel token between rows.
    pub fn read_rows(
        &self,
        first_row: usize,
        count: usize,
        cancel: &CancelToken,
    ) -> FmtResult<Vec<f64>> {
        let mut out = Vec::with_capacity(count * self.width);
        for row in first_row..first_row + count {
            if cancel.is_cancelled() {
                log::debug!("band read cancelled at row {}", row);
                return Err(FormatError::Cancelled);
            }
            out.extend(self.read_row(row)?);
        }
        Ok(out)
    }
}
