use std::fs::OpenOptions;
use std::io::Cursor;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::{MmapMut, MmapOptions};
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};
use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};

pub const RECORD_MAGIC: &[u8; 8] = b"DRIFTREC";
pub const RECORD_VERSION: u32 = 1;

/// Fixed part of the header: magic, version, element code, ndim, count.
const FIXED_HEADER_SIZE: usize = 8 + 4 + 4 + 4 + 8;

/// Element type stored in a record file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    F32,
    F64,
    Complex64,
}

impl ElementType {
    fn code(self) -> u32 {
        match self {
            ElementType::F32 => 1,
            ElementType::F64 => 2,
            ElementType::Complex64 => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ElementType::F32),
            2 => Some(ElementType::F64),
            3 => Some(ElementType::Complex64),
            _ => None,
        }
    }

    /// Bytes per element on disk.
    pub fn size(self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::F64 => 8,
            ElementType::Complex64 => 16,
        }
    }
}

/// A value that can live in a record file (little-endian on disk).
pub trait RecordElement: Copy + Zero + Send + Sync + 'static {
    const ELEMENT: ElementType;
    fn encode(&self, buf: &mut [u8]);
    fn decode(buf: &[u8]) -> Self;
}

impl RecordElement for f32 {
    const ELEMENT: ElementType = ElementType::F32;
    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_f32(buf, *self);
    }
    fn decode(buf: &[u8]) -> Self {
        LittleEndian::read_f32(buf)
    }
}

impl RecordElement for f64 {
    const ELEMENT: ElementType = ElementType::F64;
    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_f64(buf, *self);
    }
    fn decode(buf: &[u8]) -> Self {
        LittleEndian::read_f64(buf)
    }
}

impl RecordElement for Complex<f64> {
    const ELEMENT: ElementType = ElementType::Complex64;
    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_f64(&mut buf[..8], self.re);
        LittleEndian::write_f64(&mut buf[8..16], self.im);
    }
    fn decode(buf: &[u8]) -> Self {
        Complex::new(
            LittleEndian::read_f64(&buf[..8]),
            LittleEndian::read_f64(&buf[8..16]),
        )
    }
}

/// Everything needed to reopen a record file: plain data, cheap to send to a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub path: PathBuf,
    pub element: ElementType,
    pub count: usize,
    pub shape: Vec<usize>,
}

impl RecordDescriptor {
    /// Elements per record.
    pub fn record_len(&self) -> usize {
        self.shape.iter().product()
    }

    fn record_bytes(&self) -> usize {
        self.record_len() * self.element.size()
    }

    fn header_bytes(&self) -> usize {
        FIXED_HEADER_SIZE + 8 * self.shape.len()
    }

    fn file_bytes(&self) -> usize {
        self.header_bytes() + self.count * self.record_bytes()
    }
}

/// Memory-mapped array of `count` fixed-shape records of type `T`.
///
/// Shape and element type are written into the header at creation and
/// checked on every later open.
pub struct RecordFile<T: RecordElement> {
    descriptor: RecordDescriptor,
    mmap: MmapMut,
    _element: PhantomData<T>,
}

impl<T: RecordElement> RecordFile<T> {
    /// Create (or truncate) a record file sized for `count` records of `shape`.
    pub fn create(path: &Path, count: usize, shape: &[usize]) -> Result<Self> {
        let descriptor = RecordDescriptor {
            path: path.to_path_buf(),
            element: T::ELEMENT,
            count,
            shape: shape.to_vec(),
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(descriptor.file_bytes() as u64)?;
        let mut mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        let header = encode_header(&descriptor)?;
        mmap[..header.len()].copy_from_slice(&header);

        Ok(Self {
            descriptor,
            mmap,
            _element: PhantomData,
        })
    }

    /// Reopen a record file, requiring the exact contract in `descriptor`.
    pub fn open(descriptor: &RecordDescriptor) -> Result<Self> {
        let file = Self::open_existing(&descriptor.path)?;
        if file.descriptor.count != descriptor.count
            || file.descriptor.shape != descriptor.shape
            || descriptor.element != T::ELEMENT
        {
            return Err(DriftError::RecordMismatch {
                path: descriptor.path.clone(),
                expected: descriptor.element,
                expected_shape: descriptor.shape.clone(),
                found: file.descriptor.element,
                found_shape: file.descriptor.shape.clone(),
            });
        }
        Ok(file)
    }

    /// Open a record file with whatever shape its header declares.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        let descriptor = decode_header(path, &mmap)?;

        if descriptor.element != T::ELEMENT {
            return Err(DriftError::RecordMismatch {
                path: path.to_path_buf(),
                expected: T::ELEMENT,
                expected_shape: descriptor.shape.clone(),
                found: descriptor.element,
                found_shape: descriptor.shape,
            });
        }
        if mmap.len() < descriptor.file_bytes() {
            return Err(DriftError::InvalidRecordFile {
                path: path.to_path_buf(),
                reason: format!(
                    "truncated: expected {} bytes, got {}",
                    descriptor.file_bytes(),
                    mmap.len()
                ),
            });
        }

        Ok(Self {
            descriptor,
            mmap,
            _element: PhantomData,
        })
    }

    pub fn descriptor(&self) -> &RecordDescriptor {
        &self.descriptor
    }

    pub fn len(&self) -> usize {
        self.descriptor.count
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor.count == 0
    }

    pub fn record_shape(&self) -> &[usize] {
        &self.descriptor.shape
    }

    fn record_range(&self, index: usize) -> Result<std::ops::Range<usize>> {
        if index >= self.descriptor.count {
            return Err(DriftError::RecordIndexOutOfRange {
                index,
                total: self.descriptor.count,
            });
        }
        let start = self.descriptor.header_bytes() + index * self.descriptor.record_bytes();
        Ok(start..start + self.descriptor.record_bytes())
    }

    /// Copy one record out of the file.
    pub fn read(&self, index: usize) -> Result<ArrayD<T>> {
        let range = self.record_range(index)?;
        let size = T::ELEMENT.size();
        let values: Vec<T> = self.mmap[range].chunks_exact(size).map(T::decode).collect();
        ArrayD::from_shape_vec(IxDyn(&self.descriptor.shape), values).map_err(|e| {
            DriftError::InvalidRecordFile {
                path: self.descriptor.path.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Read every record into one array of shape `[count, ..shape]`.
    pub fn read_all(&self) -> Result<ArrayD<T>> {
        let mut full_shape = vec![self.descriptor.count];
        full_shape.extend_from_slice(&self.descriptor.shape);
        let start = self.descriptor.header_bytes();
        let end = self.descriptor.file_bytes();
        let size = T::ELEMENT.size();
        let values: Vec<T> = self.mmap[start..end]
            .chunks_exact(size)
            .map(T::decode)
            .collect();
        ArrayD::from_shape_vec(IxDyn(&full_shape), values).map_err(|e| {
            DriftError::InvalidRecordFile {
                path: self.descriptor.path.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Overwrite one record. The view's shape must equal the record shape.
    pub fn write<D: Dimension>(&mut self, index: usize, record: ArrayView<'_, T, D>) -> Result<()> {
        if record.shape() != self.descriptor.shape.as_slice() {
            return Err(DriftError::RecordMismatch {
                path: self.descriptor.path.clone(),
                expected: T::ELEMENT,
                expected_shape: self.descriptor.shape.clone(),
                found: T::ELEMENT,
                found_shape: record.shape().to_vec(),
            });
        }
        let range = self.record_range(index)?;
        let size = T::ELEMENT.size();
        for (chunk, value) in self.mmap[range].chunks_exact_mut(size).zip(record.iter()) {
            value.encode(chunk);
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }
}

fn encode_header(descriptor: &RecordDescriptor) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(descriptor.header_bytes());
    buf.extend_from_slice(RECORD_MAGIC);
    buf.write_u32::<LittleEndian>(RECORD_VERSION)?;
    buf.write_u32::<LittleEndian>(descriptor.element.code())?;
    buf.write_u32::<LittleEndian>(descriptor.shape.len() as u32)?;
    buf.write_u64::<LittleEndian>(descriptor.count as u64)?;
    for &dim in &descriptor.shape {
        buf.write_u64::<LittleEndian>(dim as u64)?;
    }
    debug_assert_eq!(buf.len(), descriptor.header_bytes());
    Ok(buf)
}

fn decode_header(path: &Path, bytes: &[u8]) -> Result<RecordDescriptor> {
    let invalid = |reason: &str| DriftError::InvalidRecordFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if bytes.len() < FIXED_HEADER_SIZE {
        return Err(invalid("file too small for header"));
    }
    if &bytes[..8] != RECORD_MAGIC {
        return Err(invalid("missing DRIFTREC magic"));
    }

    let mut cursor = Cursor::new(&bytes[8..]);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != RECORD_VERSION {
        return Err(invalid(&format!("unsupported version {version}")));
    }
    let element = ElementType::from_code(cursor.read_u32::<LittleEndian>()?)
        .ok_or_else(|| invalid("unknown element type"))?;
    let ndim = cursor.read_u32::<LittleEndian>()? as usize;
    let count = cursor.read_u64::<LittleEndian>()? as usize;
    if bytes.len() < FIXED_HEADER_SIZE + 8 * ndim {
        return Err(invalid("truncated shape"));
    }
    let shape = (0..ndim)
        .map(|_| cursor.read_u64::<LittleEndian>().map(|d| d as usize))
        .collect::<std::io::Result<Vec<_>>>()?;

    Ok(RecordDescriptor {
        path: path.to_path_buf(),
        element,
        count,
        shape,
    })
}

