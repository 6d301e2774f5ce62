use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;

use crate::error::{DriftError, Result};
use crate::frame::{Frame, FrameStack, StackMetadata};

const SER_HEADER_SIZE: usize = 178;
const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// The fields of a SER header needed to decode single-plane video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: usize,
    pub height: usize,
    pub pixel_depth: u32,
    pub frame_count: usize,
}

impl SerHeader {
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth <= 8 {
            1
        } else {
            2
        }
    }

    pub fn frame_byte_size(&self) -> usize {
        self.width * self.height * self.bytes_per_sample()
    }
}

/// Memory-mapped reader for mono (or raw Bayer) SER video.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(DriftError::InvalidSer("File too small for SER header".into()));
        }
        if &mmap[0..14] != SER_MAGIC {
            return Err(DriftError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        let expected = SER_HEADER_SIZE + header.frame_byte_size() * header.frame_count;
        if mmap.len() < expected {
            return Err(DriftError::InvalidSer(format!(
                "File truncated: expected at least {expected} bytes, got {}",
                mmap.len()
            )));
        }
        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count
    }

    /// Decode one frame as raw sample values, axes (x, y, 1).
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        let total = self.frame_count();
        if index >= total {
            return Err(DriftError::RecordIndexOutOfRange { index, total });
        }
        let size = self.header.frame_byte_size();
        let offset = SER_HEADER_SIZE + index * size;
        let raw = &self.mmap[offset..offset + size];

        let (w, bps, le) = (
            self.header.width,
            self.header.bytes_per_sample(),
            self.header.little_endian,
        );
        Ok(Frame::from_shape_fn((w, self.header.height, 1), |(x, y, _)| {
            let idx = (y * w + x) * bps;
            if bps == 1 {
                raw[idx] as f32
            } else {
                let pair = [raw[idx], raw[idx + 1]];
                if le {
                    u16::from_le_bytes(pair) as f32
                } else {
                    u16::from_be_bytes(pair) as f32
                }
            }
        }))
    }

    /// Read every frame into a stack; time runs along the frame sequence.
    pub fn read_stack(&self, metadata: StackMetadata) -> Result<FrameStack> {
        let frames = (0..self.frame_count())
            .map(|i| self.read_frame(i))
            .collect::<Result<Vec<_>>>()?;
        FrameStack::new(frames, metadata)
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = Cursor::new(&buf[14..]);
    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()?;
    let height = cursor.read_i32::<LittleEndian>()?;
    let pixel_depth = cursor.read_i32::<LittleEndian>()?;
    let frame_count = cursor.read_i32::<LittleEndian>()?;

    if width <= 0 || height <= 0 || frame_count < 0 {
        return Err(DriftError::InvalidSer(format!(
            "Invalid dimensions {width}x{height}, {frame_count} frames"
        )));
    }
    if !(1..=16).contains(&pixel_depth) {
        return Err(DriftError::InvalidSer(format!(
            "Unsupported pixel depth {pixel_depth}"
        )));
    }
    // RGB and BGR interleave three planes per pixel.
    if color_id == 100 || color_id == 101 {
        return Err(DriftError::InvalidSer(
            "Only single-plane SER video is supported".into(),
        ));
    }

    Ok(SerHeader {
        color_id,
        // Most writers store 0 for little-endian data despite the format notes.
        little_endian: le_flag != 1,
        width: width as usize,
        height: height as usize,
        pixel_depth: pixel_depth as u32,
        frame_count: frame_count as usize,
    })
}
