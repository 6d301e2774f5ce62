use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::frame::{AxisTag, FrameStack, StackMetadata};

use super::record::RecordFile;

/// Load a tagged `f32` volume stored as a record file.
///
/// A single-record file holds the volume as its one record. Otherwise the
/// record index is the volume's leading axis and `tags` covers it too.
pub fn load_volume(path: &Path, tags: &[AxisTag], metadata: StackMetadata) -> Result<FrameStack> {
    let file = RecordFile::<f32>::open_existing(path)?;
    let volume = if file.len() == 1 {
        file.read(0)?
    } else {
        file.read_all()?
    };
    info!(path = %path.display(), shape = ?volume.shape(), ?tags, "Loaded volume");
    FrameStack::from_volume(&volume, tags, metadata)
}

/// Write a stack as `n` records of shape `(x, y, depth)`.
///
/// The result reloads with tags `TXYZ`.
pub fn save_stack(stack: &FrameStack, path: &Path) -> Result<RecordFile<f32>> {
    let (nx, ny, nz) = stack.frame_shape();
    let mut file = RecordFile::<f32>::create(path, stack.len(), &[nx, ny, nz])?;
    for (index, frame) in stack.frames().iter().enumerate() {
        file.write(index, frame.view())?;
    }
    file.flush()?;
    Ok(file)
}
