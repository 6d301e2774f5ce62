use ndarray::{Array3, ArrayD, Axis, Ix3, IxDyn};
use serde::{Deserialize, Serialize};

use crate::consts::NM_PER_UM;
use crate::error::{DriftError, Result};

/// A single frame, axes ordered (x, y, depth). 2-D frames carry a depth of 1.
pub type Frame = Array3<f32>;

/// Displacement along (x, y, depth), in pixels unless stated otherwise.
pub type Shift = [f64; 3];

/// The marker returned when no confident correlation peak exists.
pub fn invalid_shift() -> Shift {
    [f64::NAN; 3]
}

pub fn is_valid_shift(shift: &Shift) -> bool {
    shift.iter().all(|v| v.is_finite())
}

/// Role tag of an axis in an input volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisTag {
    X,
    Y,
    Z,
    T,
    C,
}

impl AxisTag {
    /// Parse a compact tag string such as `"XYT"` or `"XYZT"`.
    pub fn parse_list(tags: &str) -> Result<Vec<AxisTag>> {
        tags.chars()
            .map(|c| match c.to_ascii_uppercase() {
                'X' => Ok(AxisTag::X),
                'Y' => Ok(AxisTag::Y),
                'Z' => Ok(AxisTag::Z),
                'T' => Ok(AxisTag::T),
                'C' => Ok(AxisTag::C),
                other => Err(DriftError::Config(format!("Unknown axis tag '{other}'"))),
            })
            .collect()
    }
}

fn format_tags(tags: &[AxisTag]) -> String {
    tags.iter().map(|t| format!("{t:?}")).collect()
}

/// Which input axis plays which role. Computed once at ingestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisMap {
    pub x: usize,
    pub y: usize,
    pub registration: usize,
    /// Non-spatial axis folded into each frame as its depth, for 4-D input.
    pub depth: Option<usize>,
}

impl AxisMap {
    pub fn from_tags(tags: &[AxisTag]) -> Result<Self> {
        let ndim = tags.len();
        if !(3..=4).contains(&ndim) {
            return Err(DriftError::UnsupportedDimensions { ndim });
        }
        let find = |tag: AxisTag| tags.iter().position(|&t| t == tag);
        let (x, y) = match (find(AxisTag::X), find(AxisTag::Y)) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(DriftError::Config(format!(
                    "Input axes {} must include X and Y",
                    format_tags(tags)
                )))
            }
        };
        let others: Vec<usize> = (0..ndim).filter(|&a| a != x && a != y).collect();
        if others.len() != ndim - 2 {
            return Err(DriftError::Config(format!(
                "Duplicate spatial axis in {}",
                format_tags(tags)
            )));
        }

        if ndim == 3 {
            // Any third axis will do.
            return Ok(Self {
                x,
                y,
                registration: others[0],
                depth: None,
            });
        }

        let registration = find(AxisTag::T)
            .or_else(|| find(AxisTag::Z))
            .ok_or_else(|| DriftError::AmbiguousRegistrationAxis {
                tags: format_tags(tags),
            })?;
        let depth = others.into_iter().find(|&a| a != registration);
        Ok(Self {
            x,
            y,
            registration,
            depth,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    Nanometer,
    Micrometer,
}

impl LengthUnit {
    /// Multiplier converting this unit to nanometers.
    pub fn nm_scale(self) -> f64 {
        match self {
            LengthUnit::Nanometer => 1.0,
            LengthUnit::Micrometer => NM_PER_UM,
        }
    }
}

/// Physical size of one voxel along (x, y, depth).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelSize {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub unit: LengthUnit,
}

impl Default for VoxelSize {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
            unit: LengthUnit::Nanometer,
        }
    }
}

impl VoxelSize {
    pub fn nm_per_pixel(&self) -> [f64; 3] {
        let scale = self.unit.nm_scale();
        [self.x * scale, self.y * scale, self.z * scale]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackMetadata {
    pub voxel: VoxelSize,
    /// Downsampling factors (x, y, time) applied before this stack was produced.
    pub binning: [usize; 3],
}

impl Default for StackMetadata {
    fn default() -> Self {
        Self {
            voxel: VoxelSize::default(),
            binning: [1, 1, 1],
        }
    }
}

impl StackMetadata {
    pub fn temporal_binning(&self) -> usize {
        self.binning[2].max(1)
    }
}

/// Time sequence of equally shaped frames.
#[derive(Clone, Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    pub metadata: StackMetadata,
}

impl FrameStack {
    pub fn new(frames: Vec<Frame>, metadata: StackMetadata) -> Result<Self> {
        let first = frames.first().ok_or(DriftError::EmptySequence)?;
        let shape = first.dim();
        if let Some(bad) = frames.iter().find(|f| f.dim() != shape) {
            return Err(DriftError::Config(format!(
                "Frame shape {:?} differs from {:?}",
                bad.dim(),
                shape
            )));
        }
        Ok(Self { frames, metadata })
    }

    /// Split a tagged 3-D or 4-D volume into frames along its registration axis.
    pub fn from_volume(
        volume: &ArrayD<f32>,
        tags: &[AxisTag],
        metadata: StackMetadata,
    ) -> Result<Self> {
        if volume.ndim() != tags.len() {
            return Err(DriftError::Config(format!(
                "{} axis tags given for a {}-D volume",
                tags.len(),
                volume.ndim()
            )));
        }
        let map = AxisMap::from_tags(tags)?;
        let after_removal = |axis: usize| {
            if axis > map.registration {
                axis - 1
            } else {
                axis
            }
        };

        let mut frames = Vec::with_capacity(volume.len_of(Axis(map.registration)));
        for plane in volume.axis_iter(Axis(map.registration)) {
            let plane = match map.depth {
                Some(depth) => plane.permuted_axes(IxDyn(&[
                    after_removal(map.x),
                    after_removal(map.y),
                    after_removal(depth),
                ])),
                None => plane
                    .permuted_axes(IxDyn(&[after_removal(map.x), after_removal(map.y)]))
                    .insert_axis(Axis(2)),
            };
            let frame = plane
                .into_dimensionality::<Ix3>()
                .map_err(|e| DriftError::Config(format!("Cannot form frame: {e}")))?;
            frames.push(frame.as_standard_layout().into_owned());
        }
        Self::new(frames, metadata)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Shape of every frame as (x, y, depth).
    pub fn frame_shape(&self) -> (usize, usize, usize) {
        self.frames[0].dim()
    }
}
