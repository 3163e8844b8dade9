//! Facial landmarks and eye geometry extraction

use serde::{Deserialize, Serialize};
use crate::DmsError;

/// Single face landmark in normalized image coordinates (0-1).
///
/// Upstream models may also report `z` and `visibility`; those are
/// ignored on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in normalized coordinates
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Same point with both coordinates multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl From<(f32, f32)> for Landmark {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Landmarks for one face, indexed by the model's fixed topology
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Overwrite a single point, growing the set if needed.
    ///
    /// Growing pads the gap with `Landmark::default()`, i.e. `(0, 0)`. Padded
    /// points are real coordinates to the classifier, so a set built this way
    /// only makes sense once every index the topology reads has been set.
    pub fn set(&mut self, index: usize, landmark: Landmark) {
        if index >= self.points.len() {
            self.points.resize(index + 1, Landmark::default());
        }
        self.points[index] = landmark;
    }

    /// Fetch a point or fail with `OutOfRange`
    pub fn point(&self, index: usize) -> Result<Landmark, DmsError> {
        self.points.get(index).copied().ok_or(DmsError::OutOfRange {
            index,
            len: self.points.len(),
        })
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Landmark> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Landmark indices describing one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndices {
    pub outer: usize,
    pub upper: usize,
    pub inner: usize,
    pub lower: usize,
}

impl EyeIndices {
    pub fn max_index(&self) -> usize {
        self.outer.max(self.upper).max(self.inner).max(self.lower)
    }
}

/// Eye landmark indices for both eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceTopology {
    pub left: EyeIndices,
    pub right: EyeIndices,
}

impl FaceTopology {
    /// 468/478-point face mesh topology
    pub const FACE_MESH: FaceTopology = FaceTopology {
        left: EyeIndices {
            outer: 33,
            upper: 159,
            inner: 133,
            lower: 145,
        },
        right: EyeIndices {
            outer: 362,
            upper: 386,
            inner: 263,
            lower: 374,
        },
    };

    /// Largest index either eye reads
    pub fn max_index(&self) -> usize {
        self.left.max_index().max(self.right.max_index())
    }

    /// Minimum number of points a landmark set must carry
    pub fn required_len(&self) -> usize {
        self.max_index() + 1
    }

    /// Extract both eye quads from a landmark set
    pub fn extract(&self, set: &LandmarkSet) -> Result<(EyeQuad, EyeQuad), DmsError> {
        if set.len() < self.required_len() {
            return Err(DmsError::OutOfRange {
                index: self.max_index(),
                len: set.len(),
            });
        }
        Ok((EyeQuad::extract(set, &self.left)?, EyeQuad::extract(set, &self.right)?))
    }
}

impl Default for FaceTopology {
    fn default() -> Self {
        Self::FACE_MESH
    }
}

/// Four points of one eye: corners and lid midpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeQuad {
    pub outer_corner: Landmark,
    pub upper_lid: Landmark,
    pub inner_corner: Landmark,
    pub lower_lid: Landmark,
}

impl EyeQuad {
    pub fn extract(set: &LandmarkSet, indices: &EyeIndices) -> Result<Self, DmsError> {
        Ok(Self {
            outer_corner: set.point(indices.outer)?,
            upper_lid: set.point(indices.upper)?,
            inner_corner: set.point(indices.inner)?,
            lower_lid: set.point(indices.lower)?,
        })
    }

    /// Corner-to-corner distance
    pub fn horizontal(&self) -> f32 {
        self.outer_corner.distance(&self.inner_corner)
    }

    /// Lid-to-lid distance
    pub fn vertical(&self) -> f32 {
        self.upper_lid.distance(&self.lower_lid)
    }
}

/// Extract left and right eye quads using `topology`
pub fn extract_eyes(
    set: &LandmarkSet,
    topology: &FaceTopology,
) -> Result<(EyeQuad, EyeQuad), DmsError> {
    topology.extract(set)
}
