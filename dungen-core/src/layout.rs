//! Spatial layout types produced by the embedder (`spec.md` §3: Pose /
//! Path / Layout).

use glam::IVec2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

/// A room's placement in integer tile-space, expressed at the room's
/// centre. `footprint_id` names the footprint shape (derived from the
/// room's size class) so a carver can look up the actual tile stencil.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
    pub footprint_id: String,
}

impl Pose {
    /// Axis-aligned corners of this pose's footprint, given the footprint
    /// side length in tiles.
    pub fn corners(&self, side: i32) -> (IVec2, IVec2) {
        let half = side / 2;
        let min = IVec2::new(self.x - half, self.y - half);
        let max = IVec2::new(self.x + side - half - 1, self.y + side - half - 1);
        (min, max)
    }
}

/// A polyline of integer tile-space points connecting two room centres.
pub type Path = Vec<IVec2>;

/// Tight axis-aligned envelope of a [`Layout`].
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Bounds {
    pub min: IVec2,
    pub max: IVec2,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

/// Room poses, connector paths, and the overall envelope produced by Stage
/// B (`spec.md` §4.4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Layout {
    pub poses: IndexMap<String, Pose>,
    pub paths: IndexMap<String, Path>,
    pub bounds: Bounds,
}

pub fn path_length(path: &[IVec2]) -> f64 {
    path.windows(2)
        .map(|w| ((w[1] - w[0]).as_vec2().length()) as f64)
        .sum()
}
