//! Nine-tile mirrored copies of a point set.
//!
//! The growth domain is logically a torus of period `(width, height)`.
//! Rather than wrap-aware neighbor queries, the curve is copied under the
//! nine offsets `{-1, 0, +1}^2 * (width, height)` and searched in a single
//! planar KD tree. The cloud is transient; it is rebuilt from the moved
//! points every iteration.

use glam::{DVec2, DVec3};

/// Tile offsets in units of the tile period. `TILE_OFFSETS[CENTER_TILE]`
/// is the identity copy.
const TILE_OFFSETS: [(f64, f64); 9] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (0.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

/// Mirrored point cloud emulating toroidal wrap-around.
///
/// Layout is tile-major: mirrored index `j` maps back to source vertex
/// `j % n` and tile `j / n`.
pub struct MirrorCloud {
    points: Vec<DVec3>,
    source_len: usize,
}

impl MirrorCloud {
    /// Index of the unshifted copy in [`Self::tile_index`] space.
    pub const CENTER_TILE: usize = 4;

    /// Copy `points` under the nine tile offsets. Offsets apply to x and y
    /// only; z is carried through untouched.
    pub fn build(points: &[DVec3], width: f64, height: f64) -> Self {
        let mut mirrored = Vec::with_capacity(points.len() * TILE_OFFSETS.len());
        for (dx, dy) in TILE_OFFSETS {
            let shift = DVec3::new(dx * width, dy * height, 0.0);
            mirrored.extend(points.iter().map(|&p| p + shift));
        }
        Self {
            points: mirrored,
            source_len: points.len(),
        }
    }

    /// Source vertex behind mirrored index `j`.
    #[inline]
    pub fn source_index(&self, j: usize) -> usize {
        j % self.source_len
    }

    /// Which of the nine copies mirrored index `j` belongs to.
    #[inline]
    pub fn tile_index(&self, j: usize) -> usize {
        j / self.source_len
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Planar (x, y) keys in mirrored-index order, for KD tree construction.
    pub fn planar_keys(&self) -> Vec<DVec2> {
        self.points.iter().map(|p| p.truncate()).collect()
    }
}
