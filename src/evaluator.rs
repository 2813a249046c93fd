//! Candidate evaluation: genome to grown curtain to seasonal light hours.
//!
//! The genome packs four repeller factors followed by 400 per-vertex
//! extrusion offsets. Offsets beyond the grown point count are inactive
//! by policy (the growth cap of 200 leaves the gene tail unused); that is
//! a fixed property of the encoding, not something re-decided per
//! evaluation.

use glam::DVec3;

use crate::config::{GrowthConfig, RoomConfig};
use crate::geometry::GrowthEngine;
use crate::shadow::ShadowRasterizer;

/// Leading genes interpreted as repeller factors.
pub const REPELLER_GENE_COUNT: usize = 4;
/// Trailing genes interpreted as per-vertex extrusion offsets.
pub const OFFSET_GENE_COUNT: usize = 400;
/// Total genome length.
pub const GENOME_LEN: usize = REPELLER_GENE_COUNT + OFFSET_GENE_COUNT;

/// Bounds for the repeller-factor genes.
pub const REPELLER_FACTOR_BOUNDS: (f64, f64) = (0.01, 5.0);
/// Bounds for the offset genes.
pub const OFFSET_BOUNDS: (f64, f64) = (0.0, 100.0);

/// Per-gene lower and upper bounds for the full genome.
pub fn gene_bounds() -> (Vec<f64>, Vec<f64>) {
    let mut lower = vec![REPELLER_FACTOR_BOUNDS.0; REPELLER_GENE_COUNT];
    let mut upper = vec![REPELLER_FACTOR_BOUNDS.1; REPELLER_GENE_COUNT];
    lower.extend(std::iter::repeat(OFFSET_BOUNDS.0).take(OFFSET_GENE_COUNT));
    upper.extend(std::iter::repeat(OFFSET_BOUNDS.1).take(OFFSET_GENE_COUNT));
    (lower, upper)
}

/// Reinterpret the grown XY planform as a curve in the vertical XZ plane.
pub fn to_vertical_plane(points: &[DVec3]) -> Vec<DVec3> {
    points.iter().map(|p| DVec3::new(p.x, 0.0, p.y)).collect()
}

/// Extrude by offsetting the first `min(n, offsets.len())` vertices along
/// -Y, into the room.
pub fn extrude(facade: &[DVec3], offsets: &[f64]) -> Vec<DVec3> {
    let mut out = facade.to_vec();
    for (p, &offset) in out.iter_mut().zip(offsets) {
        p.y -= offset;
    }
    out
}

/// Deterministic genome evaluator shared read-only across worker threads.
pub struct DaylightEvaluator {
    start_points: Vec<DVec3>,
    repellers: Vec<DVec3>,
    summer_suns: Vec<DVec3>,
    winter_suns: Vec<DVec3>,
    growth: GrowthConfig,
    room: RoomConfig,
}

impl DaylightEvaluator {
    pub fn new(
        start_points: Vec<DVec3>,
        repellers: Vec<DVec3>,
        summer_suns: Vec<DVec3>,
        winter_suns: Vec<DVec3>,
        growth: GrowthConfig,
        room: RoomConfig,
    ) -> Self {
        Self {
            start_points,
            repellers,
            summer_suns,
            winter_suns,
            growth,
            room,
        }
    }

    /// Grow and extrude the curtain geometry for one genome, returning
    /// the facade curve and its extruded copy.
    pub fn build_curtain(&self, genes: &[f64]) -> (Vec<DVec3>, Vec<DVec3>) {
        let split = REPELLER_GENE_COUNT.min(genes.len());
        let (factors, offsets) = genes.split_at(split);

        let mut engine = GrowthEngine::new(
            self.start_points.clone(),
            self.repellers.clone(),
            factors.to_vec(),
            self.growth,
        );
        engine.run();

        let facade = to_vertical_plane(engine.points());
        let extruded = extrude(&facade, offsets);
        (facade, extruded)
    }

    /// Evaluate one genome into `(summer_hours, -winter_hours)` so both
    /// objectives minimize. Borderline geometries still produce a legal
    /// objective vector.
    pub fn objectives(&self, genes: &[f64]) -> Vec<f64> {
        let (facade, extruded) = self.build_curtain(genes);
        let summer = self.light_hours(&facade, &extruded, &self.summer_suns);
        let winter = self.light_hours(&facade, &extruded, &self.winter_suns);
        vec![summer, -winter]
    }

    pub fn summer_suns(&self) -> &[DVec3] {
        &self.summer_suns
    }

    pub fn winter_suns(&self) -> &[DVec3] {
        &self.winter_suns
    }

    pub fn room(&self) -> &RoomConfig {
        &self.room
    }

    fn light_hours(&self, facade: &[DVec3], extruded: &[DVec3], suns: &[DVec3]) -> f64 {
        match ShadowRasterizer::new(
            facade.to_vec(),
            extruded.to_vec(),
            &self.room,
            self.growth.closed,
        ) {
            Ok(mut rasterizer) => {
                rasterizer.run_with_sun_vectors(suns);
                rasterizer.total_hours() as f64
            }
            // Unreachable: both curves derive from the same planform
            Err(err) => {
                log::warn!("rasterizer rejected curtain: {}", err);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gene_bounds_layout() {
        let (lower, upper) = gene_bounds();
        assert_eq!(lower.len(), GENOME_LEN);
        assert_eq!(upper.len(), GENOME_LEN);
        assert_eq!(lower[0], 0.01);
        assert_eq!(upper[3], 5.0);
        assert_eq!(lower[4], 0.0);
        assert_eq!(upper[GENOME_LEN - 1], 100.0);
    }

    #[test]
    fn test_vertical_plane_swaps_y_into_z() {
        let planar = vec![DVec3::new(3.0, 7.0, 0.0)];
        let facade = to_vertical_plane(&planar);
        assert_eq!(facade[0], DVec3::new(3.0, 0.0, 7.0));
    }

    #[test]
    fn test_extrude_ignores_gene_tail() {
        let facade = vec![DVec3::new(0.0, 0.0, 1.0), DVec3::new(1.0, 0.0, 2.0)];
        let offsets = vec![10.0, 20.0, 30.0, 40.0];
        let extruded = extrude(&facade, &offsets);
        assert_eq!(extruded.len(), 2);
        assert_eq!(extruded[0].y, -10.0);
        assert_eq!(extruded[1].y, -20.0);
    }

    #[test]
    fn test_objectives_shape_and_sign() {
        let start: Vec<DVec3> = (0..6)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / 6.0;
                DVec3::new(500.0 + 120.0 * a.cos(), 500.0 + 120.0 * a.sin(), 0.0)
            })
            .collect();
        let growth = GrowthConfig {
            max_points: 24,
            max_iters: 8,
            ..GrowthConfig::default()
        };
        let suns = vec![DVec3::new(0.0, -1.0, 1.0).normalize()];
        let evaluator = DaylightEvaluator::new(
            start,
            Vec::new(),
            suns.clone(),
            suns,
            growth,
            RoomConfig::default(),
        );

        let genes = vec![1.0; GENOME_LEN];
        let objectives = evaluator.objectives(&genes);
        assert_eq!(objectives.len(), 2);
        // One sample each season: summer total in [0, cells], winter
        // total enters negated
        let cells = 20.0 * 20.0;
        assert!(objectives[0] >= 0.0 && objectives[0] <= cells);
        assert!(objectives[1] <= 0.0 && objectives[1] >= -cells);
    }
}
