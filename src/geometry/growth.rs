//! Differential growth of a curve on a toroidal tile.
//!
//! Each iteration pushes vertices apart with short-range repulsion and
//! then splits any edge that has stretched past its local target length.
//! Local target spacing is modulated by proximity to repeller points, so
//! the curve stays coarse near repellers and packs tighter elsewhere.
//! Wrap-around is emulated by searching the nine-tile mirrored cloud.

use glam::DVec3;

use super::{KdTree2, MirrorCloud};
use crate::config::GrowthConfig;
use crate::util::StageTimer;

/// Neighbor pairs closer than this are treated as coincident and skipped.
const MIN_PAIR_DIST: f64 = 1e-3;

/// Iterative curve grower. Owns the point sequence while running; the
/// final sequence is read out with [`points`](Self::points) or
/// [`into_points`](Self::into_points).
pub struct GrowthEngine {
    points: Vec<DVec3>,
    repellers: Vec<DVec3>,
    factors: Vec<f64>,
    config: GrowthConfig,
}

impl GrowthEngine {
    /// `factors` scales repeller strength per repeller index, with the
    /// last entry reused when there are fewer factors than repellers.
    pub fn new(
        points: Vec<DVec3>,
        repellers: Vec<DVec3>,
        factors: Vec<f64>,
        config: GrowthConfig,
    ) -> Self {
        Self {
            points,
            repellers,
            factors,
            config,
        }
    }

    /// Run up to `max_iters` iterations, stopping early once the curve
    /// reaches the point cap. With `max_iters = 0` the input is returned
    /// unchanged.
    pub fn run(&mut self) {
        let timer = StageTimer::inner("growth");
        let mut iterations = self.config.max_iters;
        for iter in 0..self.config.max_iters {
            if !self.step() {
                iterations = iter;
                break;
            }
        }
        timer.finish(format!(
            "{} points after {} iterations",
            self.points.len(),
            iterations
        ));
    }

    /// One repulsion-then-insertion pass. Returns `false` once the curve
    /// is at the point cap and growth should stop.
    pub fn step(&mut self) -> bool {
        if self.points.len() >= self.config.max_points {
            return false;
        }
        self.repulsion_pass();
        self.insertion_pass();
        true
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn into_points(self) -> Vec<DVec3> {
        self.points
    }

    /// Local spacing multiplier from repeller proximity, always >= 1.
    /// With no repellers the density is exactly 1.
    pub fn density(&self, p: DVec3) -> f64 {
        let mut best = 1.0_f64;
        for (i, &r) in self.repellers.iter().enumerate() {
            let d = p.distance(r);
            if d > self.config.max_effect_dist {
                continue;
            }
            let f = self.factor_for(i);
            let v = 1.0
                + (self.config.max_factor - 1.0) * f * (1.0 - d / self.config.max_effect_dist);
            if v > best {
                best = v;
            }
        }
        best
    }

    /// Factor for repeller `i`, clamped to the last entry when the factor
    /// sequence is shorter than the repeller set.
    fn factor_for(&self, i: usize) -> f64 {
        match self.factors.len() {
            0 => 1.0,
            len => self.factors[i.min(len - 1)],
        }
    }

    fn repulsion_pass(&mut self) {
        let n = self.points.len();
        if n < 2 {
            return;
        }

        let cloud = MirrorCloud::build(
            &self.points,
            self.config.tile_width,
            self.config.tile_height,
        );
        let tree = KdTree2::build(cloud.planar_keys());
        let radius = self.config.base_dist * self.config.max_factor;

        // Densities depend only on source positions, which are frozen for
        // the duration of the pass.
        let density: Vec<f64> = self.points.iter().map(|&p| self.density(p)).collect();

        let mut total_move = vec![DVec3::ZERO; n];
        let mut collisions = vec![0u32; n];
        let mut hits = Vec::new();

        for i in 0..n {
            let p = self.points[i];
            tree.radial_search(p.truncate(), radius, &mut hits);
            for &jm in &hits {
                let j = cloud.source_index(jm);
                // Drop only the vertex's own center-tile copy; its images
                // in neighboring tiles still repel it.
                if j == i && cloud.tile_index(jm) == MirrorCloud::CENTER_TILE {
                    continue;
                }
                let delta = p - cloud.points()[jm];
                let d = delta.length();
                if d < MIN_PAIR_DIST {
                    continue;
                }
                let local_dist = 0.5 * self.config.base_dist * (density[i] + density[j]);
                if d > local_dist {
                    continue;
                }
                let push = (0.5 * (local_dist - d)).min(0.5 * self.config.base_dist);
                let m = delta / d * push;
                total_move[i] += m;
                total_move[j] -= m;
                collisions[i] += 1;
                collisions[j] += 1;
            }
        }

        for i in 0..n {
            if collisions[i] > 0 {
                self.points[i] += total_move[i] / collisions[i] as f64;
            }
        }
    }

    /// Split every edge longer than its local threshold, inserting
    /// midpoints in descending target-index order so earlier insertion
    /// points are not shifted by later ones. Stops at the point cap.
    fn insertion_pass(&mut self) {
        let n = self.points.len();
        if n < 2 {
            return;
        }

        let density: Vec<f64> = self.points.iter().map(|&p| self.density(p)).collect();
        // A closed pair would yield the same edge twice; only wrap for n > 2.
        let edge_count = if self.config.closed && n > 2 { n } else { n - 1 };

        let mut inserts: Vec<(usize, DVec3)> = Vec::new();
        for a in 0..edge_count {
            let b = (a + 1) % n;
            let threshold = 0.5 * self.config.base_dist * (density[a] + density[b]) - 1.0;
            if self.points[a].distance(self.points[b]) > threshold {
                let mid = (self.points[a] + self.points[b]) * 0.5;
                let at = if b == 0 { n } else { b };
                inserts.push((at, mid));
            }
        }

        for &(at, mid) in inserts.iter().rev() {
            if self.points.len() >= self.config.max_points {
                break;
            }
            self.points.insert(at, mid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_config() -> GrowthConfig {
        GrowthConfig {
            closed: false,
            ..GrowthConfig::default()
        }
    }

    #[test]
    fn test_zero_iterations_returns_input_unchanged() {
        let points = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 0.0),
            DVec3::new(20.0, 0.0, 0.0),
        ];
        let config = GrowthConfig {
            max_iters: 0,
            ..GrowthConfig::default()
        };
        let mut engine = GrowthEngine::new(points.clone(), Vec::new(), Vec::new(), config);
        engine.run();
        assert_eq!(engine.points(), points.as_slice());
    }

    #[test]
    fn test_single_iteration_symmetric_spread() {
        // Three collinear points all within repulsion range of each other.
        let points = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(10.0, 0.0, 0.0),
            DVec3::new(20.0, 0.0, 0.0),
        ];
        let config = GrowthConfig {
            max_iters: 1,
            ..open_config()
        };
        let mut engine = GrowthEngine::new(points.clone(), Vec::new(), Vec::new(), config);
        engine.run();

        let moved = engine.points();
        // No edge reaches the insertion threshold (base_dist - 1 = 74)
        assert_eq!(moved.len(), 3);

        // Repulsion happened and was symmetric about the middle point
        assert!(moved[0].x < points[0].x);
        assert!(moved[2].x > points[2].x);
        assert!((moved[1].x - 10.0).abs() < 1e-9);

        let centroid_before = points.iter().map(|p| p.x).sum::<f64>() / 3.0;
        let centroid_after = moved.iter().map(|p| p.x).sum::<f64>() / 3.0;
        assert!((centroid_before - centroid_after).abs() < 1e-6);
    }

    #[test]
    fn test_long_edge_gains_midpoint() {
        // The pair is out of repulsion range (300 > 112.5) but the edge is
        // far past the split threshold of 74.
        let points = vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(300.0, 0.0, 0.0)];
        let config = GrowthConfig {
            max_points: 10,
            max_iters: 1,
            ..open_config()
        };
        let mut engine = GrowthEngine::new(points, Vec::new(), Vec::new(), config);
        engine.run();

        let grown = engine.points();
        assert_eq!(grown.len(), 3);
        assert!((grown[0].x - 0.0).abs() < 1e-9);
        assert!(grown[1].distance(DVec3::new(150.0, 0.0, 0.0)) < 1e-9);
        assert!((grown[2].x - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_density_is_one_without_repellers() {
        let engine = GrowthEngine::new(Vec::new(), Vec::new(), Vec::new(), GrowthConfig::default());
        assert_eq!(engine.density(DVec3::new(500.0, 500.0, 0.0)), 1.0);
    }

    #[test]
    fn test_density_rises_toward_repeller() {
        let repellers = vec![DVec3::new(0.0, 0.0, 0.0)];
        let engine = GrowthEngine::new(
            Vec::new(),
            repellers,
            vec![1.0],
            GrowthConfig::default(),
        );

        let near = engine.density(DVec3::new(10.0, 0.0, 0.0));
        let far = engine.density(DVec3::new(250.0, 0.0, 0.0));
        let outside = engine.density(DVec3::new(400.0, 0.0, 0.0));

        assert!(near > far);
        assert!(far > 1.0);
        assert_eq!(outside, 1.0);
        // Bounded by max_factor at distance zero
        assert!(engine.density(DVec3::ZERO) <= 1.5 + 1e-12);
    }

    #[test]
    fn test_factor_sequence_clamps_to_last_entry() {
        let repellers = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1000.0, 0.0, 0.0),
            DVec3::new(2000.0, 0.0, 0.0),
        ];
        let engine = GrowthEngine::new(
            Vec::new(),
            repellers,
            vec![0.0, 0.5],
            GrowthConfig::default(),
        );
        // Third repeller reuses factor 0.5: probing next to it must match
        // probing next to the second.
        let at_second = engine.density(DVec3::new(1000.0, 10.0, 0.0));
        let at_third = engine.density(DVec3::new(2000.0, 10.0, 0.0));
        assert!((at_second - at_third).abs() < 1e-12);
        // First repeller has factor 0, so it exerts no density at all
        assert_eq!(engine.density(DVec3::new(10.0, 0.0, 0.0)), 1.0);
    }

    #[test]
    fn test_point_cap_is_never_exceeded() {
        // A small ring that wants to grow far past the cap
        let n = 8;
        let points: Vec<DVec3> = (0..n)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                DVec3::new(500.0 + 200.0 * a.cos(), 500.0 + 200.0 * a.sin(), 0.0)
            })
            .collect();
        let config = GrowthConfig {
            max_points: 40,
            max_iters: 50,
            ..GrowthConfig::default()
        };
        let mut engine = GrowthEngine::new(points, Vec::new(), Vec::new(), config);
        for _ in 0..50 {
            engine.step();
            assert!(engine.points().len() <= 40);
        }
        assert_eq!(engine.points().len(), 40);
    }

    #[test]
    fn test_no_consecutive_duplicates_after_growth() {
        let points = vec![
            DVec3::new(100.0, 100.0, 0.0),
            DVec3::new(400.0, 120.0, 0.0),
            DVec3::new(420.0, 380.0, 0.0),
            DVec3::new(90.0, 400.0, 0.0),
        ];
        let config = GrowthConfig {
            max_points: 60,
            max_iters: 30,
            ..GrowthConfig::default()
        };
        let mut engine = GrowthEngine::new(points, Vec::new(), Vec::new(), config);
        engine.run();

        let grown = engine.points();
        for i in 0..grown.len() {
            let j = (i + 1) % grown.len();
            assert!(
                grown[i].distance(grown[j]) > 0.0,
                "consecutive duplicate at {}",
                i
            );
        }
    }

    #[test]
    fn test_repeller_coarsens_local_spacing() {
        // Grow the same ring with and without a strong repeller at its
        // center; the repelled run must end with fewer vertices because
        // its insertion threshold is higher everywhere near the repeller.
        let ring = |n: usize| -> Vec<DVec3> {
            (0..n)
                .map(|i| {
                    let a = std::f64::consts::TAU * i as f64 / n as f64;
                    DVec3::new(500.0 + 150.0 * a.cos(), 500.0 + 150.0 * a.sin(), 0.0)
                })
                .collect()
        };
        let config = GrowthConfig {
            max_points: 200,
            max_iters: 12,
            ..GrowthConfig::default()
        };

        let mut plain = GrowthEngine::new(ring(8), Vec::new(), Vec::new(), config);
        plain.run();

        let mut repelled = GrowthEngine::new(
            ring(8),
            vec![DVec3::new(500.0, 500.0, 0.0)],
            vec![5.0],
            config,
        );
        repelled.run();

        assert!(repelled.points().len() <= plain.points().len());
    }
}
