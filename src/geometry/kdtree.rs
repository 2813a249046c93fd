//! Static 2-D KD tree with exact radial search.
//!
//! Built once per growth iteration over the mirrored point cloud and
//! queried read-only during the force pass. Values are the indices of the
//! keys in build order; insertion order of search results is unspecified.

use glam::DVec2;

/// Ranges smaller than this stay a leaf.
const LEAF_SIZE: usize = 16;

#[derive(Clone, Copy, Debug)]
struct Node {
    min: DVec2,
    max: DVec2,
    left: u32, // u32::MAX if leaf
    right: u32,
    // Leaf data: order[start..end]
    start: u32,
    end: u32,
}

/// Balanced median-split tree over planar keys.
pub struct KdTree2 {
    nodes: Vec<Node>,
    order: Vec<u32>,
    keys: Vec<DVec2>,
    root: u32,
}

impl KdTree2 {
    /// Build a balanced tree. The value associated with key `i` is `i`.
    pub fn build(keys: Vec<DVec2>) -> Self {
        let n = keys.len();
        let mut tree = Self {
            nodes: Vec::new(),
            order: (0..n as u32).collect(),
            keys,
            root: u32::MAX,
        };
        if n == 0 {
            return tree;
        }
        // A balanced tree over n/LEAF_SIZE leaves has roughly twice that
        // many nodes.
        tree.nodes.reserve(2 * n / LEAF_SIZE + 4);
        tree.root = tree.build_range(0, n);
        tree
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn build_range(&mut self, start: usize, end: usize) -> u32 {
        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for &i in &self.order[start..end] {
            let k = self.keys[i as usize];
            min = min.min(k);
            max = max.max(k);
        }

        let count = end - start;
        if count <= LEAF_SIZE {
            let idx = self.nodes.len() as u32;
            self.nodes.push(Node {
                min,
                max,
                left: u32::MAX,
                right: u32::MAX,
                start: start as u32,
                end: end as u32,
            });
            return idx;
        }

        // Split the wider extent at the median
        let extent = max - min;
        let axis = if extent.x >= extent.y { 0 } else { 1 };
        let keys = &self.keys;
        self.order[start..end].select_nth_unstable_by(count / 2, |&a, &b| {
            let va = if axis == 0 {
                keys[a as usize].x
            } else {
                keys[a as usize].y
            };
            let vb = if axis == 0 {
                keys[b as usize].x
            } else {
                keys[b as usize].y
            };
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = start + count / 2;

        let left = self.build_range(start, mid);
        let right = self.build_range(mid, end);

        let idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            min,
            max,
            left,
            right,
            start: 0,
            end: 0,
        });
        idx
    }

    /// Collect every value whose key lies within `radius` of `query`
    /// (inclusive, exact Euclidean metric). Clears `out` first.
    pub fn radial_search(&self, query: DVec2, radius: f64, out: &mut Vec<usize>) {
        out.clear();
        if self.nodes.is_empty() {
            return;
        }
        self.search_node(self.root, query, radius * radius, out);
    }

    fn search_node(&self, node_idx: u32, query: DVec2, r2: f64, out: &mut Vec<usize>) {
        let node = &self.nodes[node_idx as usize];

        // Prune by squared distance from the query to the node box
        let dx = (node.min.x - query.x).max(query.x - node.max.x).max(0.0);
        let dy = (node.min.y - query.y).max(query.y - node.max.y).max(0.0);
        if dx * dx + dy * dy > r2 {
            return;
        }

        if node.left == u32::MAX {
            for &i in &self.order[node.start as usize..node.end as usize] {
                if self.keys[i as usize].distance_squared(query) <= r2 {
                    out.push(i as usize);
                }
            }
            return;
        }

        self.search_node(node.left, query, r2, out);
        self.search_node(node.right, query, r2, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_keys(n: usize, seed: u64) -> Vec<DVec2> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| DVec2::new(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0)))
            .collect()
    }

    fn brute_force(keys: &[DVec2], query: DVec2, radius: f64) -> Vec<usize> {
        keys.iter()
            .enumerate()
            .filter(|(_, k)| k.distance(query) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_matches_brute_force() {
        let keys = random_keys(800, 7);
        let tree = KdTree2::build(keys.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut hits = Vec::new();

        for _ in 0..50 {
            let q = DVec2::new(rng.gen_range(-600.0..600.0), rng.gen_range(-600.0..600.0));
            let r = rng.gen_range(0.0..250.0);
            tree.radial_search(q, r, &mut hits);

            let mut got = hits.clone();
            got.sort_unstable();
            let mut expected = brute_force(&keys, q, r);
            expected.sort_unstable();
            assert_eq!(got, expected, "query {:?} radius {}", q, r);
        }
    }

    #[test]
    fn test_zero_radius_returns_coincident_entries() {
        let mut keys = random_keys(100, 11);
        let q = DVec2::new(42.0, -17.0);
        keys.push(q);
        keys.push(q);
        let tree = KdTree2::build(keys);

        let mut hits = Vec::new();
        tree.radial_search(q, 0.0, &mut hits);
        hits.sort_unstable();
        assert_eq!(hits, vec![100, 101]);
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree2::build(Vec::new());
        assert!(tree.is_empty());
        let mut hits = vec![99];
        tree.radial_search(DVec2::ZERO, 10.0, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_all_within_large_radius() {
        let keys = random_keys(300, 13);
        let tree = KdTree2::build(keys);
        let mut hits = Vec::new();
        tree.radial_search(DVec2::ZERO, 1e6, &mut hits);
        assert_eq!(hits.len(), 300);
    }
}
