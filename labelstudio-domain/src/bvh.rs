use crate::core::{Aabb, Ray};
use glam::Vec3;
use std::cmp::Ordering;

const MAX_LEAF_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
enum NodeKind {
    Leaf { start: u32, count: u32 },
    Inner { left: u32, right: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Node {
    bb: Aabb,
    kind: NodeKind,
}

/// Bounding volume hierarchy over primitives that are only known by their bounding boxes. The
/// actual primitive test is handed to [`Bvh::nearest`] as closure, which makes the same
/// hierarchy usable for triangles and points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bvh {
    nodes: Vec<Node>,
    /// primitive indices, leaves reference contiguous ranges
    order: Vec<u32>,
}

impl Bvh {
    pub fn build(bbs: &[Aabb]) -> Self {
        if bbs.is_empty() {
            return Self::default();
        }
        let centroids = bbs.iter().map(Aabb::center).collect::<Vec<_>>();
        let mut order = (0..bbs.len() as u32).collect::<Vec<_>>();
        let mut nodes = Vec::with_capacity(2 * bbs.len() / MAX_LEAF_SIZE + 1);
        build_recursive(bbs, &centroids, &mut order, 0, &mut nodes);
        Self { nodes, order }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| n.bb)
    }

    /// Finds the primitive with the smallest positive ray parameter. `hit` tests a single
    /// primitive, `inflation` enlarges node boxes before they are tested against the ray, which
    /// is needed for primitives that are hit within a tolerance. Equal ray parameters are
    /// resolved in favor of the lower primitive index.
    pub fn nearest<H, I>(&self, ray: &Ray, mut hit: H, inflation: I) -> Option<(usize, f32)>
    where
        H: FnMut(usize) -> Option<f32>,
        I: Fn(&Aabb) -> f32,
    {
        let mut best: Option<(usize, f32)> = None;
        let mut stack = Vec::with_capacity(64);
        if !self.nodes.is_empty() {
            stack.push(0u32);
        }
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            let bb = node.bb.inflate(inflation(&node.bb));
            let Some(t_entry) = bb.ray_entry(ray) else {
                continue;
            };
            if best.is_some_and(|(_, t_best)| t_entry > t_best) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, count } => {
                    for &prim_idx in &self.order[start as usize..(start + count) as usize] {
                        let prim_idx = prim_idx as usize;
                        if let Some(t) = hit(prim_idx) {
                            if is_better((prim_idx, t), best) {
                                best = Some((prim_idx, t));
                            }
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    // visit the closer child first by pushing it last
                    let entry = |idx: u32| {
                        let child = &self.nodes[idx as usize];
                        child
                            .bb
                            .inflate(inflation(&child.bb))
                            .ray_entry(ray)
                            .unwrap_or(f32::INFINITY)
                    };
                    if entry(left) <= entry(right) {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }
        best
    }
}

fn is_better(candidate: (usize, f32), best: Option<(usize, f32)>) -> bool {
    match best {
        None => true,
        Some((best_idx, best_t)) => match candidate.1.total_cmp(&best_t) {
            Ordering::Less => true,
            Ordering::Equal => candidate.0 < best_idx,
            Ordering::Greater => false,
        },
    }
}

fn build_recursive(
    bbs: &[Aabb],
    centroids: &[Vec3],
    order: &mut [u32],
    offset: usize,
    nodes: &mut Vec<Node>,
) -> u32 {
    let bb = order
        .iter()
        .fold(Aabb::empty(), |acc, idx| acc.merge(&bbs[*idx as usize]));
    let node_idx = nodes.len() as u32;
    if order.len() <= MAX_LEAF_SIZE {
        nodes.push(Node {
            bb,
            kind: NodeKind::Leaf {
                start: offset as u32,
                count: order.len() as u32,
            },
        });
        return node_idx;
    }
    let centroid_bb = Aabb::from_points(order.iter().map(|idx| centroids[*idx as usize]));
    let extent = centroid_bb.extent();
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |a, b| {
        centroids[*a as usize][axis].total_cmp(&centroids[*b as usize][axis])
    });
    // placeholder, children are filled in after recursion
    nodes.push(Node {
        bb,
        kind: NodeKind::Leaf { start: 0, count: 0 },
    });
    let (order_left, order_right) = order.split_at_mut(mid);
    let left = build_recursive(bbs, centroids, order_left, offset, nodes);
    let right = build_recursive(bbs, centroids, order_right, offset + mid, nodes);
    nodes[node_idx as usize].kind = NodeKind::Inner { left, right };
    node_idx
}

#[cfg(test)]
fn point_bbs(points: &[Vec3]) -> Vec<Aabb> {
    points
        .iter()
        .map(|p| Aabb { min: *p, max: *p })
        .collect()
}

#[test]
fn test_build() {
    let points = (0..100)
        .map(|i| Vec3::new(i as f32, 0.0, 0.0))
        .collect::<Vec<_>>();
    let bvh = Bvh::build(&point_bbs(&points));
    assert!(!bvh.is_empty());
    let bounds = bvh.bounds().unwrap();
    assert_eq!(bounds.min, Vec3::ZERO);
    assert_eq!(bounds.max, Vec3::new(99.0, 0.0, 0.0));
    let mut sorted = bvh.order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    assert!(Bvh::build(&[]).is_empty());
}

#[test]
fn test_nearest_tie_break() {
    // two primitives at exactly the same spot, the first inserted one must win
    let points = vec![Vec3::new(5.0, 0.0, 0.0); 10];
    let bvh = Bvh::build(&point_bbs(&points));
    let ray = Ray::new(Vec3::ZERO, Vec3::X).unwrap();
    let res = bvh.nearest(&ray, |idx| Some(ray.project(points[idx])), |_| 0.1);
    assert_eq!(res, Some((0, 5.0)));
}

#[test]
fn test_nearest_random() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let points = (0..500)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
        })
        .collect::<Vec<_>>();
    let bvh = Bvh::build(&point_bbs(&points));
    let radius = 0.05;
    for _ in 0..50 {
        let origin = Vec3::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5), 3.0);
        let ray = Ray::new(origin, Vec3::new(0.0, 0.0, -1.0)).unwrap();
        let test = |idx: usize| {
            let p = points[idx];
            let t = ray.project(p);
            (t > 0.0 && ray.squared_dist_to_point(p) <= radius * radius).then_some(t)
        };
        let brute_force = (0..points.len())
            .filter_map(|idx| test(idx).map(|t| (idx, t)))
            .fold(None, |best, cand| {
                if is_better(cand, best) {
                    Some(cand)
                } else {
                    best
                }
            });
        assert_eq!(bvh.nearest(&ray, test, |_| radius), brute_force);
    }
}
