use canopy3d::bounding_volume::{Aabb, BoundingVolume};
use canopy3d::na::{Point3, Vector3};
use canopy3d::partitioning::{Bvh, BvhBuildStrategy, CullingMask};

fn random_leaves(rng: &mut oorandom::Rand32, len: usize) -> Vec<(Aabb, CullingMask)> {
    (0..len)
        .map(|_| {
            let center = Point3::from(Vector3::from_fn(|_, _| rng.rand_float() * 1000.0));
            let half_extents = Vector3::from_fn(|_, _| 0.5 + rng.rand_float() * 4.0);
            let mask = CullingMask::from_bits_retain(1 << rng.rand_range(0..16));
            (Aabb::from_half_extents(center, half_extents), mask)
        })
        .collect()
}

fn build(strategy: BvhBuildStrategy, leaves: &[(Aabb, CullingMask)]) -> Bvh<usize> {
    let mut bvh = Bvh::new();
    for (i, (aabb, mask)) in leaves.iter().enumerate() {
        bvh.add(*aabb, i, *mask);
    }
    bvh.build(strategy);
    bvh
}

fn check_containment(bvh: &Bvh<usize>) {
    let nodes = bvh.nodes();

    for node in nodes {
        match node.children() {
            Some([left, right]) => {
                assert!(node.contains(&nodes[left as usize]));
                assert!(node.contains(&nodes[right as usize]));
                assert_eq!(
                    node.mask(),
                    nodes[left as usize].mask() | nodes[right as usize].mask()
                );
            }
            None => {
                let leaf = bvh.leaf(node.child_offset());
                assert!(node.contains_aabb(&leaf.aabb));
                assert_eq!(node.mask(), leaf.mask);
            }
        }
    }
}

#[test]
fn ten_thousand_leaves_with_every_heuristic() {
    let mut rng = oorandom::Rand32::new(2024);
    let leaves = random_leaves(&mut rng, 10_000);
    let queries: Vec<_> = (0..100)
        .map(|_| {
            let center = Point3::from(Vector3::from_fn(|_, _| rng.rand_float() * 1000.0));
            Aabb::from_half_extents(center, Vector3::repeat(rng.rand_float() * 30.0))
        })
        .collect();

    let mut all_results = vec![];

    for strategy in [
        BvhBuildStrategy::SurfaceAreaHeuristic,
        BvhBuildStrategy::EqualCount,
    ] {
        let bvh = build(strategy, &leaves);
        assert_eq!(bvh.node_count(), 2 * leaves.len() - 1);
        assert_eq!(bvh.check_well_formed(), Ok(()));
        check_containment(&bvh);

        let mut results = vec![];

        for (k, query) in queries.iter().enumerate() {
            let mask = if k % 2 == 0 {
                CullingMask::ALL
            } else {
                CullingMask::GROUP_1 | CullingMask::GROUP_9
            };
            let mut found = vec![];
            bvh.query_aabb(query, mask, |leaf, data| {
                assert_eq!(leaf as usize, *data);
                found.push(leaf);
            });
            found.sort_unstable();

            let expected: Vec<u32> = leaves
                .iter()
                .enumerate()
                .filter(|(_, (aabb, leaf_mask))| {
                    leaf_mask.intersects(mask) && aabb.intersects(query)
                })
                .map(|(i, _)| i as u32)
                .collect();
            assert_eq!(found, expected);
            results.push(found);
        }

        all_results.push(results);
    }

    // The heuristic changes the tree shape, never the answers.
    assert_eq!(all_results[0], all_results[1]);
}

#[test]
fn middle_split_of_clustered_leaves_stays_valid() {
    // Exponentially spaced leaves make spatial-middle splits very unbalanced.
    let mut bvh = Bvh::new();
    for i in 0..2000 {
        let x = 1.0005f32.powi(i) * 0.001;
        let aabb = Aabb::from_half_extents(Point3::new(x, 0.0, 0.0), Vector3::repeat(0.0001));
        bvh.add(aabb, i, CullingMask::ALL);
    }
    bvh.build(BvhBuildStrategy::Middle);
    bvh.assert_well_formed();
    assert_eq!(bvh.node_count(), 3999);

    let mut count = 0;
    bvh.foreach(CullingMask::ALL, |_, _| count += 1);
    assert_eq!(count, 2000);
}
