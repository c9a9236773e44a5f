use canopy3d::bounding_volume::Aabb;
use canopy3d::na::{Point3, Vector3};
use canopy3d::partitioning::{Bvh, BvhBuildStrategy, CullingMask, DEFAULT_REBUILD_TRIGGER};

fn row(len: usize) -> Bvh<usize> {
    let mut bvh = Bvh::new();

    for i in 0..len {
        let min = Point3::new(i as f32 * 2.0, 0.0, 0.0);
        bvh.add(Aabb::new(min, min + Vector3::repeat(1.0)), i, CullingMask::ALL);
    }

    bvh.build(BvhBuildStrategy::SurfaceAreaHeuristic);
    bvh
}

#[test]
fn small_motions_are_refitted_large_ones_rebuilt() {
    let mut bvh = row(64);
    let nodes_after_build = bvh.nodes().to_vec();

    // Nothing moved: nothing to do.
    assert!(!bvh.rebuild_with_defaults());
    assert_eq!(bvh.nodes(), &nodes_after_build[..]);

    // A tiny motion of a single leaf stays below the trigger.
    bvh.update(|aabb, data, _| {
        if *data == 10 {
            *aabb = aabb.translated(&Vector3::new(0.0, 0.001, 0.0));
            true
        } else {
            false
        }
    });
    assert!(!bvh.rebuild_with_defaults());
    assert!(bvh.relative_refit_delta() > 0.0);
    assert!(bvh.relative_refit_delta() <= DEFAULT_REBUILD_TRIGGER);
    bvh.assert_well_formed();

    // Swapping the two ends of the row stretches every node on their paths.
    bvh.update(|aabb, data, _| match *data {
        0 => {
            *aabb = aabb.translated(&Vector3::new(126.0, 0.0, 0.0));
            true
        }
        63 => {
            *aabb = aabb.translated(&Vector3::new(-126.0, 0.0, 0.0));
            true
        }
        _ => false,
    });
    assert!(bvh.rebuild_with_defaults());
    assert_eq!(bvh.accumulated_refit_delta(), 0.0);
    bvh.assert_well_formed();
}

#[test]
fn adding_a_leaf_forces_a_build() {
    let mut bvh = row(8);
    assert!(!bvh.requires_build());
    assert_eq!(bvh.add_with_default_mask(Aabb::new(Point3::origin(), Point3::origin()), 8), 8);
    assert!(bvh.requires_build());
    assert!(bvh.rebuild(BvhBuildStrategy::EqualCount, f32::MAX));
    assert_eq!(bvh.node_count(), 17);
    assert!(bvh.leaf_node(8).is_some());
}
