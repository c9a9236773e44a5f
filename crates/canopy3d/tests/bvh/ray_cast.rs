use approx::assert_relative_eq;
use canopy3d::bounding_volume::Aabb;
use canopy3d::na::{Point3, Vector3};
use canopy3d::partitioning::{Bvh, BvhBuildStrategy, CullingMask, TraversalAction};
use canopy3d::query::{Ray, RayCast};

/// A 10x10x10 grid of unit cubes spaced 2 units apart. Only the cubes on the diagonal belong
/// to the first group.
fn grid(strategy: BvhBuildStrategy) -> Bvh<Point3<f32>> {
    let mut bvh = Bvh::new();

    for i in 0..10 {
        for j in 0..10 {
            for k in 0..10 {
                let min = Point3::new(i as f32, j as f32, k as f32) * 2.0;
                let mask = if i == j && j == k {
                    CullingMask::GROUP_1
                } else {
                    CullingMask::GROUP_2
                };
                bvh.add(Aabb::new(min, min + Vector3::repeat(1.0)), min, mask);
            }
        }
    }

    bvh.build(strategy);
    bvh
}

#[test]
fn cast_ray_through_grid() {
    for strategy in [
        BvhBuildStrategy::EqualCount,
        BvhBuildStrategy::Middle,
        BvhBuildStrategy::AreaWeighted,
        BvhBuildStrategy::SurfaceAreaHeuristic,
    ] {
        let bvh = grid(strategy);
        // Diagonal ray going through the cubes (0, 0, 0), (1, 1, 1), etc.
        let ray = Ray::new(Point3::new(-1.0, -1.0, -1.0), Vector3::repeat(1.0).normalize());
        let cast = |leaf: u32, _: &Point3<f32>, best: f32| {
            bvh.leaf(leaf).aabb.cast_local_ray(&ray, best)
        };

        let (leaf, toi) = bvh
            .cast_ray(&ray, f32::MAX, CullingMask::ALL, cast)
            .expect("the ray must hit the first cube");
        assert_eq!(bvh.leaf(leaf).data, Point3::origin());
        assert_relative_eq!(toi, 3.0f32.sqrt(), epsilon = 1.0e-5);

        assert!(bvh.cast_ray(&ray, f32::MAX, CullingMask::GROUP_2, cast).is_none());

        // Limiting the time of impact excludes the first cube.
        assert!(bvh.cast_ray(&ray, 1.0, CullingMask::ALL, cast).is_none());

        let mut diagonal = vec![];
        let hit = bvh.query_ray(&ray, f32::MAX, CullingMask::GROUP_1, |_, data, _| {
            diagonal.push(*data);
            TraversalAction::Continue
        });
        assert!(hit);
        diagonal.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(diagonal.len(), 10);
        for (i, min) in diagonal.iter().enumerate() {
            assert_eq!(*min, Point3::new(i as f32, i as f32, i as f32) * 2.0);
        }
    }
}

#[test]
fn ray_starting_inside_a_leaf() {
    let bvh = grid(BvhBuildStrategy::SurfaceAreaHeuristic);
    let ray = Ray::new(Point3::new(4.5, 4.5, 4.5), -Vector3::x());
    let mut hits = vec![];
    bvh.query_ray(&ray, f32::MAX, CullingMask::ALL, |leaf, _, toi| {
        hits.push((bvh.leaf(leaf).data.x, toi));
        TraversalAction::Continue
    });

    // Near-first order along the split axes.
    assert_eq!(hits, vec![(4.0, 0.0), (2.0, 1.5), (0.0, 3.5)]);
}
