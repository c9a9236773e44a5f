extern crate nalgebra as na;

use canopy3d::bounding_volume::Aabb;
use canopy3d::partitioning::{Bvh, BvhBuildStrategy, CullingMask, TraversalAction};
use canopy3d::query::{Ray, RayCast};
use na::{Point3, Vector3};

const STATIC_GROUP: CullingMask = CullingMask::GROUP_1;
const DYNAMIC_GROUP: CullingMask = CullingMask::GROUP_2;

struct Body {
    velocity: Vector3<f32>,
}

fn main() {
    let mut rng = oorandom::Rand32::new(7);
    let mut bvh = Bvh::new();

    /*
     * A static floor made of tiles, and falling dynamic boxes.
     */
    for i in 0..20 {
        for j in 0..20 {
            let min = Point3::new(i as f32 * 2.0, -1.0, j as f32 * 2.0);
            let tile = Aabb::new(min, min + Vector3::new(2.0, 1.0, 2.0));
            let _ = bvh.add(tile, Body { velocity: Vector3::zeros() }, STATIC_GROUP);
        }
    }

    for _ in 0..200 {
        let center = Point3::new(
            rng.rand_float() * 40.0,
            5.0 + rng.rand_float() * 20.0,
            rng.rand_float() * 40.0,
        );
        let body = Body {
            velocity: Vector3::new(0.0, -1.0 - rng.rand_float() * 4.0, 0.0),
        };
        let aabb = Aabb::from_half_extents(center, Vector3::repeat(0.25));
        let _ = bvh.add(aabb, body, DYNAMIC_GROUP);
    }

    bvh.build(BvhBuildStrategy::SurfaceAreaHeuristic);
    println!(
        "Built a tree with {} leaves, {} nodes and depth {}.",
        bvh.len(),
        bvh.node_count(),
        bvh.subtree_depth(0)
    );

    /*
     * Simulate a few steps: move the dynamic boxes, then refit or rebuild the tree.
     */
    let dt = 0.1;

    for step in 0..30 {
        bvh.update(|aabb, body, _| {
            if body.velocity == Vector3::zeros() {
                return false;
            }

            *aabb = aabb.translated(&(body.velocity * dt));
            true
        });

        let rebuilt = bvh.rebuild(BvhBuildStrategy::SurfaceAreaHeuristic, 0.05);

        let mut landed = 0;
        bvh.query_bvh(&bvh, DYNAMIC_GROUP, STATIC_GROUP, |_, _, _, _| landed += 1);

        println!(
            "Step {step:>2}: {landed:>3} box/tile contacts, relative refit delta {:.4}{}",
            bvh.relative_refit_delta(),
            if rebuilt { " (rebuilt)" } else { "" }
        );
    }

    /*
     * Ray casts.
     */
    let ray = Ray::new(Point3::new(20.0, 50.0, 20.0), -Vector3::y());

    // All the leaves along the ray, roughly from near to far.
    let mut hits = vec![];
    let _ = bvh.query_ray(&ray, f32::MAX, CullingMask::ALL, |leaf, _, toi| {
        hits.push((leaf, toi));
        TraversalAction::Continue
    });
    println!("The vertical ray crosses {} leaves: {:?}", hits.len(), hits);

    // The closest static tile below the ray origin.
    let closest = bvh.cast_ray(&ray, f32::MAX, STATIC_GROUP, |leaf, _, best| {
        bvh.leaf(leaf).aabb.cast_local_ray(&ray, best)
    });

    if let Some((leaf, toi)) = closest {
        println!("The closest tile is {leaf}, hit at {:?}", ray.point_at(toi));
    }
}
