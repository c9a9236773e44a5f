use crate::bounding_volume::Aabb;
use crate::math::{Real, DIM};
use crate::query::{InvRay, RayCast};

impl RayCast for Aabb {
    fn cast_local_inv_ray(&self, ray: &InvRay, max_time_of_impact: Real) -> Option<Real> {
        let mut tmin: Real = 0.0;
        let mut tmax: Real = max_time_of_impact;

        for i in 0usize..DIM {
            if ray.dir[i] == 0.0 {
                if ray.origin[i] < self.mins[i] || ray.origin[i] > self.maxs[i] {
                    return None;
                }
            } else {
                let mut inter_with_near_halfspace = (self.mins[i] - ray.origin[i]) * ray.inv_dir[i];
                let mut inter_with_far_halfspace = (self.maxs[i] - ray.origin[i]) * ray.inv_dir[i];

                if inter_with_near_halfspace > inter_with_far_halfspace {
                    core::mem::swap(
                        &mut inter_with_near_halfspace,
                        &mut inter_with_far_halfspace,
                    )
                }

                tmin = tmin.max(inter_with_near_halfspace);
                tmax = tmax.min(inter_with_far_halfspace);

                if tmin > tmax {
                    // This covers the case where tmax is negative because tmin is
                    // initialized at zero.
                    return None;
                }
            }
        }

        Some(tmin)
    }
}
