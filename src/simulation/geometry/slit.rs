use crate::{
    error::Result, floating_type_mod::FT, random::Side, simulation_parameters::BoundaryCondition, AXIS_CONFINED,
    V3,
};

use super::{validate_common, BounceBackGeometryTrait};

/// Two flat parallel walls at `y = -H` and `y = +H`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlitGeometry {
    half_width: FT,
    wall_velocity: FT,
    bc: BoundaryCondition,
}

impl SlitGeometry {
    pub fn new(half_width: FT, wall_velocity: FT, bc: BoundaryCondition) -> Result<SlitGeometry> {
        validate_common(half_width, wall_velocity)?;
        Ok(SlitGeometry {
            half_width,
            wall_velocity,
            bc,
        })
    }
}

impl BounceBackGeometryTrait for SlitGeometry {
    fn half_width(&self) -> FT {
        self.half_width
    }

    fn amplitude(&self) -> FT {
        0.
    }

    fn wall_velocity(&self) -> FT {
        self.wall_velocity
    }

    fn boundary_condition(&self) -> BoundaryCondition {
        self.bc
    }

    fn wall_offset(&self, _x: FT) -> FT {
        0.
    }

    fn wall_slope(&self, _x: FT) -> FT {
        0.
    }

    fn wall_offset_integral(&self, _x0: FT, _x1: FT) -> FT {
        0.
    }

    fn crossing_time(&self, pos: V3, vel: V3, dt: FT, side: Side) -> Option<FT> {
        let vy = vel[AXIS_CONFINED];
        if vy == 0. {
            return None;
        }
        let s = (pos[AXIS_CONFINED] - side.sign() * self.half_width) / vy;
        if s > 0. && s <= dt {
            Some(s)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::Location, vec3f};

    #[test]
    fn crossing_is_reflected_back_inside() {
        let slit = SlitGeometry::new(5., 0., BoundaryCondition::NoSlip).unwrap();
        let pos = vec3f(0., 5.5, 0.);
        let vel = vec3f(1., 1., 0.);
        let c = slit.collide(pos, vel, 1.).unwrap();
        assert!((c.dt_remaining - 0.5).abs() < 1e-12);
        assert_eq!(c.position.y, 5.);
        assert!((c.position.x - -0.5).abs() < 1e-12);
        assert_eq!(c.velocity, vec3f(-1., -1., 0.));

        let (p, v) = slit.reflect(pos, vel, 1.);
        assert_eq!(slit.locate(p), Location::Inside);
        assert!((p - vec3f(-1., 4.5, 0.)).norm() < 1e-12);
        assert_eq!(v, vec3f(-1., -1., 0.));
    }

    #[test]
    fn low_wall_crossing() {
        let slit = SlitGeometry::new(5., 0.5, BoundaryCondition::Slip).unwrap();
        let pos = vec3f(0., -5.25, 0.);
        let vel = vec3f(2., -1., 0.);
        assert_eq!(slit.locate(pos), Location::OutsideLow);
        let (p, v) = slit.reflect(pos, vel, 1.);
        assert!((p.y - -4.75).abs() < 1e-12);
        assert_eq!(v, vec3f(2., 1., 0.));
    }

    #[test]
    fn inside_particles_are_untouched() {
        let slit = SlitGeometry::new(5., 0., BoundaryCondition::NoSlip).unwrap();
        let pos = vec3f(3., 5., -1.);
        assert!(slit.collide(pos, vec3f(0., 1., 0.), 0.1).is_none());
        assert_eq!(slit.reflect(pos, vec3f(0., 1., 0.), 0.1), (pos, vec3f(0., 1., 0.)));
    }

    #[test]
    fn invalid_parameters() {
        assert!(SlitGeometry::new(0., 0., BoundaryCondition::NoSlip).is_err());
        assert!(SlitGeometry::new(1., FT::NAN, BoundaryCondition::NoSlip).is_err());
    }
}
