use enum_dispatch::enum_dispatch;

mod sine;
mod slit;

pub use sine::SineGeometry;
pub use slit::SlitGeometry;

use crate::{
    box_dim::BoxDim,
    error::{Error, Result},
    floating_type_mod::FT,
    random::Side,
    simulation_parameters::BoundaryCondition,
    vec3f, AXIS_CONFINED, AXIS_FLOW, V3,
};

/// Where a point lies relative to the channel walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Inside,
    OutsideLow,
    OutsideHigh,
}

impl Location {
    pub fn side(self) -> Option<Side> {
        match self {
            Location::Inside => None,
            Location::OutsideLow => Some(Side::Low),
            Location::OutsideHigh => Some(Side::High),
        }
    }
}

/// Outcome of a wall crossing during one streaming sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Point on the wall where the trajectory crossed it (or the mirrored point, see `collide`).
    pub position: V3,
    /// Velocity after the bounce-back.
    pub velocity: V3,
    /// Part of the sub-step the particle spent beyond the wall.
    pub dt_remaining: FT,
}

/// A wall shape `y = h(x) +/- half_width` with a bounce-back rule.
///
/// Shape specific code only provides `h(x)`, its derivative and integral, and the crossing time;
/// classification, reflection and box validation are shared.
#[enum_dispatch]
pub trait BounceBackGeometryTrait {
    fn half_width(&self) -> FT;

    fn amplitude(&self) -> FT;

    /// Velocity of both walls along the flow axis.
    fn wall_velocity(&self) -> FT;

    fn boundary_condition(&self) -> BoundaryCondition;

    /// Displacement `h(x)` of the channel centerline.
    fn wall_offset(&self, x: FT) -> FT;

    /// `dh/dx`
    fn wall_slope(&self, x: FT) -> FT;

    /// Integral of `h` over `[x0, x1]`.
    fn wall_offset_integral(&self, x0: FT, x1: FT) -> FT;

    /**
     * Time `s` in `(0, dt]` such that `pos - s * vel` lies on the wall of `side`,
     * or `None` if the back-traced straight trajectory does not cross that wall within `dt`.
     */
    fn crossing_time(&self, pos: V3, vel: V3, dt: FT, side: Side) -> Option<FT>;

    /// Shape specific box checks on top of `validate_box`.
    fn validate_periodicity(&self, _box_dim: &BoxDim) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn wall_position(&self, x: FT, side: Side) -> FT {
        self.wall_offset(x) + side.sign() * self.half_width()
    }

    /// Normal of the wall surface at `x`. Not normalized; same direction for both walls.
    #[inline]
    fn wall_normal(&self, x: FT) -> V3 {
        vec3f(-self.wall_slope(x), 1., 0.)
    }

    /// A point exactly on a wall counts as inside.
    fn locate(&self, pos: V3) -> Location {
        let h = self.wall_offset(pos[AXIS_FLOW]);
        let y = pos[AXIS_CONFINED];
        let half_width = self.half_width();

        if y > h + half_width {
            Location::OutsideHigh
        } else if y < h - half_width {
            Location::OutsideLow
        } else {
            Location::Inside
        }
    }

    /**
     * Bounce-back for a particle at `pos` that moved with `vel` during the last `dt`.
     *
     * Returns `None` for particles inside the channel. Otherwise the particle is moved back along its
     * trajectory onto the wall and its velocity is reflected. If the trajectory did not start inside
     * the channel no crossing exists; the particle is then mirrored across the wall at fixed `x` and
     * no time remains.
     *
     * Only the first crossed wall is handled. The caller has to check `locate` again before finishing
     * the sub-step.
     */
    fn collide(&self, pos: V3, vel: V3, dt: FT) -> Option<Collision> {
        let side = self.locate(pos).side()?;

        let (position, dt_remaining) = match self.crossing_time(pos, vel, dt, side) {
            Some(s) => {
                let mut p = pos - vel * s;
                // land exactly on the surface so that rounding cannot leave the particle outside
                p[AXIS_CONFINED] = self.wall_position(p[AXIS_FLOW], side);
                (p, s)
            }
            None => {
                let mut p = pos;
                let wall = self.wall_position(p[AXIS_FLOW], side);
                p[AXIS_CONFINED] = 2. * wall - p[AXIS_CONFINED];
                (p, 0.)
            }
        };

        let velocity = bounce_back_velocity(
            vel,
            self.wall_normal(position[AXIS_FLOW]),
            self.wall_velocity(),
            self.boundary_condition(),
        );

        Some(Collision {
            position,
            velocity,
            dt_remaining,
        })
    }

    /// `collide` followed by streaming the remaining time with the reflected velocity.
    fn reflect(&self, pos: V3, vel: V3, dt: FT) -> (V3, V3) {
        match self.collide(pos, vel, dt) {
            None => (pos, vel),
            Some(c) => (c.position + c.velocity * c.dt_remaining, c.velocity),
        }
    }

    /// The box has to enclose the outermost wall excursion plus the fill padding on both sides.
    fn validate_box(&self, box_dim: &BoxDim, fill_padding: FT) -> Result<()> {
        let required = self.half_width() + self.amplitude() + fill_padding;
        let (lo, hi) = box_dim.confined_extent();
        if hi < required || lo > -required {
            return Err(Error::BoxTooSmall { lo, hi, required });
        }
        self.validate_periodicity(box_dim)
    }

    /// Binding name of `half_width`.
    fn get_h(&self) -> FT {
        self.half_width()
    }

    /// Binding name of `wall_velocity`.
    fn get_velocity(&self) -> FT {
        self.wall_velocity()
    }

    /// Binding name of `boundary_condition`.
    fn get_boundary_condition(&self) -> BoundaryCondition {
        self.boundary_condition()
    }
}

#[enum_dispatch(BounceBackGeometryTrait)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BounceBackGeometry {
    SlitGeometry(SlitGeometry),
    SineGeometry(SineGeometry),
}

/**
 * Bounce-back in the frame of a wall moving with `wall_velocity` along `x`.
 *
 * No-slip reverses the full relative velocity, which gives `2 * U - v` in the lab frame.
 * Slip only reverses the component along `normal`.
 */
pub fn bounce_back_velocity(vel: V3, normal: V3, wall_velocity: FT, bc: BoundaryCondition) -> V3 {
    let mut wall = V3::zeros();
    wall[AXIS_FLOW] = wall_velocity;

    let relative = vel - wall;
    let reflected = match bc {
        BoundaryCondition::NoSlip => -relative,
        BoundaryCondition::Slip => {
            let n = normal / normal.norm();
            relative - n * (2. * relative.dot(&n))
        }
    };
    reflected + wall
}

pub(crate) fn validate_common(half_width: FT, wall_velocity: FT) -> Result<()> {
    crate::error::require_positive("half_width", half_width)?;
    crate::error::require_finite("wall_velocity", wall_velocity)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_slip_is_full_reversal_in_wall_frame() {
        let v = vec3f(1., -2., 0.5);
        let out = bounce_back_velocity(v, vec3f(0.3, 1., 0.), 0.25, BoundaryCondition::NoSlip);
        assert_eq!(out, vec3f(2. * 0.25 - 1., 2., -0.5));
    }

    #[test]
    fn slip_flat_wall_only_flips_normal() {
        let v = vec3f(1., -2., 0.5);
        let out = bounce_back_velocity(v, vec3f(0., 1., 0.), 0., BoundaryCondition::Slip);
        assert_eq!(out, vec3f(1., 2., 0.5));
    }

    #[test]
    fn slip_preserves_speed_relative_to_wall() {
        let v = vec3f(0.7, -1.3, 0.2);
        let u = 0.4;
        let out = bounce_back_velocity(v, vec3f(-0.5, 1., 0.), u, BoundaryCondition::Slip);
        let wall = vec3f(u, 0., 0.);
        assert!(((v - wall).norm() - (out - wall).norm()).abs() < 1e-6);
    }

    #[test]
    fn location_side() {
        assert_eq!(Location::Inside.side(), None);
        assert_eq!(Location::OutsideLow.side(), Some(Side::Low));
        assert_eq!(Location::OutsideHigh.side(), Some(Side::High));
    }
}
