use crate::{
    box_dim::BoxDim,
    error::{require_finite, require_positive, Error, Result},
    floating_type_mod::{FT, TAU},
    random::Side,
    simulation_parameters::BoundaryCondition,
    AXIS_CONFINED, AXIS_FLOW, V3,
};

use super::{validate_common, BounceBackGeometryTrait};

const MAX_CROSSING_ITERATIONS: usize = 64;

/**
 * Channel with corrugated walls at `y = A sin(k x) -/+ H`.
 *
 * ```text
 *   y                  _____                         _____
 *   H+A  ____        /       \                     /       \
 *        ... \_____/           \_________________/  ...
 *
 *   -H+A ____        _____                         _____
 *        ... \_____/       \_____________________/  ...
 * ```
 *
 * Both walls follow the same profile, so the channel keeps the width `2H` along `y` while its
 * centerline snakes with amplitude `A` and wavenumber `k = 2 pi / repeat_length`.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineGeometry {
    half_width: FT,
    amplitude: FT,
    wavenumber: FT,
    repeat_length: FT,
    wall_velocity: FT,
    bc: BoundaryCondition,
}

impl SineGeometry {
    pub fn new(
        half_width: FT,
        amplitude: FT,
        repeat_length: FT,
        wall_velocity: FT,
        bc: BoundaryCondition,
    ) -> Result<SineGeometry> {
        validate_common(half_width, wall_velocity)?;
        require_finite("amplitude", amplitude)?;
        require_positive("repeat_length", repeat_length)?;
        if amplitude < 0. || amplitude >= half_width {
            return Err(Error::InvalidParam(format!(
                "amplitude must be in [0, half_width) (got amplitude={} half_width={})",
                amplitude, half_width
            )));
        }

        Ok(SineGeometry {
            half_width,
            amplitude,
            wavenumber: TAU / repeat_length,
            repeat_length,
            wall_velocity,
            bc,
        })
    }

    /**
     * Channel of length `channel_length` with `repetitions` full wall periods, given by its half width at
     * the widest and at the narrowest point of the corrugation.
     */
    pub fn from_channel(
        channel_length: FT,
        h_wide: FT,
        h_narrow: FT,
        repetitions: u32,
        wall_velocity: FT,
        bc: BoundaryCondition,
    ) -> Result<SineGeometry> {
        require_positive("channel_length", channel_length)?;
        if repetitions == 0 {
            return Err(Error::InvalidParam("repetitions must be > 0".into()));
        }
        if !(h_wide >= h_narrow) {
            return Err(Error::InvalidParam(format!(
                "h_wide must not be smaller than h_narrow (got {} < {})",
                h_wide, h_narrow
            )));
        }
        Self::new(
            0.5 * (h_wide + h_narrow),
            0.5 * (h_wide - h_narrow),
            channel_length / repetitions as FT,
            wall_velocity,
            bc,
        )
    }

    pub fn wavenumber(&self) -> FT {
        self.wavenumber
    }

    pub fn repeat_length(&self) -> FT {
        self.repeat_length
    }

    pub fn h_wide(&self) -> FT {
        self.half_width + self.amplitude
    }

    pub fn h_narrow(&self) -> FT {
        self.half_width - self.amplitude
    }

    /// Signed distance along `y` of the back-traced point at time `s` from the wall of `side`.
    #[inline(always)]
    fn gap(&self, pos: V3, vel: V3, s: FT, side: Side) -> FT {
        let x = pos[AXIS_FLOW] - s * vel[AXIS_FLOW];
        let y = pos[AXIS_CONFINED] - s * vel[AXIS_CONFINED];
        y - self.wall_position(x, side)
    }

    #[inline(always)]
    fn gap_derivative(&self, pos: V3, vel: V3, s: FT) -> FT {
        let x = pos[AXIS_FLOW] - s * vel[AXIS_FLOW];
        -vel[AXIS_CONFINED] + self.wall_slope(x) * vel[AXIS_FLOW]
    }
}

impl BounceBackGeometryTrait for SineGeometry {
    fn half_width(&self) -> FT {
        self.half_width
    }

    fn amplitude(&self) -> FT {
        self.amplitude
    }

    fn wall_velocity(&self) -> FT {
        self.wall_velocity
    }

    fn boundary_condition(&self) -> BoundaryCondition {
        self.bc
    }

    #[inline]
    fn wall_offset(&self, x: FT) -> FT {
        self.amplitude * FT::sin(self.wavenumber * x)
    }

    #[inline]
    fn wall_slope(&self, x: FT) -> FT {
        self.amplitude * self.wavenumber * FT::cos(self.wavenumber * x)
    }

    fn wall_offset_integral(&self, x0: FT, x1: FT) -> FT {
        self.amplitude / self.wavenumber * (FT::cos(self.wavenumber * x0) - FT::cos(self.wavenumber * x1))
    }

    /**
     * Newton iteration on the crossing time, safeguarded by bisection.
     *
     * The bracket `[0, dt]` is valid when the particle is beyond the wall now and was inside at the start
     * of the sub-step. Newton steps leaving the current bracket are replaced by bisection, so the iteration
     * never divides by a vanishing velocity component.
     */
    fn crossing_time(&self, pos: V3, vel: V3, dt: FT, side: Side) -> Option<FT> {
        let sign = side.sign();
        if !(dt > 0.) || sign * self.gap(pos, vel, dt, side) > 0. {
            return None;
        }

        let tolerance = 16. * FT::EPSILON * (self.half_width + self.amplitude);

        // invariant: point at `lo` is beyond the wall, point at `hi` is not
        let mut lo: FT = 0.;
        let mut hi: FT = dt;
        let mut s = 0.5 * dt;

        for _ in 0..MAX_CROSSING_ITERATIONS {
            let g = self.gap(pos, vel, s, side);
            if g.abs() <= tolerance {
                return Some(s);
            }
            if sign * g > 0. {
                lo = s;
            } else {
                hi = s;
            }

            let dg = self.gap_derivative(pos, vel, s);
            let newton = s - g / dg;
            s = if newton.is_finite() && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };

            if hi - lo <= FT::EPSILON * dt {
                break;
            }
        }

        Some(s)
    }

    fn validate_periodicity(&self, box_dim: &BoxDim) -> Result<()> {
        if self.amplitude == 0. {
            return Ok(());
        }
        let length = box_dim.length()[AXIS_FLOW];
        let repetitions = length / self.repeat_length;
        if (repetitions - repetitions.round()).abs() > 1e-4 || repetitions.round() < 1. {
            return Err(Error::InvalidParam(format!(
                "box length {} along the flow axis is not a multiple of the wall repeat length {}",
                length, self.repeat_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::Location, vec3f};

    fn geometry(bc: BoundaryCondition) -> SineGeometry {
        SineGeometry::new(10., 2., TAU / 0.1, 0., bc).unwrap()
    }

    #[test]
    fn construction_checks() {
        assert!(SineGeometry::new(10., 10., 5., 0., BoundaryCondition::NoSlip).is_err());
        assert!(SineGeometry::new(10., -1., 5., 0., BoundaryCondition::NoSlip).is_err());
        assert!(SineGeometry::new(10., 2., 0., 0., BoundaryCondition::NoSlip).is_err());
        assert!(SineGeometry::new(-1., 0., 5., 0., BoundaryCondition::NoSlip).is_err());
        assert!(SineGeometry::new(10., 0., 5., 0., BoundaryCondition::NoSlip).is_ok());
    }

    #[test]
    fn from_channel_matches_wide_and_narrow() {
        let g = SineGeometry::from_channel(30., 10., 1., 1, 0., BoundaryCondition::NoSlip).unwrap();
        assert_eq!(g.h_wide(), 10.);
        assert_eq!(g.h_narrow(), 1.);
        assert_eq!(g.repeat_length(), 30.);
        assert!(SineGeometry::from_channel(30., 10., 1., 0, 0., BoundaryCondition::NoSlip).is_err());
        assert!(SineGeometry::from_channel(30., 1., 10., 1, 0., BoundaryCondition::NoSlip).is_err());
    }

    #[test]
    fn wavenumber_from_repeat_length() {
        let g = geometry(BoundaryCondition::NoSlip);
        assert!((g.wavenumber() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn locate_follows_corrugation() {
        let g = geometry(BoundaryCondition::NoSlip);
        // quarter period: h = A
        let x = 0.25 * g.repeat_length();
        assert_eq!(g.locate(vec3f(x, 11.5, 0.)), Location::Inside);
        assert_eq!(g.locate(vec3f(x, 12.5, 0.)), Location::OutsideHigh);
        assert_eq!(g.locate(vec3f(x, -8.5, 0.)), Location::OutsideLow);
        assert_eq!(g.locate(vec3f(0., 10., 0.)), Location::Inside);
        assert_eq!(g.locate(vec3f(0., -10., 0.)), Location::Inside);
    }

    #[test]
    fn crossing_time_lands_on_wall() {
        let g = geometry(BoundaryCondition::NoSlip);
        let start = vec3f(3., 9.5, 0.);
        let vel = vec3f(2., 1.5, 0.3);
        let dt = 2.;
        let pos = start + vel * dt;
        assert_eq!(g.locate(start), Location::Inside);
        assert_eq!(g.locate(pos), Location::OutsideHigh);

        let s = g.crossing_time(pos, vel, dt, Side::High).unwrap();
        assert!(s > 0. && s < dt);
        let hit = pos - vel * s;
        assert!((hit.y - g.wall_position(hit.x, Side::High)).abs() < 1e-9);
    }

    #[test]
    fn no_crossing_without_inside_start() {
        let g = geometry(BoundaryCondition::NoSlip);
        let pos = vec3f(0., 10.5, 0.);
        assert!(g.crossing_time(pos, vec3f(0., -1., 0.), 0.01, Side::High).is_none());
    }

    #[test]
    fn integral_over_full_periods_vanishes() {
        let g = geometry(BoundaryCondition::NoSlip);
        let l = g.repeat_length();
        assert!(g.wall_offset_integral(-l, 2. * l).abs() < 1e-9);
        // half period starting at 0: 2 A / k
        let half = g.wall_offset_integral(0., 0.5 * l);
        assert!((half - 2. * 2. / 0.1).abs() < 1e-9);
    }

    #[test]
    fn box_must_hold_whole_periods() {
        let g = geometry(BoundaryCondition::NoSlip);
        let l = g.repeat_length();
        let good = BoxDim::new(vec3f(-l, -15., -1.), vec3f(l, 15., 1.)).unwrap();
        assert!(g.validate_box(&good, 1.).is_ok());
        let short = BoxDim::new(vec3f(-0.3 * l, -15., -1.), vec3f(l, 15., 1.)).unwrap();
        assert!(g.validate_box(&short, 1.).is_err());
        let thin = BoxDim::new(vec3f(-l, -11., -1.), vec3f(l, 11., 1.)).unwrap();
        assert!(matches!(g.validate_box(&thin, 0.), Err(Error::BoxTooSmall { .. })));
    }
}
