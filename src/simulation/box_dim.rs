use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    floating_type_mod::FT,
    AXIS_CONFINED, AXIS_FLOW, AXIS_NEUTRAL, V3,
};

/// Orthorhombic simulation box. Periodic along `x` and `z`; along `y` it only needs to enclose the walls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDim {
    pub lo: V3,
    pub hi: V3,
}

impl BoxDim {
    pub fn new(lo: V3, hi: V3) -> Result<BoxDim> {
        for d in 0..3 {
            if !(lo[d].is_finite() && hi[d].is_finite() && hi[d] > lo[d]) {
                return Err(Error::InvalidParam(format!(
                    "box extent along axis {} is empty: [{}, {}]",
                    d, lo[d], hi[d]
                )));
            }
        }
        Ok(BoxDim { lo, hi })
    }

    pub fn length(&self) -> V3 {
        self.hi - self.lo
    }

    /// Area of the footprint spanned by the periodic axes.
    pub fn periodic_area(&self) -> FT {
        let l = self.length();
        l[AXIS_FLOW] * l[AXIS_NEUTRAL]
    }

    /// Wraps the periodic coordinates into `[lo, hi)`. The confined coordinate is left untouched.
    pub fn wrap(&self, mut x: V3) -> V3 {
        for d in [AXIS_FLOW, AXIS_NEUTRAL] {
            let l = self.hi[d] - self.lo[d];
            let shifted = (x[d] - self.lo[d]).rem_euclid(l);
            // rem_euclid can round up to `l` for tiny negative inputs
            x[d] = if shifted >= l { self.lo[d] } else { self.lo[d] + shifted };
        }
        x
    }

    pub fn confined_extent(&self) -> (FT, FT) {
        (self.lo[AXIS_CONFINED], self.hi[AXIS_CONFINED])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3f;

    #[test]
    fn wrap_periodic_axes_only() {
        let b = BoxDim::new(vec3f(-5., -20., -2.), vec3f(5., 20., 2.)).unwrap();
        let w = b.wrap(vec3f(6., 30., -3.));
        assert!((w.x - -4.).abs() < 1e-9);
        assert_eq!(w.y, 30.);
        assert!((w.z - 1.).abs() < 1e-9);

        let inside = vec3f(1., 2., 0.5);
        assert_eq!(b.wrap(inside), inside);
    }

    #[test]
    fn empty_box_rejected() {
        assert!(BoxDim::new(vec3f(0., 0., 0.), vec3f(1., 0., 1.)).is_err());
    }

    #[test]
    fn footprint_area() {
        let b = BoxDim::new(vec3f(-5., -20., -2.), vec3f(5., 20., 2.)).unwrap();
        assert_eq!(b.periodic_area(), 40.);
    }
}
