pub mod autotuner;
pub mod box_dim;
pub mod concurrency;
pub mod error;
pub mod filler;
pub mod geometry;
pub mod particle_data;
pub mod random;
pub mod simulation;
pub mod simulation_parameters;
pub mod streaming;
pub mod temperature;

#[cfg(feature = "double-precision")]
pub mod floating_type_mod {
    pub type FT = f64;
    pub use std::f64::consts::{FRAC_1_PI, PI, TAU};
}

#[cfg(not(feature = "double-precision"))]
pub mod floating_type_mod {
    pub type FT = f32;
    pub use std::f32::consts::{FRAC_1_PI, PI, TAU};
}

use floating_type_mod::FT;

use nalgebra::SVector;

#[allow(dead_code)]
pub type V<FT, const D: usize> = SVector<FT, D>;

pub type VF<const D: usize> = V<FT, D>;

pub type V3 = V<FT, 3>;

/// Streamwise axis; the wall velocity points along it.
pub const AXIS_FLOW: usize = 0;
/// Confined axis, normal to the flat part of the walls.
pub const AXIS_CONFINED: usize = 1;
/// Remaining periodic axis.
pub const AXIS_NEUTRAL: usize = 2;

pub fn vec3f(x: FT, y: FT, z: FT) -> V3 {
    [x, y, z].into()
}

pub use simulation::*;
