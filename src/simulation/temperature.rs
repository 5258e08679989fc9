use serde::{Deserialize, Serialize};

use crate::{
    error::{require_positive, Error, Result},
    floating_type_mod::FT,
};

/// Temperature (kT) as a function of the timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemperatureSchedule {
    Constant(FT),

    /// Piecewise linear interpolation between `(timestep, kT)` points.
    /// Outside of the covered range the first/last value is held.
    Linear(Vec<(u64, FT)>),
}

impl TemperatureSchedule {
    pub fn validate(&self) -> Result<()> {
        match self {
            TemperatureSchedule::Constant(kt) => {
                require_positive("temperature", *kt)?;
            }
            TemperatureSchedule::Linear(points) => {
                if points.is_empty() {
                    return Err(Error::InvalidParam("temperature schedule needs at least one point".into()));
                }
                for (_, kt) in points {
                    require_positive("temperature", *kt)?;
                }
                if points.windows(2).any(|w| w[0].0 >= w[1].0) {
                    return Err(Error::InvalidParam(
                        "temperature schedule timesteps must be strictly increasing".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn value(&self, timestep: u64) -> FT {
        match self {
            TemperatureSchedule::Constant(kt) => *kt,
            TemperatureSchedule::Linear(points) => {
                // first point with a timestep beyond the query
                let next = points.partition_point(|&(t, _)| t <= timestep);
                if next == 0 {
                    points[0].1
                } else if next == points.len() {
                    points[points.len() - 1].1
                } else {
                    let (t0, v0) = points[next - 1];
                    let (t1, v1) = points[next];
                    let f = (timestep - t0) as FT / (t1 - t0) as FT;
                    v0 + f * (v1 - v0)
                }
            }
        }
    }
}
