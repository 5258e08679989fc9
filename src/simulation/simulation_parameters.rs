use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    floating_type_mod::FT,
    geometry::{BounceBackGeometry, SineGeometry, SlitGeometry},
    temperature::TemperatureSchedule,
    V3,
};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum BoundaryCondition {
    /// Full bounce-back in the wall frame.
    NoSlip,
    /// Only the velocity component normal to the local wall surface is reversed.
    Slip,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeometryParams {
    Slit {
        half_width: FT,
        #[serde(default)]
        wall_velocity: FT,
        boundary: BoundaryCondition,
    },
    Sine {
        half_width: FT,
        amplitude: FT,
        repeat_length: FT,
        #[serde(default)]
        wall_velocity: FT,
        boundary: BoundaryCondition,
    },
}

impl GeometryParams {
    pub fn build(&self) -> Result<BounceBackGeometry> {
        Ok(match *self {
            GeometryParams::Slit {
                half_width,
                wall_velocity,
                boundary,
            } => SlitGeometry::new(half_width, wall_velocity, boundary)?.into(),
            GeometryParams::Sine {
                half_width,
                amplitude,
                repeat_length,
                wall_velocity,
                boundary,
            } => SineGeometry::new(half_width, amplitude, repeat_length, wall_velocity, boundary)?.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerParams {
    pub density: FT,
    #[serde(default)]
    pub type_id: u32,
    pub temperature: TemperatureSchedule,
    pub seed: u32,

    // extra thickness beyond the outermost wall excursion, typically cell size + max grid shift
    #[serde(default)]
    pub fill_padding: FT,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ExecutionPolicy {
    Serial,
    Parallel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub policy: ExecutionPolicy,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default)]
    pub autotune: bool,
}

fn default_block_size() -> usize {
    256
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            policy: ExecutionPolicy::Parallel,
            block_size: default_block_size(),
            autotune: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    pub box_lo: V3,
    pub box_hi: V3,

    // streaming time step
    pub dt: FT,
    pub mass: FT,

    // number density of the solvent placed inside the channel at startup
    pub solvent_density: FT,
    pub solvent_temperature: FT,
    pub seed: u32,

    // free slots kept on top of the real particles, as a multiple of the expected virtual particle count
    #[serde(default = "default_capacity_factor")]
    pub capacity_factor: FT,

    pub geometry: GeometryParams,
    pub filler: Option<FillerParams>,

    #[serde(default)]
    pub execution: ExecutionParams,
}

fn default_capacity_factor() -> FT {
    2.
}

impl SimulationParams {
    pub fn from_yaml_str(s: &str) -> Result<SimulationParams> {
        Ok(serde_yaml::from_str(s)?)
    }

    /**
     * Reads the parameter file and, if given, replaces its top-level keys with the ones in `overwrite_path`.
     * Unknown keys in the overwrite file are rejected.
     */
    pub fn load(path: &Path, overwrite_path: Option<&Path>) -> Result<SimulationParams> {
        let params_yaml = std::fs::read_to_string(path)?;
        let mut params_serde: serde_yaml::Value = serde_yaml::from_str(&params_yaml)?;

        if let Some(overwrite_path) = overwrite_path {
            let overwrite_str = std::fs::read_to_string(overwrite_path)?;
            let overwrite: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&overwrite_str)?;
            apply_overwrites(&mut params_serde, overwrite)?;
        }

        Ok(serde_yaml::from_value(params_serde)?)
    }
}

fn apply_overwrites(params: &mut serde_yaml::Value, overwrite: HashMap<String, serde_yaml::Value>) -> Result<()> {
    let mapping = params
        .as_mapping_mut()
        .ok_or_else(|| Error::InvalidParam("simulation parameters are not a mapping".into()))?;
    for (k, v) in overwrite.into_iter() {
        let slot = mapping
            .get_mut(&serde_yaml::Value::String(k.clone()))
            .ok_or_else(|| Error::InvalidParam(format!("not able to find attribute {}", k)))?;
        *slot = v;
    }
    Ok(())
}
