use std::{
    collections::HashMap,
    fmt::Display,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info};
use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    autotuner::Autotuner,
    box_dim::BoxDim,
    concurrency::iter_mut2,
    error::{require_positive, Error, Result},
    filler::{compute_fill_regions, FillReport, VirtualParticleFiller},
    floating_type_mod::FT,
    geometry::{BounceBackGeometry, BounceBackGeometryTrait},
    particle_data::MpcdParticleData,
    random::{Side, StreamKey, StreamPurpose},
    simulation_parameters::SimulationParams,
    streaming::{ConfinedStreaming, StreamReport},
    vec3f, AXIS_FLOW, AXIS_NEUTRAL, V3,
};

#[derive(Clone)]
pub struct Counter<T> {
    values: Vec<T>,
    last_start: Instant,
}

impl<T> Counter<T> {
    fn new() -> Self {
        Counter::<T> {
            last_start: Instant::now(),
            values: Vec::new(),
        }
    }

    fn add_value(&mut self, v: T) {
        self.values.push(v);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Counter<FT> {
    pub fn avg(&self) -> FT {
        self.values.iter().cloned().sum::<FT>() / self.values.len() as FT
    }
    pub fn min(&self) -> FT {
        self.values.iter().cloned().fold(FT::MAX, FT::min)
    }
    pub fn max(&self) -> FT {
        self.values.iter().cloned().fold(FT::MIN, FT::max)
    }
}

impl Counter<Duration> {
    fn begin(&mut self) {
        self.last_start = Instant::now();
    }

    fn end(&mut self) {
        self.values.push(Instant::now() - self.last_start);
    }

    pub fn avg(&self) -> Duration {
        self.sum() / self.values.len().max(1) as u32
    }

    pub fn sum(&self) -> Duration {
        self.values.iter().cloned().sum::<Duration>()
    }
}

pub struct ValueCounters {
    pub counters: HashMap<String, Counter<FT>>,
    enabled: bool,
}

impl ValueCounters {
    fn new(enabled: bool) -> ValueCounters {
        ValueCounters {
            counters: HashMap::default(),
            enabled,
        }
    }

    fn add_value(&mut self, id: &str, v: FT) {
        if self.enabled {
            self.counters
                .entry(id.to_string())
                .or_insert_with(Counter::<FT>::new)
                .add_value(v);
        }
    }
}

pub struct PerformanceCounters {
    pub counters: HashMap<String, Counter<Duration>>,
    enabled: bool,
}

impl PerformanceCounters {
    fn new(enabled: bool) -> PerformanceCounters {
        PerformanceCounters {
            counters: HashMap::default(),
            enabled,
        }
    }

    fn begin(&mut self, id: &str) {
        if self.enabled {
            self.counters
                .entry(id.to_string())
                .or_insert_with(Counter::<Duration>::new)
                .begin();
        }
    }

    fn end(&mut self, id: &str) {
        if self.enabled {
            if let Some(counter) = self.counters.get_mut(id) {
                counter.end();
            }
        }
    }
}

/// Optional block size tuning for the two parallel loops of a step.
struct StepTuners {
    stream: Autotuner,
    fill: Autotuner,
}

/**
 * Solvent between two bounce-back walls.
 *
 * Each step removes the virtual particles of the previous step, streams the real particles and fills the
 * regions beyond the walls again.
 */
pub struct ChannelSimulation {
    params: SimulationParams,
    box_dim: BoxDim,
    geometry: Arc<BounceBackGeometry>,
    pub particles: MpcdParticleData,
    filler: Option<VirtualParticleFiller>,
    streaming: ConfinedStreaming,
    tuners: Option<StepTuners>,

    timestep: u64,
    last_fill: Option<FillReport>,
    last_stream: StreamReport,

    pub pcounters: PerformanceCounters,
    pub vcounters: ValueCounters,
}

impl ChannelSimulation {
    pub fn new(params: SimulationParams, counters_enabled: bool) -> Result<ChannelSimulation> {
        require_positive("dt", params.dt)?;
        require_positive("mass", params.mass)?;
        require_positive("solvent_density", params.solvent_density)?;
        require_positive("solvent_temperature", params.solvent_temperature)?;
        if !(params.capacity_factor >= 1.) {
            return Err(Error::InvalidParam(format!(
                "capacity_factor must be >= 1 (got {})",
                params.capacity_factor
            )));
        }

        let box_dim = BoxDim::new(params.box_lo, params.box_hi)?;
        let geometry = Arc::new(params.geometry.build()?);
        let fill_padding = params.filler.as_ref().map(|f| f.fill_padding).unwrap_or(0.);
        geometry.validate_box(&box_dim, fill_padding)?;

        let (positions, velocities) = init_solvent(&params, &geometry, &box_dim)?;
        let num_real = positions.len();

        let expected_virtual = match &params.filler {
            Some(f) => {
                let (lo, hi) = compute_fill_regions(&box_dim, &geometry, f.fill_padding);
                f.density * (lo.volume + hi.volume)
            }
            None => 0.,
        };
        let capacity = num_real + (params.capacity_factor * expected_virtual).ceil() as usize;
        let particles = MpcdParticleData::new(positions, velocities, 0, params.mass, capacity)?;

        let filler = match &params.filler {
            Some(f) => Some(VirtualParticleFiller::new(
                f,
                params.mass,
                geometry.clone(),
                num_real as u64,
            )?),
            None => None,
        };

        let tuners = if params.execution.autotune {
            Some(StepTuners {
                stream: Autotuner::new(32, 1024, 32, 5, 100000, "stream")?,
                fill: Autotuner::new(32, 1024, 32, 5, 100000, "fill")?,
            })
        } else {
            None
        };

        info!(
            "channel with {:?}: {} solvent particles, capacity {}",
            geometry, num_real, capacity
        );

        Ok(ChannelSimulation {
            streaming: ConfinedStreaming::new(params.dt, params.execution.policy),
            params,
            box_dim,
            geometry,
            particles,
            filler,
            tuners,
            timestep: 0,
            last_fill: None,
            last_stream: StreamReport::default(),
            pcounters: PerformanceCounters::new(counters_enabled),
            vcounters: ValueCounters::new(counters_enabled),
        })
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn box_dim(&self) -> &BoxDim {
        &self.box_dim
    }

    pub fn geometry(&self) -> &BounceBackGeometry {
        &self.geometry
    }

    pub fn filler(&self) -> Option<&VirtualParticleFiller> {
        self.filler.as_ref()
    }

    /**
     * Replaces the walls for streaming and filling alike.
     *
     * The box is checked against the new walls first; on error nothing changes. Real particles are not
     * moved, so they should already lie inside the new channel.
     */
    pub fn set_geometry(&mut self, geometry: BounceBackGeometry) -> Result<()> {
        let fill_padding = self.filler.as_ref().map(|f| f.fill_padding()).unwrap_or(0.);
        geometry.validate_box(&self.box_dim, fill_padding)?;

        info!("switching walls to {:?}", geometry);
        self.geometry = Arc::new(geometry);
        if let Some(filler) = &mut self.filler {
            filler.set_geometry(self.geometry.clone());
        }
        Ok(())
    }

    pub fn last_fill(&self) -> Option<FillReport> {
        self.last_fill
    }

    pub fn last_stream(&self) -> StreamReport {
        self.last_stream
    }

    pub fn step(&mut self) -> Result<()> {
        self.pcounters.begin("simulation-step");

        self.particles.remove_virtual_particles();

        self.pcounters.begin("stream");
        let block_size = match &mut self.tuners {
            Some(t) => {
                t.stream.begin();
                t.stream.param()
            }
            None => self.params.execution.block_size,
        };
        self.last_stream = self
            .streaming
            .stream(&mut self.particles, &self.geometry, &self.box_dim, block_size);
        if let Some(t) = &mut self.tuners {
            t.stream.end();
        }
        self.pcounters.end("stream");

        self.timestep += 1;

        if let Some(filler) = &mut self.filler {
            self.pcounters.begin("fill");
            let block_size = match &mut self.tuners {
                Some(t) => {
                    t.fill.begin();
                    t.fill.param()
                }
                None => self.params.execution.block_size,
            };
            // the draws depend only on the timestep, so a second call after growing yields the same particles
            let mut grown = false;
            let report = loop {
                match filler.fill(
                    self.timestep,
                    &mut self.particles,
                    &self.box_dim,
                    self.params.execution.policy,
                    block_size,
                ) {
                    Err(Error::Capacity { requested, available }) if !grown => {
                        let headroom = (requested as FT * self.params.capacity_factor).ceil() as usize;
                        info!(
                            "step {}: growing particle store from {} to {} free slots",
                            self.timestep, available, headroom
                        );
                        self.particles.reserve_capacity(headroom);
                        grown = true;
                    }
                    result => break result?,
                }
            };
            if let Some(t) = &mut self.tuners {
                t.fill.end();
            }
            self.last_fill = Some(report);
            self.vcounters.add_value("virtual-particles", report.total() as FT);
            self.pcounters.end("fill");
        }

        self.vcounters.add_value("mean-velocity-x", self.mean_velocity_x());
        self.vcounters.add_value("kinetic-temperature", self.kinetic_temperature());
        self.vcounters
            .add_value("wall-collisions", self.last_stream.collisions as FT);

        self.pcounters.end("simulation-step");
        debug!("finished step {}", self.timestep);
        Ok(())
    }

    /// Mean streamwise velocity of the real particles.
    pub fn mean_velocity_x(&self) -> FT {
        let v = self.particles.real_velocities();
        if v.is_empty() {
            return 0.;
        }
        v.iter().map(|v| v[AXIS_FLOW]).sum::<FT>() / v.len() as FT
    }

    /// `m <|v - <v>|^2> / 3` over the real particles, with one degree of freedom removed for the mean.
    pub fn kinetic_temperature(&self) -> FT {
        let v = self.particles.real_velocities();
        if v.len() < 2 {
            return 0.;
        }
        let mean = v.iter().fold(V3::zeros(), |acc, v| acc + v) / v.len() as FT;
        let sum_sq: FT = v.iter().map(|v| (v - mean).norm_squared()).sum();
        self.particles.mass() * sum_sq / (3. * (v.len() - 1) as FT)
    }
}

/// Real particles spread uniformly over the channel with thermal velocities around zero.
fn init_solvent(
    params: &SimulationParams,
    geometry: &BounceBackGeometry,
    box_dim: &BoxDim,
) -> Result<(Vec<V3>, Vec<V3>)> {
    // both walls follow the same profile, so the channel cross section is 2H at every x
    let volume = box_dim.periodic_area() * 2. * geometry.half_width();
    let n = (params.solvent_density * volume).round() as usize;

    let thermal = Normal::new(0., FT::sqrt(params.solvent_temperature / params.mass))
        .map_err(|e| Error::InvalidParam(format!("solvent velocity distribution: {}", e)))?;
    let key = StreamKey::new(params.seed, 0, Side::Low, StreamPurpose::SolventInit);
    let half_width = geometry.half_width();
    let (lo, hi) = (box_dim.lo, box_dim.hi);

    let mut positions = vec![V3::zeros(); n];
    let mut velocities = vec![V3::zeros(); n];
    iter_mut2(
        params.execution.policy,
        params.execution.block_size,
        &mut positions,
        &mut velocities,
        |i, p_position, p_velocity| {
            let mut rng = key.rng(i as u64);
            let x = rng.gen_range(lo[AXIS_FLOW]..hi[AXIS_FLOW]);
            let z = rng.gen_range(lo[AXIS_NEUTRAL]..hi[AXIS_NEUTRAL]);
            let y = geometry.wall_offset(x) + rng.gen_range(-half_width..half_width);
            *p_position = vec3f(x, y, z);
            *p_velocity = vec3f(
                thermal.sample(&mut rng),
                thermal.sample(&mut rng),
                thermal.sample(&mut rng),
            );
        },
    );

    Ok((positions, velocities))
}

pub fn write_statistics(simulation: &ChannelSimulation) -> String {
    let mut s = String::new();

    if let Some(step) = simulation.pcounters.counters.get("simulation-step") {
        s += &format!("simulation-time: {}ms\n\n", step.sum().as_secs_f64() * 1000.);
    }

    let mut v = simulation.pcounters.counters.iter().collect::<Vec<_>>();
    v.sort_by(|x, y| x.0.cmp(y.0));
    for (label, pcounter) in v {
        s += &format!("{}: avg:{}ms\n", label, pcounter.avg().as_secs_f64() * 1000.);
    }
    s += "\n";

    let mut v = simulation
        .vcounters
        .counters
        .iter()
        .filter(|(_, c)| !c.is_empty())
        .collect::<Vec<_>>();
    v.sort_by(|x, y| x.0.cmp(y.0));
    for (label, vcounter) in v {
        s += &format!(
            "{}: min:{} max:{} avg:{}\n",
            label,
            vcounter.min(),
            vcounter.max(),
            vcounter.avg()
        );
    }

    s
}

pub fn is_ft_approx_eq<FT: Float>(a: FT, b: FT, tolerance: FT) -> bool {
    assert!(!a.is_nan());
    assert!(!b.is_nan());
    b <= a + tolerance && b >= a - tolerance
}

pub fn assert_ft_approx_eq<FT: Float + Display>(a: FT, b: FT, tolerance: FT, s: impl FnOnce() -> String) {
    if !is_ft_approx_eq(a, b, tolerance) {
        panic!(
            "{} value not equal with a tolerance of {}:\n\ta={}\n\tb={}\n",
            s(),
            tolerance,
            a,
            b
        );
    }
}
