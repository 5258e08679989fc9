use std::sync::Arc;

use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

use crate::{
    box_dim::BoxDim,
    concurrency::iter_mut4,
    error::{require_finite, require_positive, Error, Result},
    floating_type_mod::FT,
    geometry::{BounceBackGeometry, BounceBackGeometryTrait, Location},
    particle_data::ParticleStore,
    random::{Side, StreamKey, StreamPurpose},
    simulation_parameters::{ExecutionPolicy, FillerParams},
    temperature::TemperatureSchedule,
    vec3f, AXIS_FLOW, AXIS_NEUTRAL, V3,
};

/**
 * Band beyond one wall that is kept filled with virtual particles.
 *
 * Along `y` the band spans from the innermost wall excursion to `outer`; only the part beyond the
 * instantaneous wall surface belongs to the region.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRegion {
    pub side: Side,
    /// `y` of the innermost wall excursion.
    pub inner: FT,
    /// `y` of the outer edge of the fill band.
    pub outer: FT,
    pub volume: FT,
}

impl FillRegion {
    /// Bounds along `y` in ascending order.
    pub fn y_range(&self) -> (FT, FT) {
        if self.inner < self.outer {
            (self.inner, self.outer)
        } else {
            (self.outer, self.inner)
        }
    }
}

/**
 * Regions on both sides of the channel for the given box.
 *
 * High side: `H - A <= y <= H + A + padding` beyond the wall. The volume integrates the exact wall
 * profile over the box, so it also holds for boxes that do not contain whole wall periods.
 */
pub fn compute_fill_regions(
    box_dim: &BoxDim,
    geometry: &BounceBackGeometry,
    fill_padding: FT,
) -> (FillRegion, FillRegion) {
    let half_width = geometry.half_width();
    let amplitude = geometry.amplitude();
    let outer = half_width + amplitude + fill_padding;

    let (x0, x1) = (box_dim.lo[AXIS_FLOW], box_dim.hi[AXIS_FLOW]);
    let lz = box_dim.length()[AXIS_NEUTRAL];
    let band_area = (x1 - x0) * (outer - half_width);
    let offset_area = geometry.wall_offset_integral(x0, x1);

    let region = |side: Side, area: FT| FillRegion {
        side,
        inner: side.sign() * (half_width - amplitude),
        outer: side.sign() * outer,
        volume: FT::max(lz * area, 0.),
    };

    (
        region(Side::Low, band_area + offset_area),
        region(Side::High, band_area - offset_area),
    )
}

/// Poisson distributed particle count around `density * volume`, drawn from the count stream of `side`.
pub fn draw_fill_count(density: FT, volume: FT, seed: u32, timestep: u64, side: Side) -> usize {
    let expected = density * volume;
    if !(expected > 0.) {
        return 0;
    }
    let mut rng = StreamKey::new(seed, timestep, side, StreamPurpose::FillCount).rng(0);
    match Poisson::new(expected) {
        Ok(poisson) => {
            let n: FT = poisson.sample(&mut rng);
            n as usize
        }
        Err(_) => expected.round() as usize,
    }
}

/// Summary of one `fill` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub first_index: usize,
    pub first_tag: u64,
    pub count_low: usize,
    pub count_high: usize,
}

impl FillReport {
    pub fn total(&self) -> usize {
        self.count_low + self.count_high
    }
}

/// Samples virtual particles in the regions swept by the channel walls.
pub struct VirtualParticleFiller {
    density: FT,
    type_id: u32,
    temperature: TemperatureSchedule,
    seed: u32,
    fill_padding: FT,
    mass: FT,
    geometry: Arc<BounceBackGeometry>,

    next_tag: u64,
}

impl VirtualParticleFiller {
    /**
     * `first_tag` is the first identifier handed out to virtual particles, usually the number of real
     * particles. Tags then grow monotonically for the whole run.
     */
    pub fn new(
        params: &FillerParams,
        mass: FT,
        geometry: Arc<BounceBackGeometry>,
        first_tag: u64,
    ) -> Result<VirtualParticleFiller> {
        let mut filler = VirtualParticleFiller {
            density: 0.,
            type_id: params.type_id,
            temperature: TemperatureSchedule::Constant(1.),
            seed: params.seed,
            fill_padding: 0.,
            mass: require_positive("mass", mass)?,
            geometry,
            next_tag: first_tag,
        };
        filler.set_density(params.density)?;
        filler.set_temperature(params.temperature.clone())?;
        filler.set_fill_padding(params.fill_padding)?;
        Ok(filler)
    }

    pub fn set_density(&mut self, density: FT) -> Result<()> {
        self.density = require_positive("density", density)?;
        Ok(())
    }

    pub fn set_type(&mut self, type_id: u32) {
        self.type_id = type_id;
    }

    pub fn set_temperature(&mut self, temperature: TemperatureSchedule) -> Result<()> {
        temperature.validate()?;
        self.temperature = temperature;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    pub fn set_fill_padding(&mut self, fill_padding: FT) -> Result<()> {
        require_finite("fill_padding", fill_padding)?;
        if fill_padding < 0. {
            return Err(Error::InvalidParam(format!("fill_padding must be >= 0 (got {})", fill_padding)));
        }
        self.fill_padding = fill_padding;
        Ok(())
    }

    pub fn set_geometry(&mut self, geometry: Arc<BounceBackGeometry>) {
        self.geometry = geometry;
    }

    pub fn geometry(&self) -> &BounceBackGeometry {
        &self.geometry
    }

    pub fn fill_padding(&self) -> FT {
        self.fill_padding
    }

    /// Tag the next virtual particle will receive.
    pub fn next_tag(&self) -> u64 {
        self.next_tag
    }

    /**
     * Adds the virtual particles for `timestep` to `store`.
     *
     * Everything that can fail is checked before the store is touched: on error no slot is reserved and
     * no tag is consumed.
     */
    pub fn fill<S: ParticleStore>(
        &mut self,
        timestep: u64,
        store: &mut S,
        box_dim: &BoxDim,
        policy: ExecutionPolicy,
        block_size: usize,
    ) -> Result<FillReport> {
        self.geometry.validate_box(box_dim, self.fill_padding)?;

        let (region_lo, region_hi) = compute_fill_regions(box_dim, &self.geometry, self.fill_padding);
        let count_low = draw_fill_count(self.density, region_lo.volume, self.seed, timestep, Side::Low);
        let count_high = draw_fill_count(self.density, region_hi.volume, self.seed, timestep, Side::High);
        let n_fill = count_low + count_high;

        let sampler = ParticleSampler {
            geometry: &self.geometry,
            box_dim,
            regions: [region_lo, region_hi],
            keys: [
                StreamKey::new(self.seed, timestep, Side::Low, StreamPurpose::FillParticle),
                StreamKey::new(self.seed, timestep, Side::High, StreamPurpose::FillParticle),
            ],
            count_low,
            thermal: Normal::new(0., FT::sqrt(self.temperature.value(timestep) / self.mass))
                .map_err(|e| Error::InvalidParam(format!("velocity distribution at step {}: {}", timestep, e)))?,
            wall_velocity: self.geometry.wall_velocity(),
        };

        let first_index = store.reserve(n_fill)?;
        let first_tag = self.next_tag;
        self.next_tag += n_fill as u64;

        let type_id = self.type_id;
        let slots = store.slots_mut(first_index, n_fill);
        iter_mut4(
            policy,
            block_size,
            slots.position,
            slots.velocity,
            slots.tag,
            slots.type_id,
            |i, p_position, p_velocity, p_tag, p_type| {
                let (position, velocity) = sampler.draw(i);
                *p_position = position;
                *p_velocity = velocity;
                *p_tag = first_tag + i as u64;
                *p_type = type_id;
            },
        );

        let report = FillReport {
            first_index,
            first_tag,
            count_low,
            count_high,
        };
        debug!(
            "fill step {}: {} low + {} high virtual particles (volumes {:.4}/{:.4}), first tag {}",
            timestep, count_low, count_high, region_lo.volume, region_hi.volume, first_tag
        );
        Ok(report)
    }
}

/// Read-only state shared by all workers of one fill.
struct ParticleSampler<'a> {
    geometry: &'a BounceBackGeometry,
    box_dim: &'a BoxDim,
    regions: [FillRegion; 2],
    keys: [StreamKey; 2],
    count_low: usize,
    thermal: Normal<FT>,
    wall_velocity: FT,
}

impl<'a> ParticleSampler<'a> {
    /// Position and velocity of the `i`-th new particle. Low side particles come first.
    fn draw(&self, i: usize) -> (V3, V3) {
        let (side_idx, local) = if i < self.count_low {
            (0, i)
        } else {
            (1, i - self.count_low)
        };
        let region = &self.regions[side_idx];
        let mut rng = self.keys[side_idx].rng(local as u64);

        let (y_lo, y_hi) = region.y_range();
        let (lo, hi) = (self.box_dim.lo, self.box_dim.hi);

        // rejection keeps the density uniform in the part of the band beyond the wall
        let position = loop {
            let candidate = vec3f(
                rng.gen_range(lo[AXIS_FLOW]..hi[AXIS_FLOW]),
                rng.gen_range(y_lo..y_hi),
                rng.gen_range(lo[AXIS_NEUTRAL]..hi[AXIS_NEUTRAL]),
            );
            if self.geometry.locate(candidate).side() == Some(region.side) {
                break candidate;
            }
        };

        let mut velocity = vec3f(
            self.thermal.sample(&mut rng),
            self.thermal.sample(&mut rng),
            self.thermal.sample(&mut rng),
        );
        velocity[AXIS_FLOW] += self.wall_velocity;

        debug_assert!(self.geometry.locate(position) != Location::Inside);
        (position, velocity)
    }
}
