use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};

use crate::{
    box_dim::BoxDim,
    concurrency::iter_mut2,
    floating_type_mod::FT,
    geometry::{BounceBackGeometry, BounceBackGeometryTrait, Location},
    particle_data::MpcdParticleData,
    simulation_parameters::ExecutionPolicy,
    V3,
};

/// Upper bound of wall hits handled for one particle within one step.
pub const MAX_REFLECTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamReport {
    /// Number of bounce-backs applied.
    pub collisions: usize,
    /// Particles still outside the channel after `MAX_REFLECTIONS` bounce-backs.
    pub unresolved: usize,
}

/// Ballistic streaming of the real solvent particles between bounce-back walls.
pub struct ConfinedStreaming {
    pub dt: FT,
    pub policy: ExecutionPolicy,
}

impl ConfinedStreaming {
    pub fn new(dt: FT, policy: ExecutionPolicy) -> ConfinedStreaming {
        ConfinedStreaming { dt, policy }
    }

    /**
     * Moves every real particle by `dt * velocity`, bouncing it back from the walls, then wraps the
     * periodic coordinates. Virtual particles are left alone.
     */
    pub fn stream(
        &self,
        store: &mut MpcdParticleData,
        geometry: &BounceBackGeometry,
        box_dim: &BoxDim,
        block_size: usize,
    ) -> StreamReport {
        let dt = self.dt;
        let collisions = AtomicUsize::new(0);
        let unresolved = AtomicUsize::new(0);

        let (position, velocity) = store.real_mut();
        iter_mut2(self.policy, block_size, position, velocity, |_, p_position, p_velocity| {
            let (pos, vel, hits) = stream_particle(geometry, *p_position, *p_velocity, dt);
            if hits > 0 {
                collisions.fetch_add(hits, Ordering::Relaxed);
                if hits == MAX_REFLECTIONS && geometry.locate(pos) != Location::Inside {
                    unresolved.fetch_add(1, Ordering::Relaxed);
                }
            }
            *p_position = box_dim.wrap(pos);
            *p_velocity = vel;
        });

        let report = StreamReport {
            collisions: collisions.into_inner(),
            unresolved: unresolved.into_inner(),
        };
        if report.unresolved > 0 {
            warn!(
                "{} particles still outside the channel after {} reflections, time step {} too large?",
                report.unresolved, MAX_REFLECTIONS, dt
            );
        }
        debug!("streamed {} particles, {} wall collisions", store.num_real(), report.collisions);
        report
    }
}

/// Drift plus repeated bounce-back. Returns the unwrapped position, the velocity and the number of hits.
pub fn stream_particle(geometry: &BounceBackGeometry, position: V3, velocity: V3, dt: FT) -> (V3, V3, usize) {
    let mut pos = position + velocity * dt;
    let mut vel = velocity;
    let mut remaining = dt;

    let mut hits = 0;
    while hits < MAX_REFLECTIONS {
        match geometry.collide(pos, vel, remaining) {
            None => break,
            Some(c) => {
                hits += 1;
                vel = c.velocity;
                remaining = c.dt_remaining;
                pos = c.position + vel * remaining;
            }
        }
    }

    (pos, vel, hits)
}
