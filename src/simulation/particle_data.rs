use nalgebra::zero;

use crate::{
    error::{Error, Result},
    floating_type_mod::FT,
    V3,
};

macro_rules! decl_particle_vec {
    (pub struct $struct_name:ident { $(pub $field_name:ident: Vec<$field_type:ty> | $default_value:expr),*$(,)?  }) => {
        pub struct $struct_name {
            $(
                pub $field_name : Vec<$field_type>,
            )*
        }

        impl $struct_name {
            pub fn truncate(&mut self, len: usize) {
                $(
                    self.$field_name.truncate(len);
                )*
            }

            pub fn extend(&mut self, num_elements: usize) {
                $(
                    self.$field_name.extend((0..num_elements).map::<$field_type, _>(|_| $default_value));
                )*
            }

            pub fn default(len: usize) -> Self {
                Self {
                    $(
                        $field_name: (0..len).map(|_| $default_value).collect::<Vec<$field_type>>(),
                    )*
                }
            }
        }
    }
}

decl_particle_vec! {
    pub struct ParticleVec {
        pub position: Vec<V3> | zero(),
        pub velocity: Vec<V3> | zero(),
        pub tag: Vec<u64> | 0,
        pub type_id: Vec<u32> | 0,
    }
}

impl ParticleVec {
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }
}

/// Disjoint mutable views on a contiguous range of particle slots.
pub struct ParticleSlots<'a> {
    pub position: &'a mut [V3],
    pub velocity: &'a mut [V3],
    pub tag: &'a mut [u64],
    pub type_id: &'a mut [u32],
}

/// The part of a particle store the virtual particle filler writes into.
pub trait ParticleStore {
    /**
     * Appends `n` slots and returns the index of the first one.
     * Fails without modifying the store if the capacity is exceeded.
     */
    fn reserve(&mut self, n: usize) -> Result<usize>;

    /// Mutable access to `n` slots starting at `start`. Panics if the range was not reserved.
    fn slots_mut(&mut self, start: usize, n: usize) -> ParticleSlots<'_>;
}

/// Solvent particles: real particles first, the virtual particles of the current step behind them.
pub struct MpcdParticleData {
    pub particles: ParticleVec,
    num_real: usize,
    capacity: usize,
    mass: FT,
}

impl MpcdParticleData {
    pub fn new(
        positions: Vec<V3>,
        velocities: Vec<V3>,
        type_id: u32,
        mass: FT,
        capacity: usize,
    ) -> Result<MpcdParticleData> {
        crate::error::require_positive("mass", mass)?;
        let num_real = positions.len();
        if velocities.len() != num_real {
            return Err(Error::InvalidParam(format!(
                "got {} positions but {} velocities",
                num_real,
                velocities.len()
            )));
        }
        if capacity < num_real {
            return Err(Error::Capacity {
                requested: num_real,
                available: capacity,
            });
        }

        let mut particles = ParticleVec::default(num_real);
        particles.position = positions;
        particles.velocity = velocities;
        particles.tag = (0..num_real as u64).collect();
        particles.type_id = vec![type_id; num_real];

        Ok(MpcdParticleData {
            particles,
            num_real,
            capacity,
            mass,
        })
    }

    pub fn num_real(&self) -> usize {
        self.num_real
    }

    pub fn num_virtual(&self) -> usize {
        self.particles.len() - self.num_real
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mass(&self) -> FT {
        self.mass
    }

    /// Raises the capacity so that `n` more slots fit behind the current particles. Never shrinks.
    pub fn reserve_capacity(&mut self, n: usize) {
        let required = self.particles.len() + n;
        if required > self.capacity {
            self.capacity = required;
        }
    }

    /// Drops every virtual particle. Called by the host before the next fill.
    pub fn remove_virtual_particles(&mut self) {
        self.particles.truncate(self.num_real);
    }

    /// Positions and velocities of the real particles only.
    pub fn real_mut(&mut self) -> (&mut [V3], &mut [V3]) {
        let n = self.num_real;
        (&mut self.particles.position[..n], &mut self.particles.velocity[..n])
    }

    pub fn real_velocities(&self) -> &[V3] {
        &self.particles.velocity[..self.num_real]
    }

    pub fn virtual_range(&self) -> std::ops::Range<usize> {
        self.num_real..self.particles.len()
    }
}

impl ParticleStore for MpcdParticleData {
    fn reserve(&mut self, n: usize) -> Result<usize> {
        let start = self.particles.len();
        let available = self.capacity - start;
        if n > available {
            return Err(Error::Capacity { requested: n, available });
        }
        self.particles.extend(n);
        Ok(start)
    }

    fn slots_mut(&mut self, start: usize, n: usize) -> ParticleSlots<'_> {
        let range = start..start + n;
        ParticleSlots {
            position: &mut self.particles.position[range.clone()],
            velocity: &mut self.particles.velocity[range.clone()],
            tag: &mut self.particles.tag[range.clone()],
            type_id: &mut self.particles.type_id[range],
        }
    }
}
