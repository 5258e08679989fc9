use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TunerState {
    Scanning,
    Idle,
}

/**
 * Picks the block size of a parallel loop by timing it.
 *
 * Every candidate in `min..=max` (stride `step`) is timed `nsamples` times between `begin()` and `end()`.
 * The candidate with the lowest median wins and is used until `period` further calls have passed, then the
 * scan starts over. The block size only affects throughput, never results.
 */
pub struct Autotuner {
    name: String,
    params: Vec<usize>,
    nsamples: usize,
    period: u64,

    samples: Vec<Vec<Duration>>,
    current: usize,
    optimal: usize,
    state: TunerState,
    calls_since_scan: u64,
    last_start: Instant,
}

impl Autotuner {
    pub fn new(min: usize, max: usize, step: usize, nsamples: usize, period: u64, name: &str) -> Result<Autotuner> {
        if min == 0 || step == 0 || max < min || nsamples == 0 {
            return Err(Error::InvalidParam(format!(
                "autotuner {}: invalid range min={} max={} step={} nsamples={}",
                name, min, max, step, nsamples
            )));
        }
        let params: Vec<usize> = (min..=max).step_by(step).collect();
        let optimal = params[params.len() / 2];

        Ok(Autotuner {
            name: name.to_string(),
            samples: vec![Vec::with_capacity(nsamples); params.len()],
            params,
            nsamples,
            period,
            current: 0,
            optimal,
            state: TunerState::Scanning,
            calls_since_scan: 0,
            last_start: Instant::now(),
        })
    }

    /// Block size to use for the next call.
    pub fn param(&self) -> usize {
        match self.state {
            TunerState::Scanning => self.params[self.current],
            TunerState::Idle => self.optimal,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state == TunerState::Scanning
    }

    pub fn begin(&mut self) {
        self.last_start = Instant::now();
    }

    pub fn end(&mut self) {
        let elapsed = Instant::now() - self.last_start;
        self.record(elapsed);
    }

    fn record(&mut self, elapsed: Duration) {
        match self.state {
            TunerState::Scanning => {
                self.samples[self.current].push(elapsed);
                if self.samples[self.current].len() >= self.nsamples {
                    self.current += 1;
                    if self.current == self.params.len() {
                        self.finish_scan();
                    }
                }
            }
            TunerState::Idle => {
                self.calls_since_scan += 1;
                if self.calls_since_scan >= self.period {
                    debug!("autotuner {}: restarting scan", self.name);
                    self.state = TunerState::Scanning;
                    self.current = 0;
                    self.samples.iter_mut().for_each(Vec::clear);
                }
            }
        }
    }

    fn finish_scan(&mut self) {
        let best = self
            .samples
            .iter_mut()
            .map(|s| {
                s.sort();
                s[s.len() / 2]
            })
            .enumerate()
            .min_by_key(|&(_, median)| median)
            .map(|(i, _)| i);
        if let Some(best) = best {
            self.optimal = self.params[best];
        }
        self.state = TunerState::Idle;
        self.calls_since_scan = 0;
        info!("autotuner {}: optimal block size {}", self.name, self.optimal);
    }
}
