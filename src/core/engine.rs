use std::f64::consts::PI;

use rayon::prelude::*;
use thiserror::Error;

use super::types::{Execution, RunOptions};

pub(crate) const MONTHS_PER_YEAR: u32 = 12;

/// Number of monthly steps in `years`. Saturates for inputs that skipped
/// validation.
pub(crate) fn months_in(years: u32) -> u32 {
    years.saturating_mul(MONTHS_PER_YEAR)
}

pub(crate) const DOWN_PAYMENT_PHASE: u32 = 1;
pub(crate) const MORTGAGE_PHASE: u32 = 2;

#[derive(Debug, Clone, Copy, Error, Eq, PartialEq)]
pub enum SimulationError {
    #[error("simulation cancelled before all trials completed")]
    Cancelled,
}

/// Monthly return distribution derived from an annual mean and standard
/// deviation. The mean compounds geometrically; the deviation scales by
/// `sqrt(12)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MonthlyReturns {
    pub mean: f64,
    pub std: f64,
}

impl MonthlyReturns {
    pub fn from_annual(annual_mean: f64, annual_std: f64) -> Self {
        Self {
            mean: (1.0 + annual_mean).powf(1.0 / MONTHS_PER_YEAR as f64) - 1.0,
            std: annual_std / (MONTHS_PER_YEAR as f64).sqrt(),
        }
    }

    pub fn sample(self, rng: &mut Rng) -> f64 {
        self.mean + self.std * rng.standard_normal()
    }
}

/// Runs `trials` independent trials, each with its own generator seeded from
/// the run seed, the phase and the trial id. Results come back in trial order
/// regardless of execution mode.
pub(crate) fn run_trials<T, F>(
    trials: u32,
    phase: u32,
    options: &RunOptions,
    trial: F,
) -> Result<Vec<T>, SimulationError>
where
    T: Send,
    F: Fn(&mut Rng) -> T + Sync,
{
    let run_one = |trial_id: u32| {
        if options.is_cancelled() {
            return None;
        }
        let mut rng = Rng::new(derive_seed(options.seed, phase, trial_id));
        Some(trial(&mut rng))
    };

    let outcomes: Vec<Option<T>> = match options.execution {
        Execution::Sequential => {
            let mut outcomes = Vec::with_capacity(trials as usize);
            for trial_id in 0..trials {
                let outcome = run_one(trial_id);
                let stop = outcome.is_none();
                outcomes.push(outcome);
                if stop {
                    break;
                }
            }
            outcomes
        }
        Execution::Parallel => (0..trials).into_par_iter().map(run_one).collect(),
    };

    match outcomes.into_iter().collect::<Option<Vec<T>>>() {
        Some(results) => Ok(results),
        None => {
            log::info!("phase {phase} cancelled after partial run of {trials} trials");
            Err(SimulationError::Cancelled)
        }
    }
}

fn derive_seed(base_seed: u64, phase: u32, trial_id: u32) -> u64 {
    let mixed = base_seed ^ ((phase as u64) << 32) ^ trial_id as u64;
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

pub(crate) struct Rng {
    state: u64,
    cached_normal: Option<f64>,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Self {
            state,
            cached_normal: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    pub fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        let z0 = r * theta.cos();
        let z1 = r * theta.sin();
        self.cached_normal = Some(z1);
        z0
    }
}

/// Median of `values`; the mean of the two middle values for an even count.
/// Empty input yields 0.
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[mid],
        _ => (sorted[mid - 1] + sorted[mid]) / 2.0,
    }
}
