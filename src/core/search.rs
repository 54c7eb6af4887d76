//! Bounded iterative searches shared by the solvers.
//!
//! Each routine takes the quantity being searched for as a closure argument and
//! knows nothing about finance; callers decide what "enough" means.

use std::ops::RangeInclusive;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Probe {
    /// Close enough to stop immediately.
    Hit,
    /// The goal is met or exceeded; the answer lies at or below the candidate.
    Above,
    /// The goal is not met; the answer lies above the candidate.
    Below,
}

#[derive(Debug, Clone, Copy)]
pub struct BisectConfig {
    pub max_iterations: u32,
    /// Stop once `high - low` falls below this width. Zero disables the check.
    pub width_tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectOutcome {
    pub low: f64,
    pub high: f64,
    pub hit: Option<f64>,
    pub iterations: u32,
    pub converged: bool,
}

impl BisectOutcome {
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) * 0.5
    }
}

/// Halve `[low, high]` until a probe hits, the bracket is narrower than the
/// tolerance, or the iteration budget runs out. The probe must be monotone:
/// once it reports `Above` for some candidate, every larger candidate is `Above`.
pub fn bisect<F>(low: f64, high: f64, config: BisectConfig, mut probe: F) -> BisectOutcome
where
    F: FnMut(f64) -> Probe,
{
    let mut lo = low;
    let mut hi = high;
    let mut it = 0;
    while it < config.max_iterations {
        if config.width_tolerance > 0.0 && (hi - lo).abs() < config.width_tolerance {
            return BisectOutcome {
                low: lo,
                high: hi,
                hit: None,
                iterations: it,
                converged: true,
            };
        }

        it += 1;
        let mid = (lo + hi) * 0.5;
        match probe(mid) {
            Probe::Hit => {
                return BisectOutcome {
                    low: lo,
                    high: hi,
                    hit: Some(mid),
                    iterations: it,
                    converged: true,
                };
            }
            Probe::Above => hi = mid,
            Probe::Below => lo = mid,
        }
    }

    let converged = config.width_tolerance <= 0.0 || (hi - lo).abs() < config.width_tolerance;
    BisectOutcome {
        low: lo,
        high: hi,
        hit: None,
        iterations: it,
        converged,
    }
}

pub fn step_search<F>(range: RangeInclusive<u32>, mut meets_goal: F) -> (Option<u32>, u32)
where
    F: FnMut(u32) -> bool,
{
    let mut evaluated = 0;
    for candidate in range {
        evaluated += 1;
        if meets_goal(candidate) {
            return (Some(candidate), evaluated);
        }
    }
    (None, evaluated)
}

#[derive(Debug, Clone, Copy)]
pub struct FixedPointConfig {
    pub max_iterations: u32,
    /// Stop once the residual is within this distance of zero.
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointOutcome {
    pub value: f64,
    pub residual: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// Refine `initial` by `x += residual(x) / gain` until the residual is within
/// tolerance. `gain` is the sensitivity of the evaluated quantity to `x`.
pub fn fixed_point<F>(
    initial: f64,
    gain: f64,
    config: FixedPointConfig,
    mut residual: F,
) -> FixedPointOutcome
where
    F: FnMut(f64) -> f64,
{
    let mut value = initial;
    let mut current = residual(value);
    let mut it = 0;
    while it < config.max_iterations {
        if current.abs() <= config.tolerance {
            return FixedPointOutcome {
                value,
                residual: current,
                iterations: it,
                converged: true,
            };
        }
        it += 1;
        value += current / gain;
        current = residual(value);
    }

    FixedPointOutcome {
        value,
        residual: current,
        iterations: it,
        converged: current.abs() <= config.tolerance,
    }
}
