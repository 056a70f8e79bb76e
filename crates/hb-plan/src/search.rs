//! Bracket and stage budget allocation.

use std::fmt;

use hb_types::{validation_error, HbResult};
use serde::Serialize;
use tracing::debug;

use crate::params::SearchParams;

/// One round of a bracket: `n` configurations trained with budget `r`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub n: u64,
    pub r: u64,
    #[serde(skip)]
    unit_time: f64,
    #[serde(skip)]
    guaranteed_budget: u64,
}

impl Stage {
    fn new(n: u64, r: u64, unit_time: f64, guaranteed_budget: u64) -> Self {
        Self {
            n,
            r,
            unit_time,
            guaranteed_budget,
        }
    }

    /// Budget each configuration actually trains for.
    pub fn budget(&self) -> u64 {
        self.guaranteed_budget + self.r
    }

    pub fn cost(&self) -> f64 {
        self.unit_time * self.n as f64 * self.budget() as f64
    }
}

/// One successive-halving run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bracket {
    /// Visible id, `s_max - s`.
    pub id: u32,
    pub s: u32,
    /// Initial number of configurations.
    pub n: u64,
    /// Initial budget per configuration.
    pub r: u64,
    pub stages: Vec<Stage>,
}

impl Bracket {
    pub fn cost(&self) -> f64 {
        self.stages.iter().map(Stage::cost).sum()
    }

    /// Stage the configurations of `stage` are promoted into, if any.
    pub fn promotion(&self, stage: usize) -> Option<&Stage> {
        self.stages.get(stage + 1)
    }

    /// Number of configurations generated from scratch for this bracket.
    pub fn initial_configs(&self) -> u64 {
        self.stages.first().map_or(0, |stage| stage.n)
    }
}

/// An immutable hyperband allocation plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HbSearch {
    pub s_max: u32,
    pub eta: u32,
    /// Maximum budget per configuration, `R = eta^s_max`.
    pub max_budget: u64,
    /// Total budget per bracket, `B = R * (s_max + 1)`.
    pub bracket_budget: u64,
    pub unit_time: f64,
    pub guaranteed_budget: u64,
    pub folds: u32,
    pub repetitions: u32,
    pub brackets: Vec<Bracket>,
}

impl HbSearch {
    pub fn new(params: &SearchParams) -> HbResult<Self> {
        if params.eta < 2 {
            return Err(validation_error!("eta must be at least 2, got {}", params.eta));
        }
        if !params.unit_time.is_finite() || params.unit_time <= 0.0 {
            return Err(validation_error!(
                "unit time must be a positive number, got {}",
                params.unit_time
            ));
        }
        if let Some(allowed) = &params.allowed_brackets {
            if let Some(bad) = allowed.iter().find(|&&id| id > params.s_max) {
                return Err(validation_error!(
                    "bracket {} does not exist (s_max is {})",
                    bad,
                    params.s_max
                ));
            }
        }

        let eta = u64::from(params.eta);
        let max_budget = eta.checked_pow(params.s_max).ok_or_else(|| {
            validation_error!("eta^s_max overflows ({}^{})", params.eta, params.s_max)
        })?;
        let bracket_budget = max_budget
            .checked_mul(u64::from(params.s_max) + 1)
            .ok_or_else(|| validation_error!("bracket budget overflows"))?;
        if params.guaranteed_budget.checked_add(max_budget).is_none() {
            return Err(validation_error!(
                "guaranteed budget {} plus the maximum budget {} overflows",
                params.guaranteed_budget,
                max_budget
            ));
        }

        let brackets = (0..=params.s_max)
            .rev()
            .filter(|s| match &params.allowed_brackets {
                Some(allowed) => allowed.contains(&(params.s_max - s)),
                None => true,
            })
            .map(|s| Self::plan_bracket(params, max_budget, s))
            .collect::<Vec<_>>();

        debug!(
            "Planned {} bracket(s) with R={} and B={}",
            brackets.len(),
            max_budget,
            bracket_budget
        );

        Ok(Self {
            s_max: params.s_max,
            eta: params.eta,
            max_budget,
            bracket_budget,
            unit_time: params.unit_time,
            guaranteed_budget: params.guaranteed_budget,
            folds: params.folds,
            repetitions: params.repetitions,
            brackets,
        })
    }

    fn plan_bracket(params: &SearchParams, max_budget: u64, s: u32) -> Bracket {
        let eta = u64::from(params.eta);
        let eta_s = eta.pow(s);

        // ceil(B * eta^s / (R * (s + 1))), with R cancelled out of B
        let numerator = (u128::from(params.s_max) + 1) * u128::from(eta_s);
        let n = numerator.div_ceil(u128::from(s) + 1) as u64;
        let r = max_budget / eta_s;

        let last = params.last_stage.map_or(s, |stage| stage.min(s));
        let stages = (0..=last)
            .map(|i| {
                let eta_i = eta.pow(i);
                Stage::new(n / eta_i, r * eta_i, params.unit_time, params.guaranteed_budget)
            })
            .collect();

        Bracket {
            id: params.s_max - s,
            s,
            n,
            r,
            stages,
        }
    }

    pub fn cost(&self) -> f64 {
        self.brackets.iter().map(Bracket::cost).sum()
    }

    pub fn bracket(&self, id: u32) -> Option<&Bracket> {
        self.brackets.iter().find(|bracket| bracket.id == id)
    }

    /// Total number of configurations generated from scratch.
    pub fn initial_configs(&self) -> u64 {
        self.brackets.iter().map(Bracket::initial_configs).sum()
    }
}

impl fmt::Display for HbSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hyperband Search (cost: {:.2})", self.cost())?;
        for bracket in &self.brackets {
            writeln!(f, "  Bracket {} (cost: {:.2})", bracket.id, bracket.cost())?;
            for (j, stage) in bracket.stages.iter().enumerate() {
                writeln!(
                    f,
                    "    Stage {} - {} configurations each with budget {} (cost: {:.2})",
                    j,
                    stage.n,
                    stage.budget(),
                    stage.cost()
                )?;
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_brackets_follow_closed_form(eta in 2u32..6, s_max in 0u32..7) {
            let search = HbSearch::new(&SearchParams::new(s_max, eta)).unwrap();
            let eta64 = u64::from(eta);
            let big_r = eta64.pow(s_max);

            prop_assert_eq!(search.max_budget, big_r);
            prop_assert_eq!(search.bracket_budget, big_r * (u64::from(s_max) + 1));
            prop_assert_eq!(search.brackets.len(), (s_max + 1) as usize);

            for bracket in &search.brackets {
                prop_assert_eq!(bracket.r, eta64.pow(s_max - bracket.s));
                prop_assert_eq!(bracket.stages.len(), (bracket.s + 1) as usize);

                let first = &bracket.stages[0];
                for (i, stage) in bracket.stages.iter().enumerate() {
                    let eta_i = eta64.pow(i as u32);
                    prop_assert_eq!(stage.n, first.n / eta_i);
                    prop_assert_eq!(stage.r, first.r * eta_i);
                    prop_assert!(stage.n >= 1);
                }
                for pair in bracket.stages.windows(2) {
                    prop_assert!(pair[1].n <= pair[0].n);
                    prop_assert!(pair[1].r >= pair[0].r);
                }
            }
        }

        #[test]
        fn prop_cost_is_sum_of_stage_costs(
            eta in 2u32..5,
            s_max in 0u32..5,
            unit_time in 0.1f64..10.0,
            guaranteed in 0u64..20,
        ) {
            let params = SearchParams::new(s_max, eta)
                .with_unit_time(unit_time)
                .with_guaranteed_budget(guaranteed);
            let search = HbSearch::new(&params).unwrap();

            let expected: f64 = search
                .brackets
                .iter()
                .flat_map(|b| b.stages.iter())
                .map(|s| unit_time * s.n as f64 * (s.r + guaranteed) as f64)
                .sum();
            prop_assert!((search.cost() - expected).abs() <= 1e-9 * expected.max(1.0));
        }

        #[test]
        fn prop_filter_and_cap(
            eta in 2u32..5,
            s_max in 1u32..6,
            keep in proptest::collection::vec(any::<bool>(), 6),
            last_stage in 0u32..4,
        ) {
            let wanted: Vec<u32> = (0..=s_max).filter(|id| keep[*id as usize]).collect();
            let full = HbSearch::new(&SearchParams::new(s_max, eta)).unwrap();
            let params = SearchParams::new(s_max, eta)
                .with_brackets(wanted.clone())
                .with_last_stage(last_stage);
            let search = HbSearch::new(&params).unwrap();

            let ids: Vec<u32> = search.brackets.iter().map(|b| b.id).collect();
            prop_assert_eq!(ids, wanted);

            for bracket in &search.brackets {
                let reference = full.bracket(bracket.id).unwrap();
                let len = (last_stage.min(bracket.s) + 1) as usize;
                prop_assert_eq!(bracket.stages.len(), len);
                prop_assert_eq!(&reference.stages[..len], &bracket.stages[..]);
            }
        }
    }
}
