//! Input parameters of a hyperband search.

use serde::{Deserialize, Serialize};

/// Everything the allocation engine needs to lay out a search.
///
/// `folds` and `repetitions` do not influence the allocation math; they are
/// carried along so templates can parameterize the rendered configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Controls the number of brackets (`s_max + 1`).
    pub s_max: u32,
    /// Elimination factor between consecutive stages.
    pub eta: u32,
    /// Cost of one unit of budget, used for cost estimates only.
    pub unit_time: f64,
    /// Floor added to the budget of every stage.
    pub guaranteed_budget: u64,
    pub folds: u32,
    pub repetitions: u32,
    /// Visible bracket ids to keep (`None` keeps all of them).
    pub allowed_brackets: Option<Vec<u32>>,
    /// Last stage index each bracket runs (`None` runs the full ladder).
    pub last_stage: Option<u32>,
}

impl SearchParams {
    pub fn new(s_max: u32, eta: u32) -> Self {
        Self {
            s_max,
            eta,
            unit_time: 1.0,
            guaranteed_budget: 0,
            folds: 5,
            repetitions: 1,
            allowed_brackets: None,
            last_stage: None,
        }
    }

    pub fn with_unit_time(mut self, unit_time: f64) -> Self {
        self.unit_time = unit_time;
        self
    }

    pub fn with_guaranteed_budget(mut self, budget: u64) -> Self {
        self.guaranteed_budget = budget;
        self
    }

    pub fn with_cross_validation(mut self, folds: u32, repetitions: u32) -> Self {
        self.folds = folds;
        self.repetitions = repetitions;
        self
    }

    pub fn with_brackets(mut self, brackets: Vec<u32>) -> Self {
        self.allowed_brackets = Some(brackets);
        self
    }

    pub fn with_last_stage(mut self, stage: u32) -> Self {
        self.last_stage = Some(stage);
        self
    }
}

/// Cost of one unit of budget under repeated k-fold cross-validation.
///
/// Each fold trains on `1 - 1/folds` of the dataset, and every repetition
/// trains all folds. Without an epoch cost every unit costs `1.0`.
pub fn unit_time_for(cost_one_epoch: Option<f64>, folds: u32, repetitions: u32) -> f64 {
    match cost_one_epoch {
        None => 1.0,
        Some(cost) => {
            let epoch_cost = if folds > 1 {
                cost * (1.0 - 1.0 / folds as f64)
            } else {
                cost
            };
            repetitions as f64 * folds as f64 * epoch_cost
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_time_defaults_to_one() {
        assert_eq!(unit_time_for(None, 5, 3), 1.0);
    }

    #[test]
    fn unit_time_accounts_for_training_fraction() {
        // 2 repetitions of 5 folds, each fold trains on 80% of the data
        let t = unit_time_for(Some(10.0), 5, 2);
        assert!((t - 80.0).abs() < 1e-9);
    }

    #[test]
    fn unit_time_single_fold_uses_full_cost() {
        let t = unit_time_for(Some(2.5), 1, 4);
        assert!((t - 10.0).abs() < 1e-9);
    }

    #[test]
    fn builder_chain() {
        let params = SearchParams::new(4, 3)
            .with_unit_time(2.0)
            .with_guaranteed_budget(5)
            .with_cross_validation(10, 2)
            .with_brackets(vec![0, 2])
            .with_last_stage(1);

        assert_eq!(params.unit_time, 2.0);
        assert_eq!(params.guaranteed_budget, 5);
        assert_eq!((params.folds, params.repetitions), (10, 2));
        assert_eq!(params.allowed_brackets, Some(vec![0, 2]));
        assert_eq!(params.last_stage, Some(1));
    }
}
