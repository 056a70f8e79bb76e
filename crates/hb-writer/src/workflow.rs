//! Per-bracket summary handed to the workflow template.

use hb_plan::HbSearch;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStage {
    pub id: usize,
    /// Configurations trained in this stage.
    pub configs: u64,
    /// Effective budget, guaranteed budget included.
    pub budget: u64,
    /// Configurations promoted into the next stage (0 for the last stage).
    pub promote_count: u64,
    /// Budget of the next stage, if there is one.
    pub promote_budget: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowBracket {
    pub id: u32,
    /// Number of stages the bracket runs.
    pub max_stage: usize,
    /// Configurations left standing after the last stage.
    pub num_best: u64,
    pub stages: Vec<WorkflowStage>,
}

pub fn workflow_brackets(search: &HbSearch) -> Vec<WorkflowBracket> {
    search
        .brackets
        .iter()
        .map(|bracket| {
            let stages = bracket
                .stages
                .iter()
                .enumerate()
                .map(|(j, stage)| {
                    let next = bracket.promotion(j);
                    WorkflowStage {
                        id: j,
                        configs: stage.n,
                        budget: stage.budget(),
                        promote_count: next.map_or(0, |s| s.n),
                        promote_budget: next.map(|s| s.budget()),
                    }
                })
                .collect();

            WorkflowBracket {
                id: bracket.id,
                max_stage: bracket.stages.len(),
                num_best: bracket.stages.last().map_or(0, |s| s.n),
                stages,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_plan::SearchParams;

    #[test]
    fn promotion_targets_follow_the_ladder() {
        let search = HbSearch::new(&SearchParams::new(2, 2).with_guaranteed_budget(1)).unwrap();
        let brackets = workflow_brackets(&search);
        assert_eq!(brackets.len(), 3);

        let first = &brackets[0];
        assert_eq!(first.max_stage, 3);
        assert_eq!(first.num_best, 1);
        assert_eq!(
            first.stages[0],
            WorkflowStage {
                id: 0,
                configs: 4,
                budget: 2,
                promote_count: 2,
                promote_budget: Some(3),
            }
        );
        assert_eq!(first.stages[2].promote_count, 0);
        assert_eq!(first.stages[2].promote_budget, None);

        let last = &brackets[2];
        assert_eq!(last.max_stage, 1);
        assert_eq!(last.stages[0].budget, 5);
    }

    #[test]
    fn serializes_for_templates() {
        let search = HbSearch::new(&SearchParams::new(0, 2)).unwrap();
        let json = serde_json::to_value(workflow_brackets(&search)).unwrap();
        assert_eq!(json[0]["stages"][0]["promote_budget"], serde_json::Value::Null);
        assert_eq!(json[0]["stages"][0]["configs"], 1);
    }
}
