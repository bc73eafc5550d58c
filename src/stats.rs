//! Execution statistics for completed workflow runs.

use serde::{Deserialize, Serialize};

/// Summary of a single workflow run.
///
/// Produced exactly once, when the run reaches its completion hook, and never
/// mutated afterwards. `executed_step_names` records the steps that actually
/// ran, in order, so its length equals `completed_steps`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Number of steps the workflow was built with.
    pub total_steps: usize,
    /// Number of steps that actually executed.
    pub completed_steps: usize,
    /// Names of the executed steps, in execution order.
    pub executed_step_names: Vec<String>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u128,
    /// Whether the run finished without an unrecovered error.
    pub success: bool,
    /// Number of items in the final collection.
    pub items_processed: usize,
}

impl ExecutionStats {
    /// True when every configured step executed.
    pub fn ran_all_steps(&self) -> bool {
        self.completed_steps == self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_json() {
        let stats = ExecutionStats {
            total_steps: 3,
            completed_steps: 2,
            executed_step_names: vec!["read".into(), "enrich".into()],
            duration_ms: 120,
            success: false,
            items_processed: 7,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"completed_steps\":2"));
        assert!(json.contains("\"executed_step_names\":[\"read\",\"enrich\"]"));
        assert!(!stats.ran_all_steps());
    }
}
