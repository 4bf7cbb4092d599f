use crate::config::TaskConfig;
use iatex_core::{Condition, Correctness, ResultStore, TrialSpec};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Persisted form of one finished block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_number: usize,
    pub condition: Condition,
    /// `{index}{Y|N}{rt_ms}` per trial, joined by the response separator.
    pub responses: String,
    /// Stimulus ids in presentation order, comma separated.
    pub trials: String,
}

/// Serializes finished blocks and hands them to the store.
pub struct BlockRecorder<'a> {
    config: &'a TaskConfig,
}

impl<'a> BlockRecorder<'a> {
    pub fn new(config: &'a TaskConfig) -> Self {
        Self { config }
    }

    pub fn serialize(
        &self,
        block_number: usize,
        condition: Condition,
        trials: &[TrialSpec],
    ) -> BlockRecord {
        let responses = trials
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let verdict = if t.correct == Correctness::Correct { "Y" } else { "N" };
                let rt = t
                    .reaction_time_ms()
                    .map(|ms| ms.to_string())
                    .unwrap_or_default();
                format!("{}{}{}", i + 1, verdict, rt)
            })
            .collect::<Vec<_>>()
            .join(self.config.inter_trial_response_separator.as_str());
        let trials = trials
            .iter()
            .map(|t| t.stimulus.as_str())
            .collect::<Vec<_>>()
            .join(",");
        BlockRecord {
            block_number,
            condition,
            responses,
            trials,
        }
    }

    /// Writes `{prefix}{n}Responses` and `{prefix}{n}Trials`.
    pub fn flush<S: ResultStore + ?Sized>(&self, record: &BlockRecord, store: &mut S) {
        let prefix = self.config.block_key_prefix();
        let n = record.block_number;
        store.store(&format!("{prefix}{n}Responses"), &record.responses);
        store.store(&format!("{prefix}{n}Trials"), &record.trials);
        info!(block = n, condition = %record.condition, "block results stored");
    }
}
