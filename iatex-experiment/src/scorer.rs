use crate::config::{ErrorLatency, TaskConfig};
use iatex_core::{Condition, Correctness, ScoreOutcome, Side, TrialSpec};
use std::time::Duration;
use tracing::debug;

/// Validates and scores one classification against the active trial.
#[derive(Debug, Clone, Copy)]
pub struct ResponseScorer {
    pub minimum_reaction_time: Duration,
    pub requires_correction: bool,
    pub error_latency: ErrorLatency,
}

impl ResponseScorer {
    pub fn from_config(config: &TaskConfig) -> Self {
        Self {
            minimum_reaction_time: Duration::from_millis(config.minimum_allowed_reaction_time_ms),
            requires_correction: config.requires_correction,
            error_latency: config.error_latency,
        }
    }

    /// `trial` is the active trial, if any; `now` is the monotonic timestamp
    /// of the input in nanoseconds.
    pub fn score(
        &self,
        trial: Option<&mut TrialSpec>,
        condition: Condition,
        side: Side,
        now: u64,
    ) -> ScoreOutcome {
        let Some(trial) = trial else {
            return ScoreOutcome::Ignored;
        };
        let Some(start) = trial.start_time else {
            return ScoreOutcome::Ignored;
        };
        if trial.correct.is_scored() && !self.requires_correction {
            return ScoreOutcome::Ignored;
        }

        let elapsed = Duration::from_nanos(now.saturating_sub(start));
        if elapsed < self.minimum_reaction_time {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "response below reaction-time floor");
            return ScoreOutcome::TooFast;
        }

        let correcting = trial.correct == Correctness::Incorrect;
        if trial.reaction_time.is_none()
            || (correcting && self.error_latency == ErrorLatency::Correct)
        {
            trial.reaction_time = Some(elapsed);
        }

        if side == Side::correct_for(condition, trial.flag) {
            if trial.correct == Correctness::Unscored {
                trial.correct = Correctness::Correct;
            }
            ScoreOutcome::Correct
        } else {
            trial.correct = Correctness::Incorrect;
            if self.requires_correction {
                ScoreOutcome::IncorrectPendingCorrection
            } else {
                ScoreOutcome::IncorrectFinal
            }
        }
    }
}
