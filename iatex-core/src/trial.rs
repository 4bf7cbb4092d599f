use crate::condition::{Condition, Flag};
use crate::stimulus::{Media, StimulusId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response side. Left always means "belongs to the categories named in
/// the block condition".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn correct_for(condition: Condition, flag: Flag) -> Self {
        if condition.includes(flag) {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Verdict of a trial. Leaves `Unscored` exactly once; a corrective
/// response never turns `Incorrect` into `Correct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Correctness {
    #[default]
    Unscored,
    Correct,
    Incorrect,
}

impl Correctness {
    pub fn is_scored(&self) -> bool {
        !matches!(self, Correctness::Unscored)
    }
}

/// Outcome of scoring one input against the active trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    Ignored,
    TooFast,
    Correct,
    IncorrectPendingCorrection,
    IncorrectFinal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub stimulus: StimulusId,
    pub flag: Flag,
    pub media: Media,
    pub is_attribute: bool,
    /// Monotonic timestamp (ns) at which the stimulus became visible.
    #[serde(skip)]
    pub start_time: Option<u64>,
    pub reaction_time: Option<Duration>,
    pub correct: Correctness,
}

impl TrialSpec {
    pub fn new(stimulus: StimulusId, flag: Flag, media: Media) -> Self {
        Self {
            stimulus,
            flag,
            media,
            is_attribute: flag.is_attribute(),
            start_time: None,
            reaction_time: None,
            correct: Correctness::Unscored,
        }
    }

    /// Presented and still waiting for its first verdict.
    pub fn is_outstanding(&self) -> bool {
        self.start_time.is_some() && !self.correct.is_scored()
    }

    pub fn reaction_time_ms(&self) -> Option<u128> {
        self.reaction_time.map(|rt| rt.as_millis())
    }
}
