/// Where the engine currently is in the session.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Constructed, `start` not called yet.
    #[default]
    Idle,
    /// Category examples are cycling; no input is scored.
    Examples,
    /// Block instruction visible, waiting for the begin input.
    AwaitingBlockStart,
    /// Fixation cross visible for the inter-trial interval.
    Fixation,
    /// Stimulus visible, waiting for a classification (or its correction).
    StimulusShown,
    /// Uncorrected error shown, waiting for the auto-advance delay.
    Feedback,
    /// Every block recorded.
    Complete,
}

impl Phase {
    pub fn allows_input(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::Examples | Phase::Complete)
    }

    pub fn is_awaiting_block_start(&self) -> bool {
        matches!(self, Phase::AwaitingBlockStart)
    }

    /// Inside a block, past the begin input.
    pub fn is_running_block(&self) -> bool {
        matches!(self, Phase::Fixation | Phase::StimulusShown | Phase::Feedback)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Phase::Complete)
    }
}

/// Non-fatal, subject-visible problems. Shown as a transient warning and
/// otherwise leave the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    TooFastResponse,
    PreloadIncomplete,
    InvalidInputKey,
}
