use crate::config::{ConfigError, TaskConfig};
use crate::generator::{TrialGenerator, collect_image_sources, combined_start};
use crate::input::{InputEvent, InputModality, RawInput};
use crate::instruction::block_instruction;
use crate::preload::PreloadTracker;
use crate::recorder::{BlockRecord, BlockRecorder};
use crate::schedule::{ConditionScheduler, SeedOrigin};
use crate::scorer::ResponseScorer;
use iatex_core::{
    CategoryLabel, Condition, Flag, FlagTable, Host, Media, Phase, ScoreOutcome, Side, StimulusId,
    StimulusView, TrialSpec, Warning,
};
use iatex_timing::Timer;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const WARNING_DURATION: Duration = Duration::from_millis(1500);
pub const ENDING_DELAY: Duration = Duration::from_millis(1500);

pub const PRELOAD_WARNING: &str = "Some stimuli are still being downloaded. Please try again later. \
     If the problem persists, please notify the research team.";
pub const INVALID_KEY_WARNING: &str = "The key isn't allowed for the task.";

/// Notable things that happened while processing an input or a timer.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    BlockLaunched { block: usize, condition: Condition },
    BlockStarted(usize),
    StimulusShown { block: usize, trial: usize },
    Scored(ScoreOutcome),
    WarningShown(Warning),
    BlockRecorded(BlockRecord),
    Terminated,
}

/// Identifies the trial a timer was scheduled for. Blocks are 1-based,
/// trials 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialKey {
    pub block: usize,
    pub trial: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    ShowStimulus(TrialKey),
    AutomaticResponse(TrialKey),
    AdvanceTrial(TrialKey),
    DismissWarning(u64),
    NextExample,
    Terminate,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: u64,
    seq: u64,
    action: TimerAction,
}

/// The block currently on screen.
#[derive(Debug, Clone)]
pub struct BlockPlan {
    pub number: usize,
    pub condition: Condition,
    pub trials: Vec<TrialSpec>,
    pub preload: PreloadTracker,
}

#[derive(Debug, Clone, Default)]
pub struct ExperimentState {
    pub phase: Phase,
    pub sequence: Vec<Condition>,
    pub seed: Option<(Condition, SeedOrigin)>,
    pub block: Option<BlockPlan>,
    /// Index of the trial in fixation or on screen.
    pub trial_index: usize,
    /// Set while the stimulus of `trial_index` awaits a response.
    pub active: Option<usize>,
    pub records: Vec<BlockRecord>,
}

pub struct ExperimentStateMachine<T, R, H>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
    H: Host,
{
    config: TaskConfig,
    modality: InputModality,
    timer: T,
    rng: R,
    host: H,
    scorer: ResponseScorer,
    flags: FlagTable,
    state: ExperimentState,
    examples: Vec<(StimulusId, Flag)>,
    pending: Vec<Scheduled>,
    next_seq: u64,
    warning_generation: u64,
    terminated: bool,
    events: Vec<ExperimentEvent>,
}

impl<T, R, H> ExperimentStateMachine<T, R, H>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
    H: Host,
{
    pub fn new(
        config: TaskConfig,
        modality: InputModality,
        timer: T,
        rng: R,
        host: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let flags = FlagTable::from_sources(&config.stimulus_sources);
        Ok(Self {
            scorer: ResponseScorer::from_config(&config),
            config,
            modality,
            timer,
            rng,
            host,
            flags,
            state: ExperimentState::default(),
            examples: Vec::new(),
            pending: Vec::new(),
            next_seq: 0,
            warning_generation: 0,
            terminated: false,
            events: Vec::new(),
        })
    }

    /// Resolves the block sequence and shows either the examples or the
    /// first block instruction. Calling it twice does nothing.
    pub fn start(&mut self) -> Vec<ExperimentEvent> {
        if self.state.phase != Phase::Idle {
            return Vec::new();
        }
        let schedule =
            ConditionScheduler::new(&self.config).resolve(&mut self.host, self.timer.epoch_millis());
        self.state.sequence = schedule.blocks.to_vec();
        self.state.seed = schedule.seed;
        info!(
            blocks = self.state.sequence.len(),
            examples = self.config.show_examples,
            "experiment started"
        );

        if self.config.show_examples {
            self.queue_examples();
            self.state.phase = Phase::Examples;
            self.next_example();
        } else {
            self.launch_block();
        }
        self.drain()
    }

    /// Maps a raw key or tap through the input modality.
    pub fn handle_raw(&mut self, raw: &RawInput) -> Vec<ExperimentEvent> {
        match self.modality.normalize(raw, self.state.phase) {
            Some(event) => self.handle_input(event),
            None => {
                debug!(?raw, phase = ?self.state.phase, "input dropped");
                Vec::new()
            }
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<ExperimentEvent> {
        match event {
            InputEvent::Begin if self.state.phase.is_awaiting_block_start() => self.begin_block(),
            InputEvent::InvalidKey if self.state.phase.allows_input() => {
                self.show_warning(Warning::InvalidInputKey)
            }
            InputEvent::Classify(side) if self.state.phase.is_running_block() => {
                self.classify(side)
            }
            _ => debug!(?event, phase = ?self.state.phase, "input ignored in this phase"),
        }
        self.drain()
    }

    /// Fires every timer that is due, earliest first.
    pub fn update(&mut self) -> Vec<ExperimentEvent> {
        let now = self.timer.now();
        while let Some(i) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due <= now)
            .min_by_key(|(_, s)| (s.due, s.seq))
            .map(|(i, _)| i)
        {
            let scheduled = self.pending.swap_remove(i);
            self.fire(scheduled.action);
        }
        self.drain()
    }

    /// Completion of an image requested through `ImageLoader::load`.
    pub fn image_loaded(&mut self, id: &StimulusId) {
        if let Some(plan) = self.state.block.as_mut() {
            if plan.preload.mark_loaded(id) {
                debug!(
                    %id,
                    loaded = plan.preload.loaded().len(),
                    required = plan.preload.required().len(),
                    "image loaded"
                );
            }
        }
    }

    /// Monotonic timestamp of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.iter().map(|s| s.due).min()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &ExperimentState {
        &self.state
    }

    pub fn flags(&self) -> &FlagTable {
        &self.flags
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn is_complete(&self) -> bool {
        self.state.phase.is_complete()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    fn drain(&mut self) -> Vec<ExperimentEvent> {
        std::mem::take(&mut self.events)
    }

    fn schedule(&mut self, delay: Duration, action: TimerAction) {
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        let due = self.timer.now().saturating_add(nanos);
        self.pending.push(Scheduled {
            due,
            seq: self.next_seq,
            action,
        });
        self.next_seq += 1;
    }

    fn current_key(&self) -> Option<TrialKey> {
        self.state.block.as_ref().map(|plan| TrialKey {
            block: plan.number,
            trial: self.state.trial_index,
        })
    }

    fn is_current(&self, key: TrialKey) -> bool {
        self.current_key() == Some(key)
    }

    fn fire(&mut self, action: TimerAction) {
        match action {
            TimerAction::ShowStimulus(key) => {
                if self.state.phase == Phase::Fixation && self.is_current(key) {
                    self.present(key);
                } else {
                    debug!(?key, "stale stimulus timer discarded");
                }
            }
            TimerAction::AutomaticResponse(key) => {
                if self.is_current(key) && self.state.active == Some(key.trial) {
                    if let Some(side) = self.correct_side(key.trial) {
                        debug!(?key, ?side, "automatic response");
                        self.classify(side);
                    }
                }
            }
            TimerAction::AdvanceTrial(key) => {
                if self.state.phase == Phase::Feedback && self.is_current(key) {
                    self.advance_trial();
                }
            }
            TimerAction::DismissWarning(generation) => {
                if generation == self.warning_generation {
                    self.host.clear_warning();
                }
            }
            TimerAction::NextExample => {
                if self.state.phase == Phase::Examples {
                    self.next_example();
                }
            }
            TimerAction::Terminate => self.terminate(),
        }
    }

    fn queue_examples(&mut self) {
        self.examples.clear();
        for flag in Flag::ALL {
            let mut list = self.config.stimulus_sources.get(flag).to_vec();
            list.shuffle(&mut self.rng);
            for id in list {
                self.flags.insert(id.clone(), flag);
                self.examples.push((id, flag));
            }
        }
        debug!(count = self.examples.len(), "examples queued");
    }

    fn next_example(&mut self) {
        let Some((id, flag)) = self.examples.pop() else {
            info!("examples finished");
            self.launch_block();
            return;
        };
        let media = self.config.media_for(flag);
        let view = stimulus_view(&self.config, &id, flag.is_attribute(), media);
        let label = CategoryLabel::new(
            self.config.labels.get(flag),
            self.config.word_color(flag.is_attribute()),
        );
        self.host.show_example(&label, view);
        self.schedule(
            Duration::from_millis(self.config.example_duration_ms),
            TimerAction::NextExample,
        );
    }

    /// Records the finished block, if any, then shows the next instruction
    /// or ends the task.
    fn launch_block(&mut self) {
        let completed = match self.state.block.take() {
            Some(plan) => {
                self.record_block(plan);
                self.state.records.len()
            }
            None => 0,
        };
        self.state.active = None;
        self.state.trial_index = 0;

        let Some(&condition) = self.state.sequence.get(completed) else {
            self.finish();
            return;
        };
        let number = completed + 1;
        let count = self.config.block_trial_numbers[completed];
        let start = combined_start(self.timer.epoch_millis());
        let trials = TrialGenerator::new(&self.config, &self.flags).generate(
            condition,
            count,
            start,
            &mut self.rng,
        );
        let preload = PreloadTracker::new(
            collect_image_sources(&trials),
            self.config.minimum_preload_image_percent,
        );
        preload.begin(&mut self.host);

        let instruction = block_instruction(&self.config, condition, &self.modality);
        self.host.show_category_labels(&instruction.left, &instruction.right);
        self.host.render_block_instruction(&instruction.text);

        info!(
            block = number,
            condition = %condition,
            trials = trials.len(),
            images = preload.required().len(),
            "block launched"
        );
        self.state.block = Some(BlockPlan {
            number,
            condition,
            trials,
            preload,
        });
        self.state.phase = Phase::AwaitingBlockStart;
        self.events
            .push(ExperimentEvent::BlockLaunched { block: number, condition });
    }

    fn record_block(&mut self, plan: BlockPlan) {
        let recorder = BlockRecorder::new(&self.config);
        let record = recorder.serialize(plan.number, plan.condition, &plan.trials);
        recorder.flush(&record, &mut self.host);
        self.state.records.push(record.clone());
        self.events.push(ExperimentEvent::BlockRecorded(record));
    }

    fn begin_block(&mut self) {
        let Some(plan) = self.state.block.as_ref() else {
            return;
        };
        if !plan.preload.is_ready() {
            warn!(
                block = plan.number,
                loaded = plan.preload.loaded().len(),
                required = plan.preload.required().len(),
                "block start refused, preload incomplete"
            );
            self.show_warning(Warning::PreloadIncomplete);
            return;
        }
        info!(block = plan.number, "block started");
        self.events.push(ExperimentEvent::BlockStarted(plan.number));
        self.load_next_trial();
    }

    fn load_next_trial(&mut self) {
        self.host.clear_warning();
        self.host.clear_error_indicator();
        self.host.show_fixation();
        self.state.active = None;
        self.state.phase = Phase::Fixation;
        if let Some(key) = self.current_key() {
            self.schedule(
                Duration::from_millis(self.config.inter_trial_interval_ms),
                TimerAction::ShowStimulus(key),
            );
        }
    }

    fn present(&mut self, key: TrialKey) {
        let Some(plan) = self.state.block.as_mut() else {
            return;
        };
        let Some(trial) = plan.trials.get_mut(key.trial) else {
            return;
        };
        let view = stimulus_view(&self.config, &trial.stimulus, trial.is_attribute, trial.media);
        self.host.show_stimulus(view);
        trial.start_time = Some(self.timer.now());
        debug!(
            block = key.block,
            trial = key.trial + 1,
            stimulus = %trial.stimulus,
            "stimulus shown"
        );

        self.state.active = Some(key.trial);
        self.state.phase = Phase::StimulusShown;
        self.events.push(ExperimentEvent::StimulusShown {
            block: key.block,
            trial: key.trial,
        });

        let delay = self.config.automatic_responses_delay_ms;
        if delay > self.config.minimum_allowed_reaction_time_ms {
            self.schedule(Duration::from_millis(delay), TimerAction::AutomaticResponse(key));
        }
    }

    fn correct_side(&self, index: usize) -> Option<Side> {
        let plan = self.state.block.as_ref()?;
        let trial = plan.trials.get(index)?;
        Some(Side::correct_for(plan.condition, trial.flag))
    }

    fn classify(&mut self, side: Side) {
        let now = self.timer.now();
        let Some(plan) = self.state.block.as_mut() else {
            return;
        };
        let trial = self.state.active.and_then(|i| plan.trials.get_mut(i));
        let outcome = self.scorer.score(trial, plan.condition, side, now);
        debug!(?side, ?outcome, trial = self.state.trial_index + 1, "response scored");
        if outcome != ScoreOutcome::Ignored {
            self.events.push(ExperimentEvent::Scored(outcome));
        }

        match outcome {
            ScoreOutcome::Ignored => debug!("stray input ignored"),
            ScoreOutcome::TooFast => self.show_warning(Warning::TooFastResponse),
            ScoreOutcome::Correct => {
                self.state.active = None;
                self.advance_trial();
            }
            ScoreOutcome::IncorrectPendingCorrection => self.host.show_error_indicator(),
            ScoreOutcome::IncorrectFinal => {
                self.host.show_error_indicator();
                self.state.active = None;
                self.state.phase = Phase::Feedback;
                if let Some(key) = self.current_key() {
                    self.schedule(
                        Duration::from_millis(self.config.auto_advance_delay_ms),
                        TimerAction::AdvanceTrial(key),
                    );
                }
            }
        }
    }

    fn advance_trial(&mut self) {
        let total = self.state.block.as_ref().map_or(0, |plan| plan.trials.len());
        self.state.trial_index += 1;
        if self.state.trial_index < total {
            self.load_next_trial();
        } else {
            self.launch_block();
        }
    }

    fn show_warning(&mut self, warning: Warning) {
        let text = match warning {
            Warning::TooFastResponse => self.config.too_fast_response_error_message.as_str(),
            Warning::PreloadIncomplete => PRELOAD_WARNING,
            Warning::InvalidInputKey => INVALID_KEY_WARNING,
        };
        self.host.show_warning(text);
        self.warning_generation += 1;
        self.schedule(
            WARNING_DURATION,
            TimerAction::DismissWarning(self.warning_generation),
        );
        self.events.push(ExperimentEvent::WarningShown(warning));
    }

    fn finish(&mut self) {
        self.state.phase = Phase::Complete;
        info!(blocks = self.state.records.len(), "all blocks recorded");
        if let Some(message) = &self.config.ending_message {
            self.host.show_ending(message);
            self.schedule(ENDING_DELAY, TimerAction::Terminate);
        } else {
            self.terminate();
        }
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.pending.clear();
        info!("task terminated");
        self.host.terminate();
        self.events.push(ExperimentEvent::Terminated);
    }
}

fn stimulus_view<'a>(
    config: &'a TaskConfig,
    id: &'a StimulusId,
    is_attribute: bool,
    media: Media,
) -> StimulusView<'a> {
    StimulusView {
        media,
        content: id.as_str(),
        color: (media == Media::Text).then(|| config.word_color(is_attribute)),
    }
}
