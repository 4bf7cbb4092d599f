use iatex_core::{
    Correctness, Flag, Media, Phase, ScoreOutcome, Side, StimulusId, StimulusSources, Warning,
};
use iatex_experiment::state::{INVALID_KEY_WARNING, PRELOAD_WARNING};
use iatex_experiment::{
    ErrorLatency, ExperimentEvent, ExperimentStateMachine, HostCall, InputEvent, InputModality,
    RawInput, RecordingHost, TaskConfig,
};
use iatex_timing::ManualTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;

type Machine = ExperimentStateMachine<ManualTimer, StdRng, RecordingHost>;

const ITI: u64 = 250;

struct Session {
    timer: ManualTimer,
    machine: Machine,
}

fn ids(words: &str) -> Vec<StimulusId> {
    words.split_whitespace().map(StimulusId::from).collect()
}

fn config() -> TaskConfig {
    TaskConfig {
        stimulus_sources: StimulusSources {
            target_positive: ids("Rose Tulip Lily"),
            target_negative: ids("Wasp Moth Gnat"),
            attribute_positive: ids("Joy Love Peace"),
            attribute_negative: ids("War Evil Agony"),
        },
        block_trial_numbers: vec![2, 2, 2, 4, 2, 2, 4],
        minimum_allowed_reaction_time_ms: 300,
        ..TaskConfig::default()
    }
}

fn session_with(config: TaskConfig, modality: InputModality, host: RecordingHost) -> Session {
    let timer = ManualTimer::with_epoch_millis(0);
    let machine = ExperimentStateMachine::new(
        config,
        modality,
        timer.clone(),
        StdRng::seed_from_u64(42),
        host,
    )
    .unwrap();
    Session { timer, machine }
}

fn session(config: TaskConfig) -> Session {
    session_with(config, InputModality::default(), RecordingHost::new())
}

impl Session {
    fn key(&mut self, code: &str) -> Vec<ExperimentEvent> {
        self.machine.handle_raw(&RawInput::Key(code.to_string()))
    }

    fn wait(&mut self, ms: u64) -> Vec<ExperimentEvent> {
        self.timer.advance_ms(ms);
        self.machine.update()
    }

    /// Fixation elapses and the stimulus appears.
    fn present(&mut self) {
        self.wait(ITI);
        assert_eq!(self.machine.phase(), Phase::StimulusShown);
    }

    fn correct_side(&self) -> Side {
        let state = self.machine.state();
        let plan = state.block.as_ref().unwrap();
        let trial = &plan.trials[state.active.unwrap()];
        Side::correct_for(plan.condition, trial.flag)
    }

    fn respond(&mut self, after_ms: u64, side: Side) -> Vec<ExperimentEvent> {
        self.timer.advance_ms(after_ms);
        self.machine.handle_input(InputEvent::Classify(side))
    }

    fn respond_correctly(&mut self, after_ms: u64) -> Vec<ExperimentEvent> {
        let side = self.correct_side();
        self.respond(after_ms, side)
    }

    fn current_trial(&self) -> &iatex_core::TrialSpec {
        let state = self.machine.state();
        &state.block.as_ref().unwrap().trials[state.trial_index]
    }

    fn store(&self, key: &str) -> &str {
        self.machine.host().store[key].as_str()
    }
}

fn opposite(side: Side) -> Side {
    match side {
        Side::Left => Side::Right,
        Side::Right => Side::Left,
    }
}

#[test]
fn full_session_records_every_block_then_terminates() {
    let mut s = session(config());
    let events = s.machine.start();
    assert!(matches!(
        events.as_slice(),
        [ExperimentEvent::BlockLaunched { block: 1, .. }]
    ));
    assert_eq!(s.machine.phase(), Phase::AwaitingBlockStart);
    assert_eq!(s.store("blockConditions"), "px|x+|p+|p+|x-|p-|p-");
    assert_eq!(s.store("firstCombination"), "p+");

    let counts = s.machine.config().block_trial_numbers.clone();
    for (block, &count) in counts.iter().enumerate() {
        assert_eq!(s.machine.state().block.as_ref().unwrap().number, block + 1);
        let events = s.key("Space");
        assert!(events.contains(&ExperimentEvent::BlockStarted(block + 1)));
        for _ in 0..count {
            s.present();
            let events = s.respond_correctly(400);
            assert!(events.contains(&ExperimentEvent::Scored(ScoreOutcome::Correct)));
        }
    }

    assert_eq!(s.machine.phase(), Phase::Complete);
    assert_eq!(s.machine.state().records.len(), 7);
    assert_eq!(s.store("block1Responses"), "1Y400_2Y400");
    assert_eq!(s.store("block4Responses"), "1Y400_2Y400_3Y400_4Y400");
    assert_eq!(s.store("block7Trials").split(',').count(), 4);
    let host = s.machine.host();
    assert!(matches!(host.calls.last(), Some(HostCall::Ending(_))));
    assert!(!host.terminated);

    assert!(s.wait(1499).is_empty());
    assert_eq!(s.wait(1), vec![ExperimentEvent::Terminated]);
    assert!(s.machine.host().terminated);
    assert!(s.machine.is_terminated());
}

#[test]
fn block_one_trials_come_from_the_target_axis() {
    let mut s = session(config());
    s.machine.start();
    let plan = s.machine.state().block.as_ref().unwrap();
    assert_eq!(plan.condition.code(), "px");
    assert!(plan.trials.iter().all(|t| !t.is_attribute));
    assert!(plan.preload.required().is_empty());
}

#[test]
fn too_fast_response_warns_and_keeps_waiting() {
    let mut s = session(config());
    s.machine.start();
    s.key("Space");
    s.present();

    let events = s.respond_correctly(50);
    assert_eq!(
        events,
        vec![
            ExperimentEvent::Scored(ScoreOutcome::TooFast),
            ExperimentEvent::WarningShown(Warning::TooFastResponse),
        ]
    );
    assert_eq!(s.machine.phase(), Phase::StimulusShown);
    assert_eq!(s.current_trial().correct, Correctness::Unscored);
    assert_eq!(s.current_trial().reaction_time, None);
    assert_eq!(
        s.machine.host().last_warning(),
        Some("Too fast! Please choose your answer carefully.")
    );

    s.wait(1500);
    assert_eq!(s.machine.host().calls.last(), Some(&HostCall::ClearWarning));

    let events = s.respond_correctly(0);
    assert!(events.contains(&ExperimentEvent::Scored(ScoreOutcome::Correct)));
    assert_eq!(s.machine.state().trial_index, 1);
    assert_eq!(s.machine.state().block.as_ref().unwrap().trials[0].reaction_time_ms(), Some(1550));
}

#[test]
fn wrong_then_corrected_keeps_the_first_latency() {
    let mut s = session(config());
    s.machine.start();
    s.key("Space");
    s.present();

    let wrong = opposite(s.correct_side());
    let events = s.respond(400, wrong);
    assert_eq!(
        events,
        vec![ExperimentEvent::Scored(ScoreOutcome::IncorrectPendingCorrection)]
    );
    assert_eq!(s.machine.host().calls.last(), Some(&HostCall::ErrorIndicator));
    assert_eq!(s.machine.phase(), Phase::StimulusShown);

    s.respond_correctly(300);
    assert_eq!(s.machine.phase(), Phase::Fixation);
    let first = &s.machine.state().block.as_ref().unwrap().trials[0];
    assert_eq!(first.correct, Correctness::Incorrect);
    assert_eq!(first.reaction_time_ms(), Some(400));
    assert_eq!(s.machine.host().count(&HostCall::ClearErrorIndicator), 2);
}

#[test]
fn correct_latency_option_records_the_corrective_response() {
    let mut s = session(TaskConfig {
        error_latency: ErrorLatency::Correct,
        block_trial_numbers: vec![1, 2, 2, 2, 2, 2, 2],
        ..config()
    });
    s.machine.start();
    s.key("Space");
    s.present();
    let wrong = opposite(s.correct_side());
    s.respond(400, wrong);
    s.respond_correctly(300);
    assert_eq!(s.store("block1Responses"), "1N700");
}

#[test]
fn uncorrected_error_auto_advances_after_the_delay() {
    let mut s = session(TaskConfig {
        requires_correction: false,
        ..config()
    });
    s.machine.start();
    s.key("Space");
    s.present();

    let wrong = opposite(s.correct_side());
    let events = s.respond(400, wrong);
    assert_eq!(events, vec![ExperimentEvent::Scored(ScoreOutcome::IncorrectFinal)]);
    assert_eq!(s.machine.phase(), Phase::Feedback);
    assert_eq!(s.machine.state().active, None);

    // nothing is scored while feedback is visible
    assert!(s.respond(100, Side::Left).is_empty());
    assert!(s.respond(100, Side::Right).is_empty());

    s.wait(99);
    assert_eq!(s.machine.phase(), Phase::Feedback);
    s.wait(1);
    assert_eq!(s.machine.phase(), Phase::Fixation);
    assert_eq!(s.machine.state().trial_index, 1);

    s.present();
    s.respond_correctly(500);
    assert_eq!(s.store("block1Responses"), "1N400_2Y500");
}

#[test]
fn block_start_waits_for_enough_images() {
    let mut config = config();
    config.target_stimulus.media = Media::Image;
    config.minimum_preload_image_percent = 100.0;
    let mut s = session(config);
    s.machine.start();

    let requested = s.machine.host().loads.clone();
    assert!(!requested.is_empty());
    assert_eq!(
        s.machine.state().block.as_ref().unwrap().preload.required().len(),
        requested.len()
    );

    let events = s.key("Space");
    assert_eq!(events, vec![ExperimentEvent::WarningShown(Warning::PreloadIncomplete)]);
    assert_eq!(s.machine.host().last_warning(), Some(PRELOAD_WARNING));
    assert_eq!(s.machine.phase(), Phase::AwaitingBlockStart);

    s.machine.image_loaded(&StimulusId::from("not-requested"));
    for id in &requested {
        s.machine.image_loaded(id);
    }
    let events = s.key("Space");
    assert!(events.contains(&ExperimentEvent::BlockStarted(1)));

    s.present();
    let shown = s.machine.host().calls.last().cloned();
    assert!(matches!(
        shown,
        Some(HostCall::Stimulus { media: Media::Image, color: None, .. })
    ));
}

#[test]
fn automatic_responses_drive_the_session_to_the_end() {
    let mut s = session(TaskConfig {
        automatic_responses_delay_ms: 400,
        ending_message: None,
        ..config()
    });
    s.machine.start();
    let mut terminated = false;
    for _ in 0..10_000 {
        if s.machine.phase() == Phase::AwaitingBlockStart {
            s.key("Space");
        }
        if s.wait(50).contains(&ExperimentEvent::Terminated) {
            terminated = true;
            break;
        }
    }
    assert!(terminated);
    assert_eq!(s.store("block1Responses"), "1Y400_2Y400");
    assert_eq!(s.store("block7Responses"), "1Y400_2Y400_3Y400_4Y400");
}

#[test]
fn automatic_response_below_the_floor_never_fires() {
    let mut s = session(TaskConfig {
        automatic_responses_delay_ms: 200,
        ..config()
    });
    s.machine.start();
    s.key("Space");
    s.present();
    assert!(s.wait(5_000).is_empty());
    assert_eq!(s.machine.phase(), Phase::StimulusShown);
    assert_eq!(s.machine.next_deadline(), None);
}

#[test]
fn stale_automatic_response_is_discarded() {
    let mut s = session(TaskConfig {
        automatic_responses_delay_ms: 600,
        ..config()
    });
    s.machine.start();
    s.key("Space");
    s.present();
    s.respond_correctly(400);
    assert_eq!(s.machine.state().trial_index, 1);

    // the timer for trial 0 fires during fixation of trial 1
    assert!(s.wait(200).is_empty());
    assert_eq!(s.machine.phase(), Phase::Fixation);
    s.wait(50);
    assert_eq!(s.machine.phase(), Phase::StimulusShown);
    assert_eq!(s.current_trial().correct, Correctness::Unscored);
}

#[test]
fn stray_and_invalid_inputs() {
    let mut s = session(config());
    assert!(s.key("Space").is_empty());
    s.machine.start();

    // only the advance key starts a block
    assert!(s.key("KeyF").is_empty());
    assert_eq!(s.machine.phase(), Phase::AwaitingBlockStart);
    s.key("Space");

    // classification during fixation has no active trial
    assert!(s.key("KeyJ").is_empty());
    assert_eq!(s.machine.phase(), Phase::Fixation);

    let events = s.key("KeyQ");
    assert_eq!(events, vec![ExperimentEvent::WarningShown(Warning::InvalidInputKey)]);
    assert_eq!(s.machine.host().last_warning(), Some(INVALID_KEY_WARNING));

    // a tap means nothing to a desktop session
    assert!(s.machine.handle_raw(&RawInput::Tap(Side::Left)).is_empty());
}

#[test]
fn only_the_latest_warning_is_dismissed() {
    let mut s = session(config());
    s.machine.start();
    s.key("Space");
    s.present();

    s.key("KeyQ");
    s.wait(1000);
    s.key("KeyW");
    s.wait(500);
    assert_eq!(s.machine.host().count(&HostCall::ClearWarning), 1);
    s.wait(1000);
    assert_eq!(s.machine.host().count(&HostCall::ClearWarning), 2);
}

#[test]
fn mobile_taps_begin_and_classify() {
    let mut s = session_with(config(), InputModality::Mobile, RecordingHost::new());
    s.machine.start();
    let instruction = s.machine.host().calls.iter().find_map(|c| match c {
        HostCall::Instruction(text) => Some(text.clone()),
        _ => None,
    });
    assert!(instruction.unwrap().ends_with("Tap either button to continue."));

    let events = s.machine.handle_raw(&RawInput::Tap(Side::Right));
    assert!(events.contains(&ExperimentEvent::BlockStarted(1)));
    s.present();
    s.timer.advance_ms(400);
    let side = s.correct_side();
    let events = s.machine.handle_raw(&RawInput::Tap(side));
    assert!(events.contains(&ExperimentEvent::Scored(ScoreOutcome::Correct)));
}

#[test]
fn examples_cycle_before_the_first_block() {
    let mut config = config();
    config.show_examples = true;
    config.example_duration_ms = 1000;
    config.stimulus_sources.attribute_positive.push("Rose".into());
    let mut s = session(config);
    s.machine.start();
    assert_eq!(s.machine.phase(), Phase::Examples);
    assert_eq!(s.machine.flags().get(&"Rose".into()), Some(Flag::ATTRIBUTE_POSITIVE));

    // no input during examples
    assert!(s.key("Space").is_empty());
    assert!(s.machine.handle_input(InputEvent::Begin).is_empty());

    let total = 13;
    for _ in 1..total {
        s.wait(1000);
        assert_eq!(s.machine.phase(), Phase::Examples);
    }
    let events = s.wait(1000);
    assert!(matches!(
        events.as_slice(),
        [ExperimentEvent::BlockLaunched { block: 1, .. }]
    ));
    let examples = s
        .machine
        .host()
        .calls
        .iter()
        .filter(|c| matches!(c, HostCall::Example { .. }))
        .count();
    assert_eq!(examples, total);
}

#[test]
fn labels_and_examples_use_their_configured_colours() {
    let mut config = config();
    config.show_examples = true;
    config.colors.target_label = "#a00000".into();
    config.colors.target_word = "#b00000".into();
    config.colors.attribute_label = "#00a000".into();
    config.colors.attribute_word = "#00b000".into();
    let mut s = session(config);
    s.machine.start();

    let example_colours: Vec<&str> = s
        .machine
        .host()
        .calls
        .iter()
        .filter_map(|c| match c {
            HostCall::Example { label, .. } => Some(label.color.as_str()),
            _ => None,
        })
        .collect();
    assert!(example_colours.contains(&"#b00000"));
    assert!(example_colours.contains(&"#00b000"));
    assert!(example_colours.iter().all(|c| ["#b00000", "#00b000"].contains(c)));

    while s.machine.phase() == Phase::Examples {
        s.wait(s.machine.config().example_duration_ms);
    }
    let Some(HostCall::CategoryLabels(left, right)) = s
        .machine
        .host()
        .calls
        .iter()
        .find(|c| matches!(c, HostCall::CategoryLabels(..)))
    else {
        panic!("block 1 shows no category labels");
    };
    for side in [left, right] {
        assert_eq!(side.target.as_ref().unwrap().color, "#a00000");
        assert_eq!(side.attribute, None);
    }
}

#[test]
fn huge_interval_saturates_the_deadline() {
    let mut config = config();
    config.inter_trial_interval_ms = 20_000_000_000_000;
    let mut s = session(config);
    s.machine.start();
    let events = s.key("Space");
    assert!(events.contains(&ExperimentEvent::BlockStarted(1)));
    assert_eq!(s.machine.next_deadline(), Some(u64::MAX));
    assert_eq!(s.machine.phase(), Phase::Fixation);
}

#[test]
fn stored_seed_from_an_earlier_task_is_reused() {
    let mut store = std::collections::BTreeMap::new();
    store.insert("flower_firstCombination".to_string(), "n-".to_string());
    let config = TaskConfig {
        study_name: "flower".into(),
        switch_attribute: false,
        ..config()
    };
    let mut s = session_with(config, InputModality::default(), RecordingHost::with_store(store));
    s.machine.start();
    assert_eq!(s.store("flower_blockConditions"), "nx|x-|n-|n-|px|p-|p-");
    assert_eq!(s.store("flower_firstCombination"), "n-");
}

#[test]
fn ending_without_message_terminates_immediately() {
    let mut s = session(TaskConfig {
        ending_message: None,
        block_trial_numbers: vec![1; 7],
        ..config()
    });
    s.machine.start();
    let mut last = Vec::new();
    for _ in 0..7 {
        s.key("Space");
        s.present();
        last = s.respond_correctly(400);
    }
    assert_eq!(last.last(), Some(&ExperimentEvent::Terminated));
    assert!(s.machine.host().terminated);
    assert!(!s.machine.host().calls.iter().any(|c| matches!(c, HostCall::Ending(_))));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let result = ExperimentStateMachine::new(
        TaskConfig::default(),
        InputModality::default(),
        ManualTimer::new(),
        StdRng::seed_from_u64(0),
        RecordingHost::new(),
    );
    assert!(result.is_err());
}
