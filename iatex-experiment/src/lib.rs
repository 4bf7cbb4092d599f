pub mod config;
pub mod generator;
pub mod input;
pub mod instruction;
pub mod preload;
pub mod recorder;
pub mod recording;
pub mod schedule;
pub mod scorer;
pub mod state;

pub use config::{
    BLOCK_COUNT, CategoryLabels, Colors, ConfigError, ErrorLatency, KeyBinding, KeyBindings,
    StimulusKind, TaskConfig,
};
pub use generator::{StimulusPool, TrialGenerator, collect_image_sources, combined_start};
pub use input::{InputEvent, InputModality, RawInput};
pub use instruction::{BlockInstruction, block_instruction};
pub use preload::PreloadTracker;
pub use recorder::{BlockRecord, BlockRecorder};
pub use recording::{HostCall, RecordingHost};
pub use schedule::{
    BlockSequence, ConditionScheduler, ResolvedSchedule, SeedOrigin, counterbalanced_sequence,
    fixed_sequence, seed_from_clock,
};
pub use scorer::ResponseScorer;
pub use state::{
    BlockPlan, ExperimentEvent, ExperimentState, ExperimentStateMachine, TimerAction, TrialKey,
};
