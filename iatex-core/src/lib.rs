pub mod condition;
pub mod error;
pub mod host;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use condition::{BlockKind, Category, Condition, Flag, Polarity};
pub use error::ConditionError;
pub use host::{
    CategoryLabel, Host, ImageLoader, Presenter, ResultStore, SideLabel, StimulusView,
};
pub use phase::{Phase, Warning};
pub use stimulus::{FlagTable, Media, StimulusId, StimulusSources};
pub use trial::{Correctness, ScoreOutcome, Side, TrialSpec};
