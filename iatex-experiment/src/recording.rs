use iatex_core::{
    CategoryLabel, Host, ImageLoader, Media, Presenter, ResultStore, SideLabel, StimulusId,
    StimulusView,
};
use std::collections::BTreeMap;

/// One presentation call, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Fixation,
    Stimulus {
        media: Media,
        content: String,
        color: Option<String>,
    },
    ErrorIndicator,
    ClearErrorIndicator,
    Warning(String),
    ClearWarning,
    CategoryLabels(SideLabel, SideLabel),
    Instruction(String),
    Example { label: CategoryLabel, content: String },
    Ending(String),
}

/// Host that remembers everything asked of it. Used by tests and by
/// headless drivers.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    pub store: BTreeMap<String, String>,
    pub loads: Vec<StimulusId>,
    pub terminated: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated by an earlier task.
    pub fn with_store(store: BTreeMap<String, String>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn count(&self, call: &HostCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn stimuli(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().filter_map(|c| match c {
            HostCall::Stimulus { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn last_warning(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            HostCall::Warning(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Presenter for RecordingHost {
    fn show_fixation(&mut self) {
        self.calls.push(HostCall::Fixation);
    }

    fn show_stimulus(&mut self, stimulus: StimulusView<'_>) {
        self.calls.push(HostCall::Stimulus {
            media: stimulus.media,
            content: stimulus.content.to_string(),
            color: stimulus.color.map(str::to_string),
        });
    }

    fn show_error_indicator(&mut self) {
        self.calls.push(HostCall::ErrorIndicator);
    }

    fn clear_error_indicator(&mut self) {
        self.calls.push(HostCall::ClearErrorIndicator);
    }

    fn show_warning(&mut self, text: &str) {
        self.calls.push(HostCall::Warning(text.to_string()));
    }

    fn clear_warning(&mut self) {
        self.calls.push(HostCall::ClearWarning);
    }

    fn show_category_labels(&mut self, left: &SideLabel, right: &SideLabel) {
        self.calls
            .push(HostCall::CategoryLabels(left.clone(), right.clone()));
    }

    fn render_block_instruction(&mut self, text: &str) {
        self.calls.push(HostCall::Instruction(text.to_string()));
    }

    fn show_example(&mut self, label: &CategoryLabel, stimulus: StimulusView<'_>) {
        self.calls.push(HostCall::Example {
            label: label.clone(),
            content: stimulus.content.to_string(),
        });
    }

    fn show_ending(&mut self, text: &str) {
        self.calls.push(HostCall::Ending(text.to_string()));
    }
}

impl ResultStore for RecordingHost {
    fn store(&mut self, key: &str, value: &str) {
        self.store.insert(key.to_string(), value.to_string());
    }

    fn fetch(&self, key: &str) -> Option<String> {
        self.store.get(key).cloned()
    }
}

impl ImageLoader for RecordingHost {
    fn load(&mut self, id: &StimulusId) {
        self.loads.push(id.clone());
    }
}

impl Host for RecordingHost {
    fn terminate(&mut self) {
        self.terminated = true;
    }
}
