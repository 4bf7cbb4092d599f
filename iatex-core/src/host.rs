use crate::stimulus::{Media, StimulusId};

/// What to draw for one stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusView<'a> {
    pub media: Media,
    pub content: &'a str,
    /// Word colour; `None` for images.
    pub color: Option<&'a str>,
}

/// A category name and the colour it is drawn in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLabel {
    pub text: String,
    pub color: String,
}

impl CategoryLabel {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: color.into(),
        }
    }
}

/// Category names shown above one response side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideLabel {
    pub target: Option<CategoryLabel>,
    pub attribute: Option<CategoryLabel>,
}

/// Drawing surface. The engine decides what is visible; layout is the
/// implementor's business.
pub trait Presenter {
    fn show_fixation(&mut self);
    fn show_stimulus(&mut self, stimulus: StimulusView<'_>);
    fn show_error_indicator(&mut self);
    fn clear_error_indicator(&mut self);
    fn show_warning(&mut self, text: &str);
    fn clear_warning(&mut self);
    fn show_category_labels(&mut self, left: &SideLabel, right: &SideLabel);
    fn render_block_instruction(&mut self, text: &str);
    fn show_example(&mut self, label: &CategoryLabel, stimulus: StimulusView<'_>);
    fn show_ending(&mut self, text: &str);
}

/// Key/value sink owned by the host survey platform.
pub trait ResultStore {
    fn store(&mut self, key: &str, value: &str);

    /// Value written by an earlier task of the same survey, if any.
    fn fetch(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Starts an asynchronous image fetch. Completion is reported back through
/// the engine's `image_loaded`; failures are simply never reported.
pub trait ImageLoader {
    fn load(&mut self, id: &StimulusId);
}

/// Everything the engine needs from its surroundings.
pub trait Host: Presenter + ResultStore + ImageLoader {
    /// Called once after the last block; the host advances its survey.
    fn terminate(&mut self);
}
