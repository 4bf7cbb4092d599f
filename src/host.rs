use iatex_core::{
    CategoryLabel, Host, ImageLoader, Media, Presenter, ResultStore, SideLabel, StimulusId,
    StimulusView,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Prints presentation calls to stdout and keeps the store in memory.
pub struct TerminalHost {
    image_root: PathBuf,
    pub store: BTreeMap<String, String>,
    /// Images found on disk, waiting to be reported to the engine.
    pub completed: Vec<StimulusId>,
}

impl TerminalHost {
    pub fn new(image_root: PathBuf, store: BTreeMap<String, String>) -> Self {
        Self {
            image_root,
            store,
            completed: Vec::new(),
        }
    }
}

fn side(label: &SideLabel) -> String {
    match (&label.target, &label.attribute) {
        (Some(t), Some(a)) => format!("{} / {}", t.text, a.text),
        (Some(only), None) | (None, Some(only)) => only.text.clone(),
        (None, None) => String::new(),
    }
}

impl Presenter for TerminalHost {
    fn show_fixation(&mut self) {
        println!("            +");
    }

    fn show_stimulus(&mut self, stimulus: StimulusView<'_>) {
        match stimulus.media {
            Media::Text => println!("        >> {} <<", stimulus.content),
            Media::Image => println!("        [image {}]", stimulus.content),
        }
    }

    fn show_error_indicator(&mut self) {
        println!("            X");
    }

    fn clear_error_indicator(&mut self) {}

    fn show_warning(&mut self, text: &str) {
        println!("!! {text}");
    }

    fn clear_warning(&mut self) {}

    fn show_category_labels(&mut self, left: &SideLabel, right: &SideLabel) {
        println!();
        println!("{:<24}{:>24}", side(left), side(right));
    }

    fn render_block_instruction(&mut self, text: &str) {
        println!("{text}");
    }

    fn show_example(&mut self, label: &CategoryLabel, stimulus: StimulusView<'_>) {
        println!("{}: {}", label.text, stimulus.content);
    }

    fn show_ending(&mut self, text: &str) {
        println!();
        println!("{text}");
    }
}

impl ResultStore for TerminalHost {
    fn store(&mut self, key: &str, value: &str) {
        debug!(key, value, "stored");
        self.store.insert(key.to_string(), value.to_string());
    }

    fn fetch(&self, key: &str) -> Option<String> {
        self.store.get(key).cloned()
    }
}

impl ImageLoader for TerminalHost {
    fn load(&mut self, id: &StimulusId) {
        let path = self.image_root.join(id.as_str());
        if path.is_file() {
            self.completed.push(id.clone());
        } else {
            warn!(path = %path.display(), "image not found");
        }
    }
}

impl Host for TerminalHost {
    fn terminate(&mut self) {
        println!();
        println!("Task finished.");
    }
}
