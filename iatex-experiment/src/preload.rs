use iatex_core::{ImageLoader, StimulusId};
use std::collections::BTreeSet;
use tracing::debug;

/// Image stimuli of the current block and which of them finished loading.
#[derive(Debug, Clone, Default)]
pub struct PreloadTracker {
    required: BTreeSet<StimulusId>,
    loaded: BTreeSet<StimulusId>,
    threshold_percent: f64,
}

impl PreloadTracker {
    pub fn new(required: BTreeSet<StimulusId>, threshold_percent: f64) -> Self {
        Self {
            required,
            loaded: BTreeSet::new(),
            threshold_percent,
        }
    }

    /// Requests every required image once.
    pub fn begin<L: ImageLoader + ?Sized>(&self, loader: &mut L) {
        for id in &self.required {
            loader.load(id);
        }
        debug!(count = self.required.len(), "image preload requested");
    }

    /// Records a completion. Ids outside the required set are ignored.
    pub fn mark_loaded(&mut self, id: &StimulusId) -> bool {
        if self.required.contains(id) {
            self.loaded.insert(id.clone())
        } else {
            false
        }
    }

    pub fn is_ready(&self) -> bool {
        is_ready(
            self.required.len(),
            self.loaded.len(),
            self.threshold_percent,
        )
    }

    pub fn required(&self) -> &BTreeSet<StimulusId> {
        &self.required
    }

    pub fn loaded(&self) -> &BTreeSet<StimulusId> {
        &self.loaded
    }
}

/// True when nothing is required or enough has loaded.
pub fn is_ready(required: usize, loaded: usize, threshold_percent: f64) -> bool {
    required == 0 || loaded as f64 >= required as f64 * threshold_percent / 100.0
}
