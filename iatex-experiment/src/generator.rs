use crate::config::TaskConfig;
use iatex_core::{
    BlockKind, Category, Condition, Flag, FlagTable, Media, StimulusId, StimulusSources, TrialSpec,
};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Shuffled draw pile over both lists of one axis. When empty it is rebuilt
/// from the full lists and reshuffled; leftovers are never carried over.
#[derive(Debug, Clone)]
pub struct StimulusPool<'a> {
    sources: &'a StimulusSources,
    category: Category,
    pile: Vec<(StimulusId, Flag)>,
    fills: usize,
}

impl<'a> StimulusPool<'a> {
    pub fn new(sources: &'a StimulusSources, category: Category) -> Self {
        Self {
            sources,
            category,
            pile: Vec::new(),
            fills: 0,
        }
    }

    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(StimulusId, Flag)> {
        if self.pile.is_empty() {
            self.pile = self.sources.axis(self.category);
            self.pile.shuffle(rng);
            self.fills += 1;
            debug!(
                category = ?self.category,
                size = self.pile.len(),
                fill = self.fills,
                "pool refilled"
            );
        }
        self.pile.pop()
    }

    /// How many times the pile has been (re)built, including the first fill.
    pub fn fills(&self) -> usize {
        self.fills
    }

    pub fn remaining(&self) -> usize {
        self.pile.len()
    }
}

/// Which axis a combined block starts with, from the wall clock parity.
pub fn combined_start(epoch_ms: u64) -> Category {
    if epoch_ms % 2 == 0 {
        Category::Attribute
    } else {
        Category::Target
    }
}

/// Builds the ordered trial list of one block.
pub struct TrialGenerator<'a> {
    config: &'a TaskConfig,
    flags: &'a FlagTable,
}

impl<'a> TrialGenerator<'a> {
    pub fn new(config: &'a TaskConfig, flags: &'a FlagTable) -> Self {
        Self { config, flags }
    }

    /// `start` only matters for combined blocks: the axis of the first
    /// trial. Sources then strictly alternate.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        condition: Condition,
        count: usize,
        start: Category,
        rng: &mut R,
    ) -> Vec<TrialSpec> {
        let sources = &self.config.stimulus_sources;
        let mut trials = Vec::with_capacity(count);
        match condition.kind() {
            BlockKind::Combined => {
                let mut attribute = StimulusPool::new(sources, Category::Attribute);
                let mut target = StimulusPool::new(sources, Category::Target);
                let mut current = start;
                for _ in 0..count {
                    let pool = match current {
                        Category::Attribute => &mut attribute,
                        Category::Target => &mut target,
                    };
                    let Some(drawn) = pool.draw(rng) else {
                        warn!(category = ?current, "no stimuli for axis, block truncated");
                        break;
                    };
                    trials.push(self.trial(drawn, current));
                    current = match current {
                        Category::Attribute => Category::Target,
                        Category::Target => Category::Attribute,
                    };
                }
            }
            kind => {
                let category = if kind == BlockKind::SingleAttribute {
                    Category::Attribute
                } else {
                    Category::Target
                };
                let mut pool = StimulusPool::new(sources, category);
                for _ in 0..count {
                    let Some(drawn) = pool.draw(rng) else {
                        warn!(?category, "no stimuli for axis, block truncated");
                        break;
                    };
                    trials.push(self.trial(drawn, category));
                }
            }
        }
        debug!(condition = %condition, trials = trials.len(), "block trials generated");
        trials
    }

    fn trial(&self, (stimulus, source_flag): (StimulusId, Flag), category: Category) -> TrialSpec {
        let flag = self.flags.get(&stimulus).unwrap_or(source_flag);
        let media = match category {
            Category::Attribute => self.config.attribute_stimulus.media,
            Category::Target => self.config.target_stimulus.media,
        };
        let mut trial = TrialSpec::new(stimulus, flag, media);
        trial.is_attribute = category == Category::Attribute;
        trial
    }
}

/// Unique image stimuli of a trial list.
pub fn collect_image_sources(trials: &[TrialSpec]) -> BTreeSet<StimulusId> {
    trials
        .iter()
        .filter(|t| t.media == Media::Image)
        .map(|t| t.stimulus.clone())
        .collect()
}
