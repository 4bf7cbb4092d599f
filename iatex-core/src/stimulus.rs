use crate::condition::{Category, Flag, Polarity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a stimulus: the word itself for text stimuli, a path or URL
/// for images.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StimulusId(String);

impl StimulusId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StimulusId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Media {
    #[default]
    Text,
    Image,
}

/// The four ordered stimulus lists, keyed by flag character in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSources {
    #[serde(rename = "p")]
    pub target_positive: Vec<StimulusId>,
    #[serde(rename = "n")]
    pub target_negative: Vec<StimulusId>,
    #[serde(rename = "+")]
    pub attribute_positive: Vec<StimulusId>,
    #[serde(rename = "-")]
    pub attribute_negative: Vec<StimulusId>,
}

impl StimulusSources {
    pub fn get(&self, flag: Flag) -> &[StimulusId] {
        match (flag.category, flag.polarity) {
            (Category::Target, Polarity::Positive) => &self.target_positive,
            (Category::Target, Polarity::Negative) => &self.target_negative,
            (Category::Attribute, Polarity::Positive) => &self.attribute_positive,
            (Category::Attribute, Polarity::Negative) => &self.attribute_negative,
        }
    }

    /// Both lists of one axis, positive first, tagged with their source flag.
    pub fn axis(&self, category: Category) -> Vec<(StimulusId, Flag)> {
        Flag::ALL
            .into_iter()
            .filter(|f| f.category == category)
            .flat_map(|f| self.get(f).iter().map(move |s| (s.clone(), f)))
            .collect()
    }
}

/// Stimulus to flag lookup. Built once from the four lists in declaration
/// order; a stimulus appearing in several lists keeps the last flag written.
#[derive(Debug, Clone, Default)]
pub struct FlagTable {
    flags: HashMap<StimulusId, Flag>,
}

impl FlagTable {
    pub fn from_sources(sources: &StimulusSources) -> Self {
        let mut table = Self::default();
        for flag in Flag::ALL {
            for stimulus in sources.get(flag) {
                table.insert(stimulus.clone(), flag);
            }
        }
        table
    }

    pub fn insert(&mut self, stimulus: StimulusId, flag: Flag) {
        self.flags.insert(stimulus, flag);
    }

    pub fn get(&self, stimulus: &StimulusId) -> Option<Flag> {
        self.flags.get(stimulus).copied()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
