use iatex_core::{Category, Condition, Flag, Media, Polarity, StimulusSources};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

/// Number of blocks in the standard design.
pub const BLOCK_COUNT: usize = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("expected 7 block trial counts, got {0}")]
    BlockTrialNumbers(usize),
    #[error("block {0} has no trials")]
    EmptyBlock(usize),
    #[error("stimulus list '{0}' is empty")]
    EmptySource(Flag),
    #[error("minimum preload percent must be within 0..=100, got {0}")]
    PreloadPercent(f64),
    #[error("first combination must be a combined condition, got {0}")]
    FirstCombination(Condition),
    #[error("invalid task configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the reaction time of a corrected trial is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLatency {
    /// Elapsed time to the first (wrong) response.
    #[default]
    Error,
    /// Elapsed time to the corrective response.
    Correct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusKind {
    /// How the stimuli are referred to in instructions, e.g. "words".
    pub reference: String,
    pub media: Media,
}

impl Default for StimulusKind {
    fn default() -> Self {
        Self {
            reference: "words".to_string(),
            media: Media::Text,
        }
    }
}

/// Category names, one per flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryLabels {
    #[serde(rename = "p")]
    pub target_positive: String,
    #[serde(rename = "n")]
    pub target_negative: String,
    #[serde(rename = "+")]
    pub attribute_positive: String,
    #[serde(rename = "-")]
    pub attribute_negative: String,
}

impl CategoryLabels {
    pub fn get(&self, flag: Flag) -> &str {
        match (flag.category, flag.polarity) {
            (Category::Target, Polarity::Positive) => &self.target_positive,
            (Category::Target, Polarity::Negative) => &self.target_negative,
            (Category::Attribute, Polarity::Positive) => &self.attribute_positive,
            (Category::Attribute, Polarity::Negative) => &self.attribute_negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// Key code as reported by the input source, e.g. "KeyF".
    pub code: String,
    /// Name used in instructions, e.g. "F".
    pub name: String,
}

impl KeyBinding {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub left: KeyBinding,
    pub right: KeyBinding,
    pub advance: KeyBinding,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: KeyBinding::new("KeyF", "F"),
            right: KeyBinding::new("KeyJ", "J"),
            advance: KeyBinding::new("Space", "Space"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    pub target_label: String,
    pub target_word: String,
    pub attribute_label: String,
    pub attribute_word: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            target_label: "#ffa500".to_string(),
            target_word: "#ffa500".to_string(),
            attribute_label: "#003B00".to_string(),
            attribute_word: "#003B00".to_string(),
        }
    }
}

/// Immutable task description, normally parsed from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub counterbalancing: bool,
    pub switch_attribute: bool,
    /// Prefix for every persisted key when several tasks share a survey.
    pub study_name: String,
    pub stimulus_sources: StimulusSources,
    pub labels: CategoryLabels,
    pub target_stimulus: StimulusKind,
    pub attribute_stimulus: StimulusKind,
    pub block_trial_numbers: Vec<usize>,
    pub inter_trial_interval_ms: u64,
    pub minimum_allowed_reaction_time_ms: u64,
    pub auto_advance_delay_ms: u64,
    /// Test affordance: when above the reaction-time floor, the correct
    /// response is entered automatically after this delay.
    pub automatic_responses_delay_ms: u64,
    pub requires_correction: bool,
    pub error_latency: ErrorLatency,
    pub inter_trial_response_separator: String,
    pub minimum_preload_image_percent: f64,
    /// Seed for counterbalancing, shared with an earlier related task.
    pub first_combination: Option<Condition>,
    pub show_examples: bool,
    pub example_duration_ms: u64,
    pub keys: KeyBindings,
    pub colors: Colors,
    pub too_fast_response_error_message: String,
    pub ending_message: Option<String>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            counterbalancing: true,
            switch_attribute: true,
            study_name: String::new(),
            stimulus_sources: StimulusSources::default(),
            labels: CategoryLabels::default(),
            target_stimulus: StimulusKind::default(),
            attribute_stimulus: StimulusKind::default(),
            block_trial_numbers: vec![20, 20, 20, 40, 20, 20, 40],
            inter_trial_interval_ms: 250,
            minimum_allowed_reaction_time_ms: 250,
            auto_advance_delay_ms: 300,
            automatic_responses_delay_ms: 0,
            requires_correction: true,
            error_latency: ErrorLatency::Error,
            inter_trial_response_separator: "_".to_string(),
            minimum_preload_image_percent: 50.0,
            first_combination: None,
            show_examples: false,
            example_duration_ms: 1500,
            keys: KeyBindings::default(),
            colors: Colors::default(),
            too_fast_response_error_message: "Too fast! Please choose your answer carefully."
                .to_string(),
            ending_message: Some(
                "You have completed this task. Thank you for your time.".to_string(),
            ),
        }
    }
}

impl TaskConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TaskConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let config: TaskConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_trial_numbers.len() != BLOCK_COUNT {
            return Err(ConfigError::BlockTrialNumbers(self.block_trial_numbers.len()));
        }
        if let Some(i) = self.block_trial_numbers.iter().position(|&n| n == 0) {
            return Err(ConfigError::EmptyBlock(i + 1));
        }
        if let Some(flag) = Flag::ALL
            .into_iter()
            .find(|&f| self.stimulus_sources.get(f).is_empty())
        {
            return Err(ConfigError::EmptySource(flag));
        }
        if !(0.0..=100.0).contains(&self.minimum_preload_image_percent) {
            return Err(ConfigError::PreloadPercent(
                self.minimum_preload_image_percent,
            ));
        }
        if let Some(seed) = self.first_combination {
            if !seed.is_combined() {
                return Err(ConfigError::FirstCombination(seed));
            }
        }
        Ok(())
    }

    pub fn media_for(&self, flag: Flag) -> Media {
        if flag.is_attribute() {
            self.attribute_stimulus.media
        } else {
            self.target_stimulus.media
        }
    }

    pub fn word_color(&self, is_attribute: bool) -> &str {
        if is_attribute {
            &self.colors.attribute_word
        } else {
            &self.colors.target_word
        }
    }

    pub fn label_color(&self, is_attribute: bool) -> &str {
        if is_attribute {
            &self.colors.attribute_label
        } else {
            &self.colors.target_label
        }
    }

    /// "block" or "{study}_block".
    pub fn block_key_prefix(&self) -> String {
        self.key("block")
    }

    /// Prefixes a persisted field name with the study name when one is set.
    pub fn key(&self, field: &str) -> String {
        if self.study_name.is_empty() {
            field.to_string()
        } else {
            format!("{}_{}", self.study_name, field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "stimulus_sources": {
            "p": ["Rose", "Tulip"], "n": ["Wasp", "Moth"],
            "+": ["Joy", "Love"], "-": ["War", "Evil"]
        }
    }"#;

    #[test]
    fn minimal_json_takes_defaults() {
        let config = TaskConfig::from_json_str(MINIMAL).unwrap();
        assert!(config.counterbalancing);
        assert!(config.requires_correction);
        assert_eq!(config.block_trial_numbers, vec![20, 20, 20, 40, 20, 20, 40]);
        assert_eq!(config.keys.left.code, "KeyF");
        assert_eq!(config.inter_trial_response_separator, "_");
        assert_eq!(config.error_latency, ErrorLatency::Error);
        assert!(config.ending_message.is_some());
    }

    #[test]
    fn explicit_null_ending_message_disables_it() {
        let json = MINIMAL.replacen('{', r#"{"ending_message": null, "#, 1);
        let config = TaskConfig::from_json_str(&json).unwrap();
        assert_eq!(config.ending_message, None);
    }

    #[test]
    fn first_combination_parses_from_code() {
        let json = MINIMAL.replacen('{', r#"{"first_combination": "n-", "#, 1);
        let config = TaskConfig::from_json_str(&json).unwrap();
        assert_eq!(config.first_combination.map(|c| c.code()), Some("n-".into()));
    }

    #[test]
    fn validation_rejects_bad_configs() {
        let mut config = TaskConfig::from_json_str(MINIMAL).unwrap();
        config.block_trial_numbers.pop();
        assert!(matches!(config.validate(), Err(ConfigError::BlockTrialNumbers(6))));

        let mut config = TaskConfig::from_json_str(MINIMAL).unwrap();
        config.stimulus_sources.attribute_negative.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptySource(Flag::ATTRIBUTE_NEGATIVE))
        ));

        let mut config = TaskConfig::from_json_str(MINIMAL).unwrap();
        config.first_combination = Some("px".parse().unwrap());
        assert!(matches!(config.validate(), Err(ConfigError::FirstCombination(_))));

        let mut config = TaskConfig::from_json_str(MINIMAL).unwrap();
        config.minimum_preload_image_percent = 120.0;
        assert!(matches!(config.validate(), Err(ConfigError::PreloadPercent(_))));

        assert!(matches!(
            TaskConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn every_flag_has_its_own_label_and_colour() {
        let json = MINIMAL.replacen(
            '{',
            r##"{"labels": {"p": "Flower", "n": "Insect", "+": "Good", "-": "Bad"},
                "colors": {"target_label": "#111111", "attribute_label": "#222222"}, "##,
            1,
        );
        let config = TaskConfig::from_json_str(&json).unwrap();
        let names: Vec<&str> = Flag::ALL.into_iter().map(|f| config.labels.get(f)).collect();
        assert_eq!(names, ["Flower", "Insect", "Good", "Bad"]);
        assert_eq!(config.label_color(false), "#111111");
        assert_eq!(config.label_color(true), "#222222");
        assert_eq!(config.word_color(true), "#003B00");
    }

    #[test]
    fn keys_carry_study_prefix() {
        let mut config = TaskConfig::default();
        assert_eq!(config.block_key_prefix(), "block");
        config.study_name = "flower".into();
        assert_eq!(config.block_key_prefix(), "flower_block");
        assert_eq!(config.key("blockConditions"), "flower_blockConditions");
    }
}
