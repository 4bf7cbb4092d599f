use crate::config::KeyBindings;
use iatex_core::{Phase, Side};

/// Raw input as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// Key code, e.g. "KeyF" or "Space".
    Key(String),
    /// Tap on one of the two response buttons.
    Tap(Side),
}

/// Input after mapping through the modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Begin,
    Classify(Side),
    InvalidKey,
}

/// How the subject responds. Detecting the device is up to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputModality {
    Desktop(KeyBindings),
    Mobile,
}

impl Default for InputModality {
    fn default() -> Self {
        InputModality::Desktop(KeyBindings::default())
    }
}

impl InputModality {
    /// `None` means the input is dropped without any feedback.
    pub fn normalize(&self, raw: &RawInput, phase: Phase) -> Option<InputEvent> {
        if !phase.allows_input() {
            return None;
        }
        match (self, raw) {
            (InputModality::Desktop(keys), RawInput::Key(code)) => {
                if phase.is_awaiting_block_start() {
                    (*code == keys.advance.code).then_some(InputEvent::Begin)
                } else if *code == keys.left.code {
                    Some(InputEvent::Classify(Side::Left))
                } else if *code == keys.right.code {
                    Some(InputEvent::Classify(Side::Right))
                } else {
                    Some(InputEvent::InvalidKey)
                }
            }
            (InputModality::Mobile, RawInput::Tap(side)) => {
                if phase.is_awaiting_block_start() {
                    Some(InputEvent::Begin)
                } else {
                    Some(InputEvent::Classify(*side))
                }
            }
            _ => None,
        }
    }
}
