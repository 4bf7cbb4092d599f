use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition code must be two characters, got {0:?}")]
    Length(String),
    #[error("invalid target polarity {0:?}, expected 'p', 'n' or 'x'")]
    TargetAxis(char),
    #[error("invalid attribute polarity {0:?}, expected '+', '-' or 'x'")]
    AttributeAxis(char),
    #[error("condition must activate at least one axis")]
    NoActiveAxis,
}
