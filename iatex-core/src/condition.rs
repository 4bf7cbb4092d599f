use crate::error::ConditionError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The two stimulus axes of an IAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Target,
    Attribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn opposite(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

/// Source flag of a stimulus: `p`, `n` (target) or `+`, `-` (attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flag {
    pub category: Category,
    pub polarity: Polarity,
}

impl Flag {
    pub const TARGET_POSITIVE: Flag = Flag::new(Category::Target, Polarity::Positive);
    pub const TARGET_NEGATIVE: Flag = Flag::new(Category::Target, Polarity::Negative);
    pub const ATTRIBUTE_POSITIVE: Flag = Flag::new(Category::Attribute, Polarity::Positive);
    pub const ATTRIBUTE_NEGATIVE: Flag = Flag::new(Category::Attribute, Polarity::Negative);

    /// Declaration order of the four stimulus lists.
    pub const ALL: [Flag; 4] = [
        Flag::TARGET_POSITIVE,
        Flag::TARGET_NEGATIVE,
        Flag::ATTRIBUTE_POSITIVE,
        Flag::ATTRIBUTE_NEGATIVE,
    ];

    pub const fn new(category: Category, polarity: Polarity) -> Self {
        Self { category, polarity }
    }

    pub fn is_attribute(&self) -> bool {
        self.category == Category::Attribute
    }

    pub fn as_char(&self) -> char {
        match (self.category, self.polarity) {
            (Category::Target, Polarity::Positive) => 'p',
            (Category::Target, Polarity::Negative) => 'n',
            (Category::Attribute, Polarity::Positive) => '+',
            (Category::Attribute, Polarity::Negative) => '-',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'p' => Some(Flag::TARGET_POSITIVE),
            'n' => Some(Flag::TARGET_NEGATIVE),
            '+' => Some(Flag::ATTRIBUTE_POSITIVE),
            '-' => Some(Flag::ATTRIBUTE_NEGATIVE),
            _ => None,
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let c = char::deserialize(deserializer)?;
        Flag::from_char(c)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown stimulus flag {c:?}")))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    SingleTarget,
    SingleAttribute,
    Combined,
}

/// Two-character block code. Position 0 is the target polarity (`p`, `n` or
/// `x`), position 1 the attribute polarity (`+`, `-` or `x`). At least one
/// axis is always active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    target: Option<Polarity>,
    attribute: Option<Polarity>,
}

impl Condition {
    pub const COMBINED: [Condition; 4] = [
        Condition::combined(Polarity::Positive, Polarity::Positive),
        Condition::combined(Polarity::Positive, Polarity::Negative),
        Condition::combined(Polarity::Negative, Polarity::Positive),
        Condition::combined(Polarity::Negative, Polarity::Negative),
    ];

    pub fn new(
        target: Option<Polarity>,
        attribute: Option<Polarity>,
    ) -> Result<Self, ConditionError> {
        if target.is_none() && attribute.is_none() {
            return Err(ConditionError::NoActiveAxis);
        }
        Ok(Self { target, attribute })
    }

    pub const fn combined(target: Polarity, attribute: Polarity) -> Self {
        Self {
            target: Some(target),
            attribute: Some(attribute),
        }
    }

    pub const fn target_only(target: Polarity) -> Self {
        Self {
            target: Some(target),
            attribute: None,
        }
    }

    pub const fn attribute_only(attribute: Polarity) -> Self {
        Self {
            target: None,
            attribute: Some(attribute),
        }
    }

    pub fn target(&self) -> Option<Polarity> {
        self.target
    }

    pub fn attribute(&self) -> Option<Polarity> {
        self.attribute
    }

    pub fn axis(&self, category: Category) -> Option<Polarity> {
        match category {
            Category::Target => self.target,
            Category::Attribute => self.attribute,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match (self.target, self.attribute) {
            (Some(_), Some(_)) => BlockKind::Combined,
            (None, Some(_)) => BlockKind::SingleAttribute,
            _ => BlockKind::SingleTarget,
        }
    }

    pub fn is_combined(&self) -> bool {
        self.kind() == BlockKind::Combined
    }

    /// Whether the code contains the flag's character, i.e. whether a
    /// stimulus with that flag belongs on the left side in this block.
    pub fn includes(&self, flag: Flag) -> bool {
        self.axis(flag.category) == Some(flag.polarity)
    }

    pub fn code(&self) -> String {
        let t = self
            .target
            .map_or('x', |p| Flag::new(Category::Target, p).as_char());
        let a = self
            .attribute
            .map_or('x', |p| Flag::new(Category::Attribute, p).as_char());
        [t, a].iter().collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        let [t, a] = chars[..] else {
            return Err(ConditionError::Length(s.to_string()));
        };
        let target = match t {
            'x' => None,
            'p' => Some(Polarity::Positive),
            'n' => Some(Polarity::Negative),
            other => return Err(ConditionError::TargetAxis(other)),
        };
        let attribute = match a {
            'x' => None,
            '+' => Some(Polarity::Positive),
            '-' => Some(Polarity::Negative),
            other => return Err(ConditionError::AttributeAxis(other)),
        };
        Condition::new(target, attribute)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
