use crate::config::TaskConfig;
use crate::input::InputModality;
use iatex_core::{Category, CategoryLabel, Condition, Flag, SideLabel};

/// What the subject sees before pressing begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInstruction {
    pub left: SideLabel,
    pub right: SideLabel,
    pub text: String,
}

pub fn block_instruction(
    config: &TaskConfig,
    condition: Condition,
    modality: &InputModality,
) -> BlockInstruction {
    let left = side_label(config, condition, false);
    let right = side_label(config, condition, true);

    let (left_action, right_action, correction_action, continue_prompt) = match modality {
        InputModality::Desktop(keys) => (
            format!("press the key {}.", keys.left.name),
            format!("press the key {}.", keys.right.name),
            "press the other key.".to_string(),
            format!("Press {} to continue.", keys.advance.name),
        ),
        InputModality::Mobile => (
            "tap the left button.".to_string(),
            "tap the right button.".to_string(),
            "tap the other button.".to_string(),
            "Tap either button to continue.".to_string(),
        ),
    };

    let mut text = format!(
        "If {} are presented, {} If {} are presented, {}\n\nGo fast. Some mistakes are OKAY.",
        describe(config, &left),
        left_action,
        describe(config, &right),
        right_action,
    );
    if config.requires_correction {
        text.push_str(" When an error message (the red X) shows, ");
        text.push_str(&correction_action);
    }
    text.push_str("\n\n");
    text.push_str(&continue_prompt);

    BlockInstruction { left, right, text }
}

/// Labels of the active axes; the right side shows the opposite polarity.
fn side_label(config: &TaskConfig, condition: Condition, right: bool) -> SideLabel {
    let label = |category: Category| {
        condition.axis(category).map(|polarity| {
            let flag = Flag::new(category, if right { polarity.opposite() } else { polarity });
            CategoryLabel::new(
                config.labels.get(flag),
                config.label_color(category == Category::Attribute),
            )
        })
    };
    SideLabel {
        target: label(Category::Target),
        attribute: label(Category::Attribute),
    }
}

fn describe(config: &TaskConfig, label: &SideLabel) -> String {
    let target = label
        .target
        .as_ref()
        .map(|t| format!("{} {}", t.text, config.target_stimulus.reference));
    let attribute = label
        .attribute
        .as_ref()
        .map(|a| format!("{} {}", a.text, config.attribute_stimulus.reference));
    match (target, attribute) {
        (Some(t), Some(a)) => format!("{t} or {a}"),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => String::new(),
    }
}
