use serde::{Deserialize, Serialize};

/// Instructional framing applied to a block of trials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Condition {
    #[serde(rename = "BE_CREATIVE")]
    BeCreative,
    #[serde(rename = "BE_FLUENT")]
    BeFluent,
    #[serde(rename = "practice")]
    Practice,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::BeCreative => "BE_CREATIVE",
            Condition::BeFluent => "BE_FLUENT",
            Condition::Practice => "practice",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOrder {
    CreativeFirst,
    FluentFirst,
}

impl ConditionOrder {
    /// Order label for a sequence whose first block runs `leading`.
    pub fn led_by(leading: Condition) -> Self {
        match leading {
            Condition::BeFluent => ConditionOrder::FluentFirst,
            Condition::BeCreative | Condition::Practice => ConditionOrder::CreativeFirst,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOrder::CreativeFirst => "creative_first",
            ConditionOrder::FluentFirst => "fluent_first",
        }
    }
}

/// Parameters of one trial, derived from the session plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrialParams {
    pub index: usize,
    pub theme: String,
    pub condition: Condition,
}

impl TrialParams {
    pub fn is_practice(&self) -> bool {
        self.index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&Condition::BeCreative).unwrap(),
            "\"BE_CREATIVE\""
        );
        assert_eq!(
            serde_json::to_string(&Condition::Practice).unwrap(),
            "\"practice\""
        );
        assert_eq!(
            serde_json::to_string(&ConditionOrder::FluentFirst).unwrap(),
            "\"fluent_first\""
        );
        assert_eq!(ConditionOrder::led_by(Condition::BeFluent).as_str(), "fluent_first");
    }
}
