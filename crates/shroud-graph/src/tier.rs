//! Relationship tiers.

use serde::{Deserialize, Serialize};

/// Strength of a social edge. Intimate > friend > acquaintance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Intimate,
    Friend,
    Acquaintance,
}

impl Tier {
    /// All tiers, strongest first.
    pub const ALL: [Tier; 3] = [Tier::Intimate, Tier::Friend, Tier::Acquaintance];

    /// The stronger of two tiers. Used when edge construction from both
    /// endpoints disagrees about a relationship.
    pub fn stronger(self, other: Tier) -> Tier {
        self.min(other)
    }

    /// Multiplier applied to reply-outcome weights.
    pub fn reply_multiplier(self) -> f64 {
        match self {
            Tier::Intimate => 1.5,
            Tier::Friend => 1.0,
            Tier::Acquaintance => 0.6,
        }
    }

    /// Weight used when a sender picks a recipient among its neighbors.
    pub fn recipient_weight(self) -> f64 {
        match self {
            Tier::Intimate => 3.0,
            Tier::Friend => 1.5,
            Tier::Acquaintance => 1.0,
        }
    }

    /// Stable lowercase label, matching the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Intimate => "intimate",
            Tier::Friend => "friend",
            Tier::Acquaintance => "acquaintance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stronger_prefers_intimate() {
        assert_eq!(Tier::Intimate.stronger(Tier::Acquaintance), Tier::Intimate);
        assert_eq!(Tier::Acquaintance.stronger(Tier::Friend), Tier::Friend);
        assert_eq!(Tier::Friend.stronger(Tier::Friend), Tier::Friend);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Tier::Intimate).unwrap();
        assert_eq!(json, "\"intimate\"");
        let parsed: Tier = serde_json::from_str("\"acquaintance\"").unwrap();
        assert_eq!(parsed, Tier::Acquaintance);
    }
}
