//! Static catalogs of purchasable generators and focus upgrades.
//!
//! Both catalogs are closed sets: each id is an enum variant with a matching
//! entry in a static definition table, so lookups are infallible and adding
//! a variant without a definition fails to compile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Rejection;

/// Static definition of a passive Energy generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorDefinition {
    pub id: GeneratorId,
    pub name: &'static str,
    pub base_cost: f64,
    /// Growth factor applied per owned unit. Always greater than 1.
    pub cost_scale: f64,
    /// Energy per second produced by one unit.
    pub base_production: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeneratorId {
    #[serde(rename = "gen1")]
    ManualClick,
    #[serde(rename = "gen2")]
    StudentIntern,
    #[serde(rename = "gen3")]
    CoffeeMachine,
    #[serde(rename = "gen4")]
    FocusedWorkstation,
}

const GENERATORS: [GeneratorDefinition; 4] = [
    GeneratorDefinition {
        id: GeneratorId::ManualClick,
        name: "Manual Click",
        base_cost: 10.0,
        cost_scale: 1.15,
        base_production: 0.1,
    },
    GeneratorDefinition {
        id: GeneratorId::StudentIntern,
        name: "Student Intern",
        base_cost: 100.0,
        cost_scale: 1.20,
        base_production: 1.0,
    },
    GeneratorDefinition {
        id: GeneratorId::CoffeeMachine,
        name: "Automated Coffee Machine",
        base_cost: 1100.0,
        cost_scale: 1.25,
        base_production: 10.0,
    },
    GeneratorDefinition {
        id: GeneratorId::FocusedWorkstation,
        name: "Focused Workstation",
        base_cost: 13000.0,
        cost_scale: 1.30,
        base_production: 85.0,
    },
];

impl GeneratorId {
    /// Every generator, in catalog (display) order.
    pub const ALL: [GeneratorId; 4] = [
        GeneratorId::ManualClick,
        GeneratorId::StudentIntern,
        GeneratorId::CoffeeMachine,
        GeneratorId::FocusedWorkstation,
    ];

    pub fn definition(self) -> &'static GeneratorDefinition {
        &GENERATORS[self as usize]
    }

    /// The stable key used in save files and shell commands.
    pub fn key(self) -> &'static str {
        match self {
            GeneratorId::ManualClick => "gen1",
            GeneratorId::StudentIntern => "gen2",
            GeneratorId::CoffeeMachine => "gen3",
            GeneratorId::FocusedWorkstation => "gen4",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

impl FromStr for GeneratorId {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| {
                id.key() == wanted
                    || id.definition().name.to_ascii_lowercase() == wanted
                    || (wanted.len() > 2
                        && id.definition().name.to_ascii_lowercase().starts_with(&wanted))
            })
            .ok_or_else(|| Rejection::UnknownGenerator(s.to_string()))
    }
}

/// Static definition of a permanent upgrade bought with Focus Points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusUpgradeDefinition {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    /// Flat cost in Focus Points, the same at every level.
    pub cost: f64,
    pub max_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeId {
    #[serde(rename = "taskEnergyBoost")]
    EfficientTasking,
    #[serde(rename = "gen1Boost")]
    ClickTraining,
    #[serde(rename = "internDiscount")]
    InternReferral,
}

const UPGRADES: [FocusUpgradeDefinition; 3] = [
    FocusUpgradeDefinition {
        id: UpgradeId::EfficientTasking,
        name: "Efficient Tasking",
        description: "Gain +5 base Energy per completed task.",
        cost: 1.0,
        max_level: 5,
    },
    FocusUpgradeDefinition {
        id: UpgradeId::ClickTraining,
        name: "Click Training",
        description: "Manual Click generators produce 2x more Energy.",
        cost: 2.0,
        max_level: 1,
    },
    FocusUpgradeDefinition {
        id: UpgradeId::InternReferral,
        name: "Intern Referral",
        description: "Student Interns are 10% cheaper.",
        cost: 5.0,
        max_level: 1,
    },
];

impl UpgradeId {
    pub const ALL: [UpgradeId; 3] = [
        UpgradeId::EfficientTasking,
        UpgradeId::ClickTraining,
        UpgradeId::InternReferral,
    ];

    pub fn definition(self) -> &'static FocusUpgradeDefinition {
        &UPGRADES[self as usize]
    }

    pub fn key(self) -> &'static str {
        match self {
            UpgradeId::EfficientTasking => "taskEnergyBoost",
            UpgradeId::ClickTraining => "gen1Boost",
            UpgradeId::InternReferral => "internDiscount",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for UpgradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

impl FromStr for UpgradeId {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| {
                id.key().to_ascii_lowercase() == wanted
                    || id.definition().name.to_ascii_lowercase() == wanted
                    || (wanted.len() > 2
                        && id.definition().name.to_ascii_lowercase().starts_with(&wanted))
            })
            .ok_or_else(|| Rejection::UnknownUpgrade(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_line_up_with_ids() {
        for id in GeneratorId::ALL {
            assert_eq!(id.definition().id, id);
            assert!(id.definition().cost_scale > 1.0);
        }
        for id in UpgradeId::ALL {
            assert_eq!(id.definition().id, id);
            assert!(id.definition().max_level >= 1);
        }
    }

    #[test]
    fn keys_round_trip() {
        for id in GeneratorId::ALL {
            assert_eq!(GeneratorId::from_key(id.key()), Some(id));
        }
        for id in UpgradeId::ALL {
            assert_eq!(UpgradeId::from_key(id.key()), Some(id));
        }
        assert_eq!(GeneratorId::from_key("gen9"), None);
    }

    #[test]
    fn parses_keys_and_name_prefixes() {
        assert_eq!("gen2".parse::<GeneratorId>().unwrap(), GeneratorId::StudentIntern);
        assert_eq!("student".parse::<GeneratorId>().unwrap(), GeneratorId::StudentIntern);
        assert_eq!("internDiscount".parse::<UpgradeId>().unwrap(), UpgradeId::InternReferral);
        assert_eq!("click".parse::<UpgradeId>().unwrap(), UpgradeId::ClickTraining);
        assert!("warp drive".parse::<GeneratorId>().is_err());
    }

    #[test]
    fn serde_uses_save_keys() {
        let json = serde_json::to_string(&GeneratorId::CoffeeMachine).unwrap();
        assert_eq!(json, "\"gen3\"");
        let id: UpgradeId = serde_json::from_str("\"gen1Boost\"").unwrap();
        assert_eq!(id, UpgradeId::ClickTraining);
    }
}
