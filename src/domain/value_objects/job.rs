use serde::{Deserialize, Serialize};

/// Character class of a party member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
    Warrior,
    Rogue,
    Archer,
    Mage,
}

impl Job {
    pub fn as_str(&self) -> &'static str {
        match self {
            Job::Warrior => "warrior",
            Job::Rogue => "rogue",
            Job::Archer => "archer",
            Job::Mage => "mage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "warrior" => Some(Job::Warrior),
            "rogue" => Some(Job::Rogue),
            "archer" => Some(Job::Archer),
            "mage" => Some(Job::Mage),
            _ => None,
        }
    }
}
