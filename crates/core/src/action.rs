//! Actions performed by players that jobs pay for.

use serde::{Deserialize, Serialize};

/// Kind of action detected by the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Break,
    Place,
    Kill,
    Fish,
    Craft,
    Smelt,
    Brew,
    Enchant,
    Repair,
    Breed,
    Tame,
    Dye,
    Shear,
    Milk,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Break => "break",
            ActionKind::Place => "place",
            ActionKind::Kill => "kill",
            ActionKind::Fish => "fish",
            ActionKind::Craft => "craft",
            ActionKind::Smelt => "smelt",
            ActionKind::Brew => "brew",
            ActionKind::Enchant => "enchant",
            ActionKind::Repair => "repair",
            ActionKind::Breed => "breed",
            ActionKind::Tame => "tame",
            ActionKind::Dye => "dye",
            ActionKind::Shear => "shear",
            ActionKind::Milk => "milk",
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One performed action: what was done, to what.
///
/// `target` is the host's name for the thing acted upon (`"stone"`,
/// `"zombie"`). `sub_target` refines it (a data value, a variant) when the
/// host knows one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionInfo {
    pub kind: ActionKind,
    pub target: String,
    pub sub_target: Option<String>,
}

impl ActionInfo {
    pub fn new(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            sub_target: None,
        }
    }

    pub fn with_sub_target(mut self, sub: impl Into<String>) -> Self {
        self.sub_target = Some(sub.into());
        self
    }

    /// Lowercased bare target name.
    pub fn target_key(&self) -> String {
        self.target.trim().to_lowercase()
    }

    /// Lowercased `target:sub` name, when a sub-target is present.
    pub fn qualified_key(&self) -> Option<String> {
        self.sub_target
            .as_ref()
            .map(|sub| format!("{}:{}", self.target_key(), sub.trim().to_lowercase()))
    }
}

impl core::fmt::Display for ActionInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.sub_target {
            Some(sub) => write!(f, "{} {}:{}", self.kind, self.target, sub),
            None => write!(f, "{} {}", self.kind, self.target),
        }
    }
}
