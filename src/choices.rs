//! Closed rating vocabularies shared by every create/update path.

use serde::Serialize;

pub const OBJECTIVE_CHOICES: &[&str] = &[
    "Exceeded objective",
    "Achieved objective",
    "Under-achieved objective",
    "Objective is obsolete or was changed",
];

/// Used for the technical, project, methodology, efficiency and conduct ratings.
pub const ABILITY_CHOICES: &[&str] = &[
    "Exceeds expectations",
    "Meets expectations",
    "Mostly in line",
    "Below expectations",
    "N/A",
];

pub const FEEDBACK_CHOICES: &[&str] = &["Yes", "No"];

/// Exact, case-sensitive membership. Values are never trimmed before the check.
pub fn is_valid_choice(value: &str, choices: &[&str]) -> bool {
    choices.iter().any(|allowed| *allowed == value)
}

#[derive(Debug, Serialize)]
pub struct ChoiceCatalog {
    pub objective: &'static [&'static str],
    pub ability: &'static [&'static str],
    pub feedback: &'static [&'static str],
}

pub const CATALOG: ChoiceCatalog = ChoiceCatalog {
    objective: OBJECTIVE_CHOICES,
    ability: ABILITY_CHOICES,
    feedback: FEEDBACK_CHOICES,
};
