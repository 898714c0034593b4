use serde::Deserialize;
use thiserror::Error;

use crate::choices::{is_valid_choice, ABILITY_CHOICES, FEEDBACK_CHOICES, OBJECTIVE_CHOICES};

/// The first field of a payload that failed its check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn invalid_choice(field: &'static str) -> Self {
        Self {
            field,
            message: "must be one of the allowed options".to_string(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self {
            field,
            message: "must not be empty".to_string(),
        }
    }
}

fn check_choice(field: &'static str, value: &str, choices: &[&str]) -> Result<(), ValidationError> {
    if is_valid_choice(value, choices) {
        Ok(())
    } else {
        Err(ValidationError::invalid_choice(field))
    }
}

fn check_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::required(field))
    } else {
        Ok(())
    }
}

/// Employee-authored content of a self-assessment. Missing JSON keys
/// deserialize as empty strings so they surface as a named validation failure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelfAssessmentPayload {
    pub objective_rating: String,
    pub objective_comment: String,
    pub technical_rating: String,
    pub project_rating: String,
    pub methodology_rating: String,
    pub abilities_comment: String,
    pub efficiency_collaboration: String,
    pub efficiency_ownership: String,
    pub efficiency_resourcefulness: String,
    pub efficiency_comment: String,
    pub conduct_mutual_trust: String,
    pub conduct_proactivity: String,
    pub conduct_leadership: String,
    pub conduct_comment: String,
    pub general_comments: String,
    pub feedback_received: String,
}

impl SelfAssessmentPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_choice("objective_rating", &self.objective_rating, OBJECTIVE_CHOICES)?;
        check_required("objective_comment", &self.objective_comment)?;

        check_choice("technical_rating", &self.technical_rating, ABILITY_CHOICES)?;
        check_choice("project_rating", &self.project_rating, ABILITY_CHOICES)?;
        check_choice("methodology_rating", &self.methodology_rating, ABILITY_CHOICES)?;
        check_required("abilities_comment", &self.abilities_comment)?;

        check_choice(
            "efficiency_collaboration",
            &self.efficiency_collaboration,
            ABILITY_CHOICES,
        )?;
        check_choice(
            "efficiency_ownership",
            &self.efficiency_ownership,
            ABILITY_CHOICES,
        )?;
        check_choice(
            "efficiency_resourcefulness",
            &self.efficiency_resourcefulness,
            ABILITY_CHOICES,
        )?;
        check_required("efficiency_comment", &self.efficiency_comment)?;

        check_choice(
            "conduct_mutual_trust",
            &self.conduct_mutual_trust,
            ABILITY_CHOICES,
        )?;
        check_choice(
            "conduct_proactivity",
            &self.conduct_proactivity,
            ABILITY_CHOICES,
        )?;
        check_choice(
            "conduct_leadership",
            &self.conduct_leadership,
            ABILITY_CHOICES,
        )?;
        check_required("conduct_comment", &self.conduct_comment)?;

        check_required("general_comments", &self.general_comments)?;
        check_choice(
            "feedback_received",
            &self.feedback_received,
            FEEDBACK_CHOICES,
        )?;

        Ok(())
    }
}

/// Manager-authored review fields. Free text, every one required.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FinalAssessmentPayload {
    pub manager_objective_comment: String,
    pub manager_abilities_comment: String,
    pub manager_efficiency_comment: String,
    pub manager_general_comments: String,
    pub goals_next_period: String,
}

impl FinalAssessmentPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required("manager_objective_comment", &self.manager_objective_comment)?;
        check_required("manager_abilities_comment", &self.manager_abilities_comment)?;
        check_required(
            "manager_efficiency_comment",
            &self.manager_efficiency_comment,
        )?;
        check_required("manager_general_comments", &self.manager_general_comments)?;
        check_required("goals_next_period", &self.goals_next_period)?;
        Ok(())
    }
}
