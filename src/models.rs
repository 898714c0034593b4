use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::identity::{name_key, Identity};
use crate::payload::{FinalAssessmentPayload, SelfAssessmentPayload};
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = self_assessments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SelfAssessment {
    pub id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub manager_name: String,
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
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub owner_subject_id: String,
    pub owner_key: String,
    pub manager_key: String,
}

impl SelfAssessment {
    pub fn has_manager(&self) -> bool {
        !self.manager_name.is_empty()
    }

    /// The employee-authored content, as it would be submitted again.
    pub fn content(&self) -> SelfAssessmentPayload {
        SelfAssessmentPayload {
            objective_rating: self.objective_rating.clone(),
            objective_comment: self.objective_comment.clone(),
            technical_rating: self.technical_rating.clone(),
            project_rating: self.project_rating.clone(),
            methodology_rating: self.methodology_rating.clone(),
            abilities_comment: self.abilities_comment.clone(),
            efficiency_collaboration: self.efficiency_collaboration.clone(),
            efficiency_ownership: self.efficiency_ownership.clone(),
            efficiency_resourcefulness: self.efficiency_resourcefulness.clone(),
            efficiency_comment: self.efficiency_comment.clone(),
            conduct_mutual_trust: self.conduct_mutual_trust.clone(),
            conduct_proactivity: self.conduct_proactivity.clone(),
            conduct_leadership: self.conduct_leadership.clone(),
            conduct_comment: self.conduct_comment.clone(),
            general_comments: self.general_comments.clone(),
            feedback_received: self.feedback_received.clone(),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = self_assessments)]
pub struct NewSelfAssessment {
    pub id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_subject_id: String,
    pub owner_key: String,
    pub manager_name: String,
    pub manager_key: String,
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
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewSelfAssessment {
    pub fn new(
        owner: &Identity,
        manager_name: String,
        payload: &SelfAssessmentPayload,
        now: NaiveDateTime,
    ) -> Self {
        let content = payload.clone();
        Self {
            id: Uuid::new_v4(),
            owner_name: owner.name.clone(),
            owner_email: owner.email.clone(),
            owner_subject_id: owner.subject_id.clone(),
            owner_key: name_key(&owner.name),
            manager_key: name_key(&manager_name),
            manager_name,
            objective_rating: content.objective_rating,
            objective_comment: content.objective_comment,
            technical_rating: content.technical_rating,
            project_rating: content.project_rating,
            methodology_rating: content.methodology_rating,
            abilities_comment: content.abilities_comment,
            efficiency_collaboration: content.efficiency_collaboration,
            efficiency_ownership: content.efficiency_ownership,
            efficiency_resourcefulness: content.efficiency_resourcefulness,
            efficiency_comment: content.efficiency_comment,
            conduct_mutual_trust: content.conduct_mutual_trust,
            conduct_proactivity: content.conduct_proactivity,
            conduct_leadership: content.conduct_leadership,
            conduct_comment: content.conduct_comment,
            general_comments: content.general_comments,
            feedback_received: content.feedback_received,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Every owner-mutable column. Identity and manager columns are not part of it.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = self_assessments)]
pub struct SelfAssessmentChanges<'a> {
    pub objective_rating: &'a str,
    pub objective_comment: &'a str,
    pub technical_rating: &'a str,
    pub project_rating: &'a str,
    pub methodology_rating: &'a str,
    pub abilities_comment: &'a str,
    pub efficiency_collaboration: &'a str,
    pub efficiency_ownership: &'a str,
    pub efficiency_resourcefulness: &'a str,
    pub efficiency_comment: &'a str,
    pub conduct_mutual_trust: &'a str,
    pub conduct_proactivity: &'a str,
    pub conduct_leadership: &'a str,
    pub conduct_comment: &'a str,
    pub general_comments: &'a str,
    pub feedback_received: &'a str,
    pub updated_at: NaiveDateTime,
}

impl<'a> SelfAssessmentChanges<'a> {
    pub fn from_payload(payload: &'a SelfAssessmentPayload, now: NaiveDateTime) -> Self {
        Self {
            objective_rating: &payload.objective_rating,
            objective_comment: &payload.objective_comment,
            technical_rating: &payload.technical_rating,
            project_rating: &payload.project_rating,
            methodology_rating: &payload.methodology_rating,
            abilities_comment: &payload.abilities_comment,
            efficiency_collaboration: &payload.efficiency_collaboration,
            efficiency_ownership: &payload.efficiency_ownership,
            efficiency_resourcefulness: &payload.efficiency_resourcefulness,
            efficiency_comment: &payload.efficiency_comment,
            conduct_mutual_trust: &payload.conduct_mutual_trust,
            conduct_proactivity: &payload.conduct_proactivity,
            conduct_leadership: &payload.conduct_leadership,
            conduct_comment: &payload.conduct_comment,
            general_comments: &payload.general_comments,
            feedback_received: &payload.feedback_received,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = final_assessments)]
#[diesel(belongs_to(SelfAssessment, foreign_key = source_entry_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FinalAssessment {
    pub id: Uuid,
    pub source_entry_id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub manager_name: String,
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
    pub manager_objective_comment: String,
    pub manager_abilities_comment: String,
    pub manager_efficiency_comment: String,
    pub manager_general_comments: String,
    pub goals_next_period: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub owner_subject_id: String,
    pub manager_key: String,
}

/// Frozen copy of a self-assessment with empty manager fields.
#[derive(Debug, Insertable)]
#[diesel(table_name = final_assessments)]
pub struct NewFinalAssessment {
    pub id: Uuid,
    pub source_entry_id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_subject_id: String,
    pub manager_name: String,
    pub manager_key: String,
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
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewFinalAssessment {
    pub fn snapshot_of(source: &SelfAssessment, now: NaiveDateTime) -> Self {
        let source = source.clone();
        Self {
            id: Uuid::new_v4(),
            source_entry_id: source.id,
            owner_name: source.owner_name,
            owner_email: source.owner_email,
            owner_subject_id: source.owner_subject_id,
            manager_name: source.manager_name,
            manager_key: source.manager_key,
            objective_rating: source.objective_rating,
            objective_comment: source.objective_comment,
            technical_rating: source.technical_rating,
            project_rating: source.project_rating,
            methodology_rating: source.methodology_rating,
            abilities_comment: source.abilities_comment,
            efficiency_collaboration: source.efficiency_collaboration,
            efficiency_ownership: source.efficiency_ownership,
            efficiency_resourcefulness: source.efficiency_resourcefulness,
            efficiency_comment: source.efficiency_comment,
            conduct_mutual_trust: source.conduct_mutual_trust,
            conduct_proactivity: source.conduct_proactivity,
            conduct_leadership: source.conduct_leadership,
            conduct_comment: source.conduct_comment,
            general_comments: source.general_comments,
            feedback_received: source.feedback_received,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = final_assessments)]
pub struct FinalAssessmentChanges<'a> {
    pub manager_objective_comment: &'a str,
    pub manager_abilities_comment: &'a str,
    pub manager_efficiency_comment: &'a str,
    pub manager_general_comments: &'a str,
    pub goals_next_period: &'a str,
    pub updated_at: NaiveDateTime,
}

impl<'a> FinalAssessmentChanges<'a> {
    pub fn from_payload(payload: &'a FinalAssessmentPayload, now: NaiveDateTime) -> Self {
        Self {
            manager_objective_comment: &payload.manager_objective_comment,
            manager_abilities_comment: &payload.manager_abilities_comment,
            manager_efficiency_comment: &payload.manager_efficiency_comment,
            manager_general_comments: &payload.manager_general_comments,
            goals_next_period: &payload.goals_next_period,
            updated_at: now,
        }
    }
}
