//! Self-assessment lifecycle and the authorization rules gating every mutation.
//!
//! A self-assessment is `Editable` until a final assessment references it,
//! then `Locked` until that final assessment is deleted. The lock is never
//! stored: it is the existence of a `final_assessments` row whose
//! `source_entry_id` points at the entry.

use chrono::Utc;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::identity::{name_key, Identity};
use crate::models::{
    FinalAssessment, FinalAssessmentChanges, NewFinalAssessment, NewSelfAssessment,
    SelfAssessment, SelfAssessmentChanges,
};
use crate::payload::{FinalAssessmentPayload, SelfAssessmentPayload, ValidationError};
use crate::schema::{final_assessments, self_assessments};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

const SELF_ASSESSMENT: &str = "self assessment";
const FINAL_ASSESSMENT: &str = "final assessment";

/// Whether the entry can still be changed by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Editable,
    Locked { final_assessment_id: Uuid },
}

impl EntryState {
    fn from_final(final_assessment_id: Option<Uuid>) -> Self {
        match final_assessment_id {
            Some(final_assessment_id) => Self::Locked {
                final_assessment_id,
            },
            None => Self::Editable,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    pub fn final_assessment_id(&self) -> Option<Uuid> {
        match self {
            Self::Locked {
                final_assessment_id,
            } => Some(*final_assessment_id),
            Self::Editable => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryView {
    pub entry: SelfAssessment,
    pub state: EntryState,
}

#[derive(Debug, Default)]
pub struct Overview {
    pub own: Vec<EntryView>,
    pub managed: Vec<EntryView>,
    pub finals: Vec<FinalAssessment>,
}

pub fn require_identity(actor: Option<&Identity>) -> LifecycleResult<&Identity> {
    match actor {
        Some(identity) if !identity.name.trim().is_empty() => Ok(identity),
        _ => Err(LifecycleError::Unauthenticated),
    }
}

pub fn ensure_owner(entry: &SelfAssessment, actor: &Identity) -> LifecycleResult<()> {
    if actor.is_named(&entry.owner_name) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden(
            "only the owner may change this self assessment",
        ))
    }
}

pub fn ensure_manager(entry: &SelfAssessment, actor: &Identity) -> LifecycleResult<()> {
    if actor.is_named(&entry.manager_name) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden(
            "only the manager can finalize this self assessment",
        ))
    }
}

pub fn ensure_final_manager(final_entry: &FinalAssessment, actor: &Identity) -> LifecycleResult<()> {
    if actor.is_named(&final_entry.manager_name) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden(
            "only the manager may access this final assessment",
        ))
    }
}

fn ensure_editable(state: EntryState) -> LifecycleResult<()> {
    if state.is_locked() {
        Err(LifecycleError::Conflict(
            "self assessment is locked by a final assessment",
        ))
    } else {
        Ok(())
    }
}

/// The final assessment referencing `entry_id`, if any.
pub fn final_assessment_for(
    conn: &mut PgConnection,
    entry_id: Uuid,
) -> QueryResult<Option<Uuid>> {
    final_assessments::table
        .filter(final_assessments::source_entry_id.eq(entry_id))
        .select(final_assessments::id)
        .first(conn)
        .optional()
}

pub fn exists_final_assessment_for(conn: &mut PgConnection, entry_id: Uuid) -> QueryResult<bool> {
    diesel::select(exists(
        final_assessments::table.filter(final_assessments::source_entry_id.eq(entry_id)),
    ))
    .get_result(conn)
}

pub fn entry_state(conn: &mut PgConnection, entry_id: Uuid) -> QueryResult<EntryState> {
    final_assessment_for(conn, entry_id).map(EntryState::from_final)
}

fn load_entry(conn: &mut PgConnection, entry_id: Uuid) -> LifecycleResult<SelfAssessment> {
    self_assessments::table
        .find(entry_id)
        .select(SelfAssessment::as_select())
        .first(conn)
        .optional()?
        .ok_or(LifecycleError::NotFound(SELF_ASSESSMENT))
}

fn load_final(conn: &mut PgConnection, final_id: Uuid) -> LifecycleResult<FinalAssessment> {
    final_assessments::table
        .find(final_id)
        .select(FinalAssessment::as_select())
        .first(conn)
        .optional()?
        .ok_or(LifecycleError::NotFound(FINAL_ASSESSMENT))
}

pub fn owns_any_self_assessment(conn: &mut PgConnection, owner_name: &str) -> QueryResult<bool> {
    diesel::select(exists(
        self_assessments::table
            .filter(self_assessments::owner_key.eq(name_key(owner_name))),
    ))
    .get_result(conn)
}

/// Stores a new entry for `actor`. `manager_name` comes from the directory
/// and is resolved by the caller before a connection is checked out.
pub fn create_self_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    payload: &SelfAssessmentPayload,
    manager_name: String,
) -> LifecycleResult<SelfAssessment> {
    let actor = require_identity(actor)?;
    payload.validate()?;

    let new_entry = NewSelfAssessment::new(actor, manager_name, payload, Utc::now().naive_utc());

    diesel::insert_into(self_assessments::table)
        .values(&new_entry)
        .execute(conn)?;

    let entry = load_entry(conn, new_entry.id)?;
    info!(
        assessment_id = %entry.id,
        owner = %entry.owner_name,
        has_manager = entry.has_manager(),
        "self assessment created"
    );
    Ok(entry)
}

/// Readable by the owner and by the manager named on the entry.
pub fn get_self_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    entry_id: Uuid,
) -> LifecycleResult<EntryView> {
    let actor = require_identity(actor)?;
    let entry = load_entry(conn, entry_id)?;
    if !actor.is_named(&entry.owner_name) && !actor.is_named(&entry.manager_name) {
        return Err(LifecycleError::Forbidden(
            "you are not allowed to access this self assessment",
        ));
    }
    let state = entry_state(conn, entry.id)?;
    Ok(EntryView { entry, state })
}

pub fn update_self_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    entry_id: Uuid,
    payload: &SelfAssessmentPayload,
) -> LifecycleResult<SelfAssessment> {
    let actor = require_identity(actor)?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        let entry = load_entry(conn, entry_id)?;
        ensure_owner(&entry, actor)?;
        ensure_editable(entry_state(conn, entry.id)?)?;
        payload.validate()?;

        let changes = SelfAssessmentChanges::from_payload(payload, Utc::now().naive_utc());
        diesel::update(self_assessments::table.find(entry.id))
            .set(&changes)
            .execute(conn)?;

        let updated = load_entry(conn, entry.id)?;
        info!(assessment_id = %updated.id, actor = %actor.name, "self assessment updated");
        Ok(updated)
    })
}

pub fn delete_self_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    entry_id: Uuid,
) -> LifecycleResult<()> {
    let actor = require_identity(actor)?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        let entry = load_entry(conn, entry_id)?;
        ensure_owner(&entry, actor)?;
        ensure_editable(entry_state(conn, entry.id)?)?;

        match diesel::delete(self_assessments::table.find(entry.id)).execute(conn) {
            Ok(_) => {}
            Err(DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)) => {
                return Err(LifecycleError::Conflict(
                    "self assessment is locked by a final assessment",
                ));
            }
            Err(err) => return Err(err.into()),
        }

        info!(assessment_id = %entry.id, actor = %actor.name, "self assessment deleted");
        Ok(())
    })
}

/// Copies the entry into a new final assessment, which locks the entry.
///
/// The unique constraint on `source_entry_id` is the authoritative guard
/// against two concurrent finalizations; the existence check only provides
/// the early, friendlier answer.
pub fn finalize_self_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    entry_id: Uuid,
) -> LifecycleResult<FinalAssessment> {
    let actor = require_identity(actor)?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        let entry = load_entry(conn, entry_id)?;
        ensure_manager(&entry, actor)?;

        if exists_final_assessment_for(conn, entry.id)? {
            return Err(LifecycleError::Conflict(
                "a final assessment already exists for this self assessment",
            ));
        }

        let snapshot = NewFinalAssessment::snapshot_of(&entry, Utc::now().naive_utc());
        match diesel::insert_into(final_assessments::table)
            .values(&snapshot)
            .execute(conn)
        {
            Ok(_) => {}
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(LifecycleError::Conflict(
                    "a final assessment already exists for this self assessment",
                ));
            }
            Err(err) => return Err(err.into()),
        }

        let final_entry = load_final(conn, snapshot.id)?;
        info!(
            final_assessment_id = %final_entry.id,
            assessment_id = %entry.id,
            manager = %actor.name,
            "self assessment finalized"
        );
        Ok(final_entry)
    })
}

pub fn get_final_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    final_id: Uuid,
) -> LifecycleResult<FinalAssessment> {
    let actor = require_identity(actor)?;
    let final_entry = load_final(conn, final_id)?;
    ensure_final_manager(&final_entry, actor)?;
    Ok(final_entry)
}

pub fn update_final_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    final_id: Uuid,
    payload: &FinalAssessmentPayload,
) -> LifecycleResult<FinalAssessment> {
    let actor = require_identity(actor)?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        let final_entry = load_final(conn, final_id)?;
        ensure_final_manager(&final_entry, actor)?;
        payload.validate()?;

        let changes = FinalAssessmentChanges::from_payload(payload, Utc::now().naive_utc());
        diesel::update(final_assessments::table.find(final_entry.id))
            .set(&changes)
            .execute(conn)?;

        let updated = load_final(conn, final_entry.id)?;
        info!(final_assessment_id = %updated.id, manager = %actor.name, "final assessment updated");
        Ok(updated)
    })
}

/// Removing the final assessment unlocks its source entry again.
pub fn delete_final_assessment(
    conn: &mut PgConnection,
    actor: Option<&Identity>,
    final_id: Uuid,
) -> LifecycleResult<()> {
    let actor = require_identity(actor)?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        let final_entry = load_final(conn, final_id)?;
        ensure_final_manager(&final_entry, actor)?;

        diesel::delete(final_assessments::table.find(final_entry.id)).execute(conn)?;
        info!(
            final_assessment_id = %final_entry.id,
            assessment_id = %final_entry.source_entry_id,
            manager = %actor.name,
            "final assessment deleted"
        );
        Ok(())
    })
}

/// Everything the acting user owns or manages, newest first.
pub fn overview(conn: &mut PgConnection, actor: Option<&Identity>) -> LifecycleResult<Overview> {
    let actor = require_identity(actor)?;
    let key = name_key(&actor.name);

    let own = self_assessments::table
        .left_join(final_assessments::table)
        .filter(self_assessments::owner_key.eq(&key))
        .order(self_assessments::created_at.desc())
        .select((
            SelfAssessment::as_select(),
            final_assessments::id.nullable(),
        ))
        .load::<(SelfAssessment, Option<Uuid>)>(conn)?;

    let managed = self_assessments::table
        .left_join(final_assessments::table)
        .filter(self_assessments::manager_key.eq(&key))
        .filter(self_assessments::owner_key.ne(&key))
        .order(self_assessments::owner_name.asc())
        .select((
            SelfAssessment::as_select(),
            final_assessments::id.nullable(),
        ))
        .load::<(SelfAssessment, Option<Uuid>)>(conn)?;

    let finals = final_assessments::table
        .filter(final_assessments::manager_key.eq(&key))
        .order(final_assessments::created_at.desc())
        .select(FinalAssessment::as_select())
        .load(conn)?;

    let to_view = |(entry, final_id): (SelfAssessment, Option<Uuid>)| EntryView {
        entry,
        state: EntryState::from_final(final_id),
    };

    Ok(Overview {
        own: own.into_iter().map(to_view).collect(),
        managed: managed.into_iter().map(to_view).collect(),
        finals,
    })
}
