mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::http::StatusCode;
use chrono::Utc;
use common::{acquire_db_lock, complete_self_assessment, read_json, TestApp};
use diesel::prelude::*;
use employee_dialogue::identity::Identity;
use employee_dialogue::lifecycle::{self, LifecycleError};
use employee_dialogue::models::{NewFinalAssessment, SelfAssessment};
use employee_dialogue::schema::final_assessments;
use serde_json::Value;
use uuid::Uuid;

fn alice() -> Identity {
    Identity::new("sub-alice", "Alice", "alice@example.com")
}

fn bob() -> Identity {
    Identity::new("sub-bob", "Bob", "bob@example.com")
}

/// Alice's entry, managed by Bob, loaded straight from the store.
async fn stored_entry(app: &TestApp) -> Result<SelfAssessment> {
    app.set_manager("Alice", "Bob").await;
    let token = app.login_token("Alice", "alice@example.com").await?;
    let response = app
        .post_json("/api/self-assessments", &complete_self_assessment(), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = read_json(response).await?;
    let id: Uuid = created["id"]
        .as_str()
        .context("created entry has no id")?
        .parse()?;

    let mut conn = app.connection()?;
    let view = lifecycle::get_self_assessment(&mut conn, Some(&alice()), id)?;
    Ok(view.entry)
}

/// Inserts a final assessment for `entry` in a transaction that stays open
/// for `hold` after the insert. Returns once the row is written but not committed.
async fn finalize_in_open_transaction(
    app: &TestApp,
    entry: &SelfAssessment,
    hold: Duration,
) -> Result<thread::JoinHandle<Result<()>>> {
    let mut conn = app.connection()?;
    let snapshot = NewFinalAssessment::snapshot_of(entry, Utc::now().naive_utc());
    let (inserted_tx, inserted_rx) = mpsc::channel();

    let holder = thread::spawn(move || -> Result<()> {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(final_assessments::table)
                .values(&snapshot)
                .execute(conn)?;
            let _ = inserted_tx.send(());
            thread::sleep(hold);
            Ok(())
        })?;
        Ok(())
    });

    tokio::task::spawn_blocking(move || inserted_rx.recv())
        .await
        .context("wait task panicked")?
        .map_err(|_| anyhow!("concurrent insert never happened"))?;
    Ok(holder)
}

#[tokio::test]
async fn concurrent_finalize_is_rejected_by_the_unique_source() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let entry = stored_entry(&app).await?;

    let holder = finalize_in_open_transaction(&app, &entry, Duration::from_millis(300)).await?;

    // The existence check cannot see the uncommitted row, so only the constraint can stop this.
    let mut conn = app.connection()?;
    let entry_id = entry.id;
    let outcome = tokio::task::spawn_blocking(move || {
        lifecycle::finalize_self_assessment(&mut conn, Some(&bob()), entry_id)
    })
    .await
    .context("finalize task panicked")?;

    holder
        .join()
        .map_err(|_| anyhow!("holder thread panicked"))??;

    assert!(
        matches!(outcome, Err(LifecycleError::Conflict(_))),
        "expected a conflict, got {outcome:?}"
    );
    assert_eq!(app.count_rows("final_assessments").await?, 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn delete_racing_a_finalize_is_rejected_by_the_reference() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let entry = stored_entry(&app).await?;

    let holder = finalize_in_open_transaction(&app, &entry, Duration::from_millis(300)).await?;

    let mut conn = app.connection()?;
    let entry_id = entry.id;
    let outcome = tokio::task::spawn_blocking(move || {
        lifecycle::delete_self_assessment(&mut conn, Some(&alice()), entry_id)
    })
    .await
    .context("delete task panicked")?;

    holder
        .join()
        .map_err(|_| anyhow!("holder thread panicked"))??;

    assert!(
        matches!(outcome, Err(LifecycleError::Conflict(_))),
        "expected a conflict, got {outcome:?}"
    );
    assert_eq!(app.count_rows("self_assessments").await?, 1);
    assert_eq!(app.count_rows("final_assessments").await?, 1);

    app.cleanup().await?;
    Ok(())
}
