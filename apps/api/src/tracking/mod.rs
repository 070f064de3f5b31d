//! Application tracking: applications created from the jobs page and the
//! status board built from them.

pub mod handlers;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::workflow::Workspace;

/// Fields of an application taken from the workspace at confirmation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub url: Option<String>,
    pub title: String,
    pub company: String,
}

impl NewApplication {
    /// Requires a current job and a match that is still valid for it.
    pub fn from_workspace(ws: &Workspace, url: Option<String>) -> Result<Self, AppError> {
        let job = ws.job().ok_or(AppError::MatchRequired)?;
        ws.current_match().ok_or(AppError::MatchRequired)?;

        Ok(Self {
            url: url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            title: job.role.clone(),
            company: job.company_or_unknown().to_string(),
        })
    }
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    application: NewApplication,
) -> Result<ApplicationRow, AppError> {
    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications (id, user_id, url, title, company, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&application.url)
    .bind(&application.title)
    .bind(&application.company)
    .bind(ApplicationStatus::Applied.as_str())
    .fetch_one(db)
    .await?;

    info!(
        "Tracked application {} ({} at {}) for user {user_id}",
        row.id, row.title, row.company
    );
    Ok(row)
}

pub async fn get(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<ApplicationRow, AppError> {
    sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// Moves an application to any status. Notes are replaced only when given.
pub async fn set_status(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    status: ApplicationStatus,
    notes: Option<String>,
) -> Result<ApplicationRow, AppError> {
    let current = get(db, user_id, id).await?.status();
    if !current.is_nominal_transition(status) && current != status {
        debug!(
            "Application {id} moved {} -> {} outside the usual progression",
            current.as_str(),
            status.as_str()
        );
    }

    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications
        SET status = $1, notes = COALESCE($2, notes), updated_at = now()
        WHERE id = $3 AND user_id = $4
        RETURNING *
        "#,
    )
    .bind(status.as_str())
    .bind(notes)
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;

    Ok(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Application {id} not found")));
    }
    Ok(())
}

/// All of the user's applications, newest first.
pub async fn list(db: &PgPool, user_id: Uuid) -> Result<Vec<ApplicationRow>, AppError> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?)
}

#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub status: ApplicationStatus,
    pub count: usize,
    pub applications: Vec<ApplicationRow>,
}

/// Status columns plus the dashboard totals.
#[derive(Debug, Serialize)]
pub struct Board {
    pub total: usize,
    /// Applications created in the seven days before `now`.
    pub this_week: usize,
    pub columns: Vec<BoardColumn>,
}

/// Groups rows into the fixed status columns, keeping their order within each.
pub fn board(rows: Vec<ApplicationRow>, now: DateTime<Utc>) -> Board {
    let week_ago = now - Duration::days(7);
    let total = rows.len();
    let this_week = rows.iter().filter(|r| r.created_at >= week_ago).count();

    let mut columns: Vec<BoardColumn> = ApplicationStatus::ALL
        .iter()
        .map(|&status| BoardColumn {
            status,
            count: 0,
            applications: Vec::new(),
        })
        .collect();

    for row in rows {
        let status = row.status();
        if let Some(column) = columns.iter_mut().find(|c| c.status == status) {
            column.applications.push(row);
            column.count += 1;
        }
    }
    Board {
        total,
        this_week,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::matching::{MatchResult, MatchSummary, MatchTier};
    use crate::workflow::test_support::ready_workspace;

    fn row(title: &str, status: &str) -> ApplicationRow {
        ApplicationRow {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            url: None,
            title: title.to_string(),
            company: "Acme".to_string(),
            status: status.to_string(),
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stored_match(ws: &mut Workspace) {
        let key = ws.live_key().unwrap();
        ws.store_match(
            key,
            MatchResult {
                match_percentage: 100.0,
                match_level: "Excellent Match".to_string(),
                tier: MatchTier::Excellent,
                matched_skills: vec![],
                missing_skills: vec![],
                bonus_skills: vec![],
                summary: MatchSummary::default(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_board_columns_in_fixed_order() {
        let columns = board(
            vec![
                row("a", "offer"),
                row("b", "applied"),
                row("c", "applied"),
                row("d", "withdrawn"),
            ],
            Utc::now(),
        )
        .columns;
        let statuses: Vec<_> = columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, ApplicationStatus::ALL.to_vec());
        assert_eq!(columns[0].count, 2);
        assert_eq!(columns[0].applications[0].title, "b");
        assert_eq!(columns[0].applications[1].title, "c");
        assert_eq!(columns[1].count, 0);
        assert_eq!(columns[2].applications[0].title, "a");
        assert_eq!(columns[4].count, 1);
    }

    #[test]
    fn test_board_places_unknown_status_under_applied() {
        let columns = board(vec![row("legacy", "")], Utc::now()).columns;
        assert_eq!(columns[0].applications[0].title, "legacy");
    }

    #[test]
    fn test_board_counts_total_and_last_seven_days() {
        let now = Utc::now();
        let mut old = row("old", "rejected");
        old.created_at = now - Duration::days(8);
        let mut edge = row("edge", "applied");
        edge.created_at = now - Duration::days(7);

        let board = board(vec![row("new", "applied"), edge, old], now);
        assert_eq!(board.total, 3);
        assert_eq!(board.this_week, 2);
    }

    #[test]
    fn test_new_application_needs_current_match() {
        let ws = ready_workspace(&["Go"], &["Go"]);
        let err = NewApplication::from_workspace(&ws, None).unwrap_err();
        assert!(matches!(err, AppError::MatchRequired));
    }

    #[test]
    fn test_new_application_from_job() {
        let mut ws = ready_workspace(&["Go"], &["Go"]);
        stored_match(&mut ws);

        let app =
            NewApplication::from_workspace(&ws, Some(" https://jobs.example.com/1 ".into())).unwrap();
        assert_eq!(
            app,
            NewApplication {
                url: Some("https://jobs.example.com/1".to_string()),
                title: "Backend Engineer".to_string(),
                company: "Acme".to_string(),
            }
        );
    }

    #[test]
    fn test_new_application_without_company() {
        let mut ws = ready_workspace(&["Go"], &["Go"]);
        let mut job = ws.job().cloned().unwrap();
        job.company = None;
        ws.set_job(job);
        stored_match(&mut ws);

        let app = NewApplication::from_workspace(&ws, None).unwrap();
        assert_eq!(app.company, "Unknown Company");
        assert_eq!(app.url, None);
    }
}
