//! Breakdown repository for database operations

use sqlx::{QueryBuilder, Sqlite};

use crate::db::connection::DatabasePool;
use crate::db::models::{format_timestamp, BreakdownRow};
use crate::store::{TicketFilter, TicketPatch};
use crate::ticket::Stage;

const NEWEST_FIRST: &str = " ORDER BY open_at DESC, breakdown_id DESC";

/// Breakdown repository for managing breakdown database operations
pub struct BreakdownRepository;

fn stage_column(stage: Stage) -> &'static str {
    match stage {
        Stage::Open => "open_at",
        Stage::Temporary => "temporary_at",
        Stage::Closure => "closure_at",
        Stage::Approval => "approval_at",
    }
}

/// Append a WHERE clause for `filter`
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(ref id) = filter.ticket_id {
        qb.push(" AND breakdown_id = ").push_bind(id.clone());
    }
    if let Some(ref owner) = filter.owner_id {
        qb.push(" AND user_id = ").push_bind(owner.clone());
    }
    for stage in &filter.stamped {
        qb.push(" AND ").push(stage_column(*stage)).push(" IS NOT NULL");
    }
    for stage in &filter.unstamped {
        qb.push(" AND ").push(stage_column(*stage)).push(" IS NULL");
    }
}

/// Append `rowid = (<newest matching rowid>)`
fn push_newest_rowid(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TicketFilter) {
    qb.push(" WHERE rowid = (SELECT rowid FROM breakdowns");
    push_filter(qb, filter);
    qb.push(NEWEST_FIRST).push(" LIMIT 1)");
}

macro_rules! set_column {
    ($set:ident, $column:literal, $value:expr) => {
        if let Some(value) = $value {
            $set.push(concat!($column, " = "));
            $set.push_bind_unseparated(value);
        }
    };
}

/// Append the SET list for `patch`. The patch must not be empty.
fn push_assignments(qb: &mut QueryBuilder<'_, Sqlite>, patch: &TicketPatch) {
    let mut set = qb.separated(", ");
    set_column!(set, "machine_id", patch.machine_id.clone());
    set_column!(set, "machine_family", patch.machine_family.clone());
    set_column!(set, "breakdown_type", patch.breakdown_type.clone());
    set_column!(set, "production_stopped", patch.production_stopped);
    set_column!(set, "problem_description", patch.problem_description.clone());
    set_column!(set, "open_media_url", patch.open_media_url.clone());

    set_column!(set, "temporary_maintenance_id", patch.temporary_maintenance_id.clone());
    set_column!(set, "corrective_action", patch.corrective_action.clone());
    set_column!(set, "spare_used", patch.spare_used.clone());
    set_column!(set, "temporary_approved", patch.temporary_approved);

    set_column!(set, "closure_maintenance_id", patch.closure_maintenance_id.clone());
    set_column!(set, "analysis_report", patch.analysis_report.clone());
    set_column!(set, "closure_media_url", patch.closure_media_url.clone());
    set_column!(set, "closure_approved", patch.closure_approved);

    set_column!(set, "approval_id", patch.approval_id.clone());
    set_column!(
        set,
        "approval_status",
        patch.approval_status.map(|s| s.as_str().to_string())
    );
    set_column!(set, "approval_approved", patch.approval_approved);

    set_column!(set, "open_at", patch.open_at.map(format_timestamp));
    set_column!(set, "temporary_at", patch.temporary_at.map(format_timestamp));
    set_column!(set, "closure_at", patch.closure_at.map(format_timestamp));
    set_column!(set, "approval_at", patch.approval_at.map(format_timestamp));
}

impl BreakdownRepository {
    /// Insert a new breakdown row
    pub async fn insert(pool: &DatabasePool, row: &BreakdownRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO breakdowns (
                breakdown_id, user_id, open_at, temporary_at, closure_at, approval_at,
                machine_id, machine_family, breakdown_type, production_stopped,
                problem_description, open_media_url,
                temporary_maintenance_id, corrective_action, spare_used, temporary_approved,
                closure_maintenance_id, analysis_report, closure_media_url, closure_approved,
                approval_id, approval_status, approval_approved
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.breakdown_id)
        .bind(&row.user_id)
        .bind(&row.open_at)
        .bind(&row.temporary_at)
        .bind(&row.closure_at)
        .bind(&row.approval_at)
        .bind(&row.machine_id)
        .bind(&row.machine_family)
        .bind(&row.breakdown_type)
        .bind(row.production_stopped)
        .bind(&row.problem_description)
        .bind(&row.open_media_url)
        .bind(&row.temporary_maintenance_id)
        .bind(&row.corrective_action)
        .bind(&row.spare_used)
        .bind(row.temporary_approved)
        .bind(&row.closure_maintenance_id)
        .bind(&row.analysis_report)
        .bind(&row.closure_media_url)
        .bind(row.closure_approved)
        .bind(&row.approval_id)
        .bind(&row.approval_status)
        .bind(row.approval_approved)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Apply `patch` to the newest row matching `filter` in a single statement
    ///
    /// Returns the updated row, or `None` when no row matched. An empty patch
    /// behaves like [`BreakdownRepository::find_one`].
    pub async fn update_matching(
        pool: &DatabasePool,
        filter: &TicketFilter,
        patch: &TicketPatch,
    ) -> Result<Option<BreakdownRow>, sqlx::Error> {
        if patch.is_empty() {
            return Self::find_one(pool, filter).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE breakdowns SET ");
        push_assignments(&mut qb, patch);
        push_newest_rowid(&mut qb, filter);
        qb.push(" RETURNING *");

        tracing::debug!(sql = qb.sql(), "update breakdown");
        qb.build_query_as::<BreakdownRow>()
            .fetch_optional(pool)
            .await
    }

    /// Newest row matching `filter`
    pub async fn find_one(
        pool: &DatabasePool,
        filter: &TicketFilter,
    ) -> Result<Option<BreakdownRow>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM breakdowns");
        push_filter(&mut qb, filter);
        qb.push(NEWEST_FIRST).push(" LIMIT 1");

        qb.build_query_as::<BreakdownRow>()
            .fetch_optional(pool)
            .await
    }

    /// All rows matching `filter`, newest first
    pub async fn find_many(
        pool: &DatabasePool,
        filter: &TicketFilter,
    ) -> Result<Vec<BreakdownRow>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM breakdowns");
        push_filter(&mut qb, filter);
        qb.push(NEWEST_FIRST);

        qb.build_query_as::<BreakdownRow>().fetch_all(pool).await
    }

    /// Delete the newest row matching `filter`. Returns the number of rows removed.
    pub async fn delete_matching(
        pool: &DatabasePool,
        filter: &TicketFilter,
    ) -> Result<u64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM breakdowns");
        push_newest_rowid(&mut qb, filter);

        let result = qb.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Count total breakdowns
    pub async fn count(pool: &DatabasePool) -> Result<i64, sqlx::Error> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM breakdowns")
            .fetch_one(pool)
            .await?;
        Ok(result.0)
    }
}
