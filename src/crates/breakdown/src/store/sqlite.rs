//! SQLite-backed ticket store

use async_trait::async_trait;

use super::{StoreError, StoreResult, TicketFilter, TicketPatch, TicketStore};
use crate::db::models::BreakdownRow;
use crate::db::repositories::BreakdownRepository;
use crate::db::{DatabaseConnection, DatabaseError};
use crate::ticket::Ticket;

/// Ticket store persisting to the `breakdowns` table
#[derive(Clone)]
pub struct SqliteTicketStore {
    db: DatabaseConnection,
}

impl SqliteTicketStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_ticket(row: BreakdownRow) -> StoreResult<Ticket> {
    let id = row.breakdown_id.clone();
    row.into_ticket()
        .map_err(|reason| StoreError::Corrupt { id, reason })
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn insert(&self, ticket: &Ticket) -> StoreResult<()> {
        let row = BreakdownRow::from_ticket(ticket);
        match BreakdownRepository::insert(self.db.pool(), &row).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let err = DatabaseError::from(err);
                if err.is_constraint_violation() {
                    Err(StoreError::Duplicate(ticket.ticket_id.clone()))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn find_one_and_update(
        &self,
        filter: &TicketFilter,
        patch: &TicketPatch,
    ) -> StoreResult<Option<Ticket>> {
        BreakdownRepository::update_matching(self.db.pool(), filter, patch)
            .await
            .map_err(DatabaseError::from)?
            .map(to_ticket)
            .transpose()
    }

    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>> {
        BreakdownRepository::find_one(self.db.pool(), filter)
            .await
            .map_err(DatabaseError::from)?
            .map(to_ticket)
            .transpose()
    }

    async fn find_many(&self, filter: &TicketFilter) -> StoreResult<Vec<Ticket>> {
        BreakdownRepository::find_many(self.db.pool(), filter)
            .await
            .map_err(DatabaseError::from)?
            .into_iter()
            .map(to_ticket)
            .collect()
    }

    async fn delete_one(&self, filter: &TicketFilter) -> StoreResult<bool> {
        let removed = BreakdownRepository::delete_matching(self.db.pool(), filter)
            .await
            .map_err(DatabaseError::from)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{OpenForm, Stage};
    use chrono::{SubsecRound, Utc};

    async fn store() -> SqliteTicketStore {
        let db = DatabaseConnection::with_max_connections("sqlite::memory:", 1)
            .await
            .unwrap();
        db.run_migrations().await.unwrap();
        SqliteTicketStore::new(db)
    }

    fn ticket() -> Ticket {
        Ticket::open(
            "U1",
            OpenForm {
                machine_id: "M-12".to_string(),
                ..Default::default()
            },
            Utc::now().trunc_subsecs(6),
        )
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        let store = store().await;
        let t = ticket();
        store.insert(&t).await.unwrap();
        let err = store.insert(&t).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == t.ticket_id));
    }

    #[tokio::test]
    async fn test_update_returns_ticket() {
        let store = store().await;
        let t = ticket();
        store.insert(&t).await.unwrap();

        let at = Utc::now().trunc_subsecs(6);
        let patch = TicketPatch {
            temporary_maintenance_id: Some("MNT-2023-001".to_string()),
            corrective_action: Some("replaced belt".to_string()),
            temporary_approved: Some(true),
            ..Default::default()
        }
        .stamp(Stage::Temporary, at);
        let filter = TicketFilter::by_id(&t.ticket_id)
            .with_owner("U1")
            .excludes(Stage::Temporary);

        let updated = store.find_one_and_update(&filter, &patch).await.unwrap().unwrap();
        let temporary = updated.temporary_form.unwrap();
        assert_eq!(temporary.corrective_action, "replaced belt");
        assert_eq!(temporary.spare_used, "");
        assert!(temporary.approved);
        assert_eq!(updated.timestamps.temporary, Some(at));

        // The stage is now stamped, so the same guarded update no longer matches.
        assert!(store.find_one_and_update(&filter, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_matches_memory_store_semantics() {
        let sql = store().await;
        let memory = crate::store::MemoryTicketStore::new();
        let t = ticket();
        sql.insert(&t).await.unwrap();
        memory.insert(&t).await.unwrap();

        let patch = TicketPatch {
            approval_id: Some("APPR-2023-001".to_string()),
            ..Default::default()
        }
        .stamp(Stage::Approval, Utc::now().trunc_subsecs(6));
        let filter = TicketFilter::by_id(&t.ticket_id);

        let from_sql = sql.find_one_and_update(&filter, &patch).await.unwrap();
        let from_memory = memory.find_one_and_update(&filter, &patch).await.unwrap();
        assert_eq!(from_sql, from_memory);
    }
}
