//! In-process ticket store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{StoreError, StoreResult, TicketFilter, TicketPatch, TicketStore};
use crate::ticket::Ticket;

/// Ticket store held in memory behind a lock
///
/// Every operation runs under a single lock acquisition, which gives
/// `find_one_and_update` the same atomicity as the SQL store.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    tickets: RwLock<HashMap<String, Ticket>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.read().is_empty()
    }
}

fn newest_first(tickets: &mut [&Ticket]) {
    tickets.sort_by(|a, b| {
        b.timestamps
            .open
            .cmp(&a.timestamps.open)
            .then_with(|| b.ticket_id.cmp(&a.ticket_id))
    });
}

fn newest_match<'a>(
    tickets: &'a HashMap<String, Ticket>,
    filter: &TicketFilter,
) -> Option<&'a Ticket> {
    let mut matching: Vec<&Ticket> = tickets.values().filter(|t| filter.matches(t)).collect();
    newest_first(&mut matching);
    matching.into_iter().next()
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn insert(&self, ticket: &Ticket) -> StoreResult<()> {
        let mut tickets = self.tickets.write();
        if tickets.contains_key(&ticket.ticket_id) {
            return Err(StoreError::Duplicate(ticket.ticket_id.clone()));
        }
        tickets.insert(ticket.ticket_id.clone(), ticket.clone());
        Ok(())
    }

    async fn find_one_and_update(
        &self,
        filter: &TicketFilter,
        patch: &TicketPatch,
    ) -> StoreResult<Option<Ticket>> {
        let mut tickets = self.tickets.write();
        let Some(id) = newest_match(&tickets, filter).map(|t| t.ticket_id.clone()) else {
            return Ok(None);
        };
        Ok(tickets.get_mut(&id).map(|ticket| {
            patch.apply(ticket);
            ticket.clone()
        }))
    }

    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>> {
        let tickets = self.tickets.read();
        Ok(newest_match(&tickets, filter).cloned())
    }

    async fn find_many(&self, filter: &TicketFilter) -> StoreResult<Vec<Ticket>> {
        let tickets = self.tickets.read();
        let mut matching: Vec<&Ticket> = tickets.values().filter(|t| filter.matches(t)).collect();
        newest_first(&mut matching);
        Ok(matching.into_iter().cloned().collect())
    }

    async fn delete_one(&self, filter: &TicketFilter) -> StoreResult<bool> {
        let mut tickets = self.tickets.write();
        let Some(id) = newest_match(&tickets, filter).map(|t| t.ticket_id.clone()) else {
            return Ok(false);
        };
        Ok(tickets.remove(&id).is_some())
    }
}
