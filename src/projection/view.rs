//! Client-side view of a projection with optimistic dismissal
//!
//! A `LocalView` mirrors the window a subscriber received and lets the client
//! hide an order before its mark-read mutation is acknowledged. The hidden set
//! is kept apart from the server window, so rolling back a failed dismissal is
//! just forgetting the hide: nothing has to be patched back in.

use crate::core::order::Order;
use crate::projection::feed::FeedMessage;
use crate::projection::query::SortKey;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dismissal {
    /// Mutation in flight
    Pending,
    /// Mutation succeeded; hidden until the feed reflects it
    Confirmed,
}

/// Local mirror of one subscription
#[derive(Debug, Clone, Default)]
pub struct LocalView {
    sort: SortKey,
    server: Vec<Order>,
    server_unread: usize,
    hidden: HashMap<Uuid, Dismissal>,
}

impl LocalView {
    pub fn new(sort: SortKey) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    /// Fold a feed message into the mirror
    pub fn apply(&mut self, message: &FeedMessage) {
        match message {
            FeedMessage::Snapshot {
                orders,
                unread_count,
                ..
            } => {
                self.server = orders.clone();
                self.server_unread = *unread_count;
            }
            FeedMessage::Diff(diff) => {
                self.server.retain(|o| !diff.removed.contains(&o.id));
                for order in diff.added.iter().chain(&diff.updated) {
                    match self.server.iter_mut().find(|o| o.id == order.id) {
                        Some(existing) => *existing = order.clone(),
                        None => self.server.push(order.clone()),
                    }
                }
                self.server_unread = diff.unread_count;
            }
        }

        let sort = self.sort;
        self.server.sort_by(|a, b| sort.compare(a, b));

        let server = &self.server;
        self.hidden.retain(|id, state| {
            *state == Dismissal::Pending
                || server.iter().any(|o| o.id == *id && !o.is_read)
        });
    }

    /// Hide an order while its mark-read is in flight
    ///
    /// Returns `false` if the order is not in the view.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        if !self.server.iter().any(|o| o.id == id) || self.hidden.contains_key(&id) {
            return false;
        }
        self.hidden.insert(id, Dismissal::Pending);
        true
    }

    /// The mutation behind a dismissal succeeded
    pub fn confirm(&mut self, id: Uuid) {
        if let Some(state) = self.hidden.get_mut(&id) {
            *state = Dismissal::Confirmed;
        }
    }

    /// The mutation failed: show the order again
    pub fn rollback(&mut self, id: Uuid) {
        self.hidden.remove(&id);
    }

    /// Visible orders in sort order
    pub fn orders(&self) -> Vec<&Order> {
        self.server
            .iter()
            .filter(|o| !self.hidden.contains_key(&o.id))
            .collect()
    }

    /// Server count minus unread orders hidden locally
    pub fn unread_count(&self) -> usize {
        let hidden_unread = self
            .server
            .iter()
            .filter(|o| !o.is_read && self.hidden.contains_key(&o.id))
            .count();
        self.server_unread.saturating_sub(hidden_unread)
    }

    pub fn is_hidden(&self, id: &Uuid) -> bool {
        self.hidden.contains_key(id)
    }
}

/// Relative age label, computed at render time and never stored
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created_at).num_seconds();
    if seconds < 60 {
        return "Just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    format!("{}d ago", hours / 24)
}
