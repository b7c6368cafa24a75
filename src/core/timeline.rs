//! Append-only audit trail of an order
//!
//! Each accepted transition contributes exactly one [`TimelineEntry`]. The
//! [`Timeline`] type exposes no way to edit or remove entries, and timestamps
//! never go backwards: an entry stamped earlier than its predecessor (clock
//! skew between writers) is clamped to the predecessor's timestamp.
//!
//! Because every stage name maps to exactly one edge of the transition graph,
//! the log alone is enough to reconstruct the order's status history. See
//! [`Timeline::replay`].

use crate::core::order::OrderStatus;
use crate::core::state_machine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage recorded in the timeline, persisted as its human-readable label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Order Created")]
    OrderCreated,
    #[serde(rename = "Submitted For Approval")]
    SubmittedForApproval,
    #[serde(rename = "Details Updated")]
    DetailsUpdated,
    #[serde(rename = "Manager Approved")]
    ManagerApproved,
    #[serde(rename = "Partial Advance Collected")]
    PartialAdvanceCollected,
    #[serde(rename = "Advance Collected")]
    AdvanceCollected,
    #[serde(rename = "Balance Collected")]
    BalanceCollected,
    #[serde(rename = "Production Started")]
    ProductionStarted,
    #[serde(rename = "Cutting Completed")]
    CuttingCompleted,
    #[serde(rename = "Sent To Quality Check")]
    SentToQualityCheck,
    #[serde(rename = "Alteration Requested")]
    AlterationRequested,
    #[serde(rename = "Trial Alteration Requested")]
    TrialAlterationRequested,
    #[serde(rename = "Alteration Completed")]
    AlterationCompleted,
    #[serde(rename = "Quality Approved")]
    QualityApproved,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::OrderCreated => "Order Created",
            Stage::SubmittedForApproval => "Submitted For Approval",
            Stage::DetailsUpdated => "Details Updated",
            Stage::ManagerApproved => "Manager Approved",
            Stage::PartialAdvanceCollected => "Partial Advance Collected",
            Stage::AdvanceCollected => "Advance Collected",
            Stage::BalanceCollected => "Balance Collected",
            Stage::ProductionStarted => "Production Started",
            Stage::CuttingCompleted => "Cutting Completed",
            Stage::SentToQualityCheck => "Sent To Quality Check",
            Stage::AlterationRequested => "Alteration Requested",
            Stage::TrialAlterationRequested => "Trial Alteration Requested",
            Stage::AlterationCompleted => "Alteration Completed",
            Stage::QualityApproved => "Quality Approved",
            Stage::Delivered => "Delivered",
            Stage::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stage: Stage,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only list of stage events
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline(Vec<TimelineEntry>);

/// The timeline is not a valid walk of the transition graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("Timeline is empty")]
    Empty,
    #[error("Timeline must start with 'Order Created', found '{found}'")]
    MissingCreation { found: Stage },
    #[error("Entry {index}: stage '{stage}' is not reachable from status '{from}'")]
    IllegalStage {
        index: usize,
        stage: Stage,
        from: OrderStatus,
    },
    #[error("Entry {index}: timestamp goes backwards")]
    NonMonotonic { index: usize },
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry, clamping its timestamp to keep the log monotonic
    pub fn append(&mut self, stage: Stage, note: impl Into<String>, timestamp: DateTime<Utc>) {
        let timestamp = match self.0.last() {
            Some(last) if last.timestamp > timestamp => last.timestamp,
            _ => timestamp,
        };
        self.0.push(TimelineEntry {
            stage,
            note: note.into(),
            timestamp,
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.0
    }

    pub fn last(&self) -> Option<&TimelineEntry> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.0.iter()
    }

    pub(crate) fn has_approval(&self) -> bool {
        self.0.iter().any(|e| e.stage == Stage::ManagerApproved)
    }

    /// Rebuild the status history from the stage names alone
    ///
    /// Returns the status after each entry. Fails if the first entry is not a
    /// creation, if any stage is not an edge from the status before it, or if
    /// timestamps decrease.
    pub fn replay(&self) -> Result<Vec<OrderStatus>, ReplayError> {
        let first = self.0.first().ok_or(ReplayError::Empty)?;
        if first.stage != Stage::OrderCreated {
            return Err(ReplayError::MissingCreation { found: first.stage });
        }

        let mut history = vec![OrderStatus::Pending];
        let mut current = OrderStatus::Pending;

        for (index, pair) in self.0.windows(2).enumerate() {
            let (prev, entry) = (&pair[0], &pair[1]);
            let index = index + 1;

            if entry.timestamp < prev.timestamp {
                return Err(ReplayError::NonMonotonic { index });
            }

            current = state_machine::target_for_stage(current, entry.stage).ok_or(
                ReplayError::IllegalStage {
                    index,
                    stage: entry.stage,
                    from: current,
                },
            )?;
            history.push(current);
        }

        Ok(history)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEntry;
    type IntoIter = std::slice::Iter<'a, TimelineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
