//! Live projection feed: role-scoped views of the order set pushed as diffs

pub mod feed;
pub mod query;
pub mod view;

pub use feed::{FeedDiff, FeedMessage, FeedSubscription, ProjectionFeed};
pub use query::{DashboardView, Predicate, ProjectionQuery, SortDirection, SortField, SortKey};
pub use view::{LocalView, time_ago};
