//! rf-feed: feed paging, active-index bookkeeping, gesture input, and the
//! remote feed backend.

pub mod controller;
pub mod gesture;
pub mod source;

pub use controller::{FeedController, FeedError, IndexChange, PageOutcome, PageRequest};
pub use gesture::{GestureScrollManager, NavIntent, NavKey};
pub use source::{FeedSource, HttpFeedSource};
