//! Paginated feed bookkeeping and the active index.
//!
//! The controller performs no I/O. Each operation that needs a page hands
//! back a [`PageRequest`]; the host fetches it and passes the result to
//! [`FeedController::complete`]. Requests carry the feed generation, so
//! answers that arrive after a reset are dropped.

use rf_core::config::FeedConfig;
use rf_core::{FeedFilter, FeedPage, UserId, VideoId, VideoRecord};
use rf_playback::ViewDeduper;
use std::collections::HashSet;

use crate::gesture::NavIntent;

/// One page the host should fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub page: u32,
    pub limit: usize,
    pub filter: FeedFilter,
    pub user_id: Option<UserId>,
}

/// Page-level failure, kept until a manual retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load page {page}: {message}")]
pub struct FeedError {
    pub page: u32,
    pub message: String,
    /// A retry of the same page could plausibly succeed.
    pub transient: bool,
}

/// Result of feeding a fetch answer back in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Appended {
        added: usize,
        duplicates: usize,
        /// Follow-up fetch when the list is still too short for the active index.
        next: Option<PageRequest>,
    },
    Failed(FeedError),
    /// Answer for a superseded generation or a request not in flight.
    Stale,
}

/// Result of moving the active index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChange {
    pub index: usize,
    pub changed: bool,
    pub prefetch: Option<PageRequest>,
}

pub struct FeedController {
    page_size: usize,
    lookahead: usize,
    records: Vec<VideoRecord>,
    loaded_ids: HashSet<VideoId>,
    active_index: usize,
    next_page: u32,
    exhausted: bool,
    in_flight: Option<u32>,
    generation: u64,
    filter: FeedFilter,
    user_id: Option<UserId>,
    error: Option<FeedError>,
    deduper: ViewDeduper,
}

impl FeedController {
    pub fn new(config: &FeedConfig, deduper: ViewDeduper) -> Self {
        Self {
            page_size: config.page_size.max(1),
            lookahead: config.prefetch_lookahead,
            records: Vec::new(),
            loaded_ids: HashSet::new(),
            active_index: 0,
            next_page: 0,
            exhausted: false,
            in_flight: None,
            generation: 0,
            filter: FeedFilter::default(),
            user_id: None,
            error: None,
            deduper,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_record(&self) -> Option<&VideoRecord> {
        self.records.get(self.active_index)
    }

    pub fn contains(&self, id: VideoId) -> bool {
        self.loaded_ids.contains(&id)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn deduper(&self) -> &ViewDeduper {
        &self.deduper
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Reset everything for a new filter and request the first page.
    pub fn load(&mut self, filter: FeedFilter, user_id: Option<UserId>) -> PageRequest {
        self.generation += 1;
        self.records.clear();
        self.loaded_ids.clear();
        self.deduper.clear();
        self.active_index = 0;
        self.next_page = 0;
        self.exhausted = false;
        self.error = None;
        self.filter = filter;
        self.user_id = user_id;

        tracing::debug!(generation = self.generation, filter = ?self.filter, "Feed reset");
        self.request(0)
    }

    /// Request the next page unless one is in flight, the feed is
    /// exhausted, or a failure is waiting for a manual retry.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.exhausted || self.error.is_some() {
            return None;
        }
        Some(self.request(self.next_page))
    }

    /// Manual retry after a page failure.
    pub fn retry(&mut self) -> Option<PageRequest> {
        let err = self.error.take()?;
        tracing::info!(page = err.page, "Retrying feed page");
        self.load_more()
    }

    /// Apply a fetch answer.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: rf_core::Result<FeedPage>,
    ) -> PageOutcome {
        if request.generation != self.generation || self.in_flight != Some(request.page) {
            tracing::debug!(
                page = request.page,
                generation = request.generation,
                current = self.generation,
                "Dropping stale feed page"
            );
            return PageOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                let total = page.records.len();
                let mut added = 0;
                for record in page.records {
                    if self.loaded_ids.insert(record.id) {
                        self.records.push(record);
                        added += 1;
                    }
                }
                self.exhausted = page.exhausted;
                self.next_page = request.page + 1;
                tracing::debug!(
                    page = request.page,
                    added,
                    duplicates = total - added,
                    exhausted = self.exhausted,
                    "Feed page applied"
                );
                PageOutcome::Appended {
                    added,
                    duplicates: total - added,
                    next: self.maybe_prefetch(),
                }
            }
            Err(e) => {
                let transient = e.is_transient();
                tracing::warn!(page = request.page, error = %e, transient, "Feed page failed");
                let err = FeedError {
                    page: request.page,
                    message: e.to_string(),
                    transient,
                };
                self.error = Some(err.clone());
                PageOutcome::Failed(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Active index
    // -----------------------------------------------------------------------

    /// Clamp `index` into the loaded range and commit it.
    pub fn set_active_index(&mut self, index: usize) -> IndexChange {
        let clamped = index.min(self.records.len().saturating_sub(1));
        let changed = clamped != self.active_index;
        self.active_index = clamped;
        IndexChange {
            index: clamped,
            changed,
            prefetch: self.maybe_prefetch(),
        }
    }

    /// Apply a navigation intent; steps past either end are clamped.
    pub fn navigate(&mut self, intent: NavIntent) -> IndexChange {
        let target = match intent {
            NavIntent::Next => self.active_index.saturating_add(1),
            NavIntent::Previous => self.active_index.saturating_sub(1),
        };
        self.set_active_index(target)
    }

    fn maybe_prefetch(&mut self) -> Option<PageRequest> {
        let remaining = self.records.len().saturating_sub(self.active_index + 1);
        if remaining <= self.lookahead {
            self.load_more()
        } else {
            None
        }
    }

    fn request(&mut self, page: u32) -> PageRequest {
        self.in_flight = Some(page);
        PageRequest {
            generation: self.generation,
            page,
            limit: self.page_size,
            filter: self.filter.clone(),
            user_id: self.user_id,
        }
    }
}
