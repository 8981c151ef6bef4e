//! Fetch-or-serve decision logic for roadmap rows.

use color_eyre::Result;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{BackingStore, ExpiringCache};
use crate::event::Event;
use crate::redmine::api_types::ApiIssue;
use crate::redmine::types::IssueRecord;

use super::row::RoadmapRow;

/// Per-row enrichment coordinator.
///
/// For each row it consults the cache: hits render synchronously, misses
/// dispatch a fire-and-forget fetch whose result comes back as an [`Event`].
/// Fetches for distinct ids are independent; two rows sharing an id may each
/// trigger their own fetch, and the cache's replace-if-expired rule decides
/// which response sticks.
pub struct Enricher<S> {
  cache: ExpiringCache<S>,
  events: mpsc::UnboundedSender<Event>,
}

impl<S: BackingStore + 'static> Enricher<S> {
  pub fn new(cache: ExpiringCache<S>, events: mpsc::UnboundedSender<Event>) -> Self {
    Self { cache, events }
  }

  /// Annotate rows from cache where possible and dispatch fetches for the
  /// rest.
  ///
  /// Returns without blocking once all fetches are dispatched; the count of
  /// dispatched fetches tells the caller how many events to await before the
  /// pass has settled.
  pub fn process<F, Fut>(&self, rows: &mut [RoadmapRow], fetch: F) -> Result<usize>
  where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiIssue>> + Send + 'static,
  {
    let mut dispatched = 0;

    for (index, row) in rows.iter_mut().enumerate() {
      match self.cache.get::<IssueRecord>(&row.issue_id)? {
        Some(record) => row.annotate(&record),
        None => {
          self.spawn_fetch(index, row.issue_id.clone(), fetch.clone());
          dispatched += 1;
        }
      }
    }

    Ok(dispatched)
  }

  /// Fire-and-forget fetch for one row.
  ///
  /// There is no cancellation: a dispatched fetch runs to completion, and its
  /// result is simply dropped if the event receiver has gone away.
  fn spawn_fetch<F, Fut>(&self, row: usize, issue_id: String, fetch: F)
  where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiIssue>> + Send + 'static,
  {
    let cache = self.cache.clone();
    let events = self.events.clone();

    tokio::spawn(async move {
      match fetch(issue_id.clone()).await {
        Ok(issue) => {
          let record = issue.into_record();
          let _ = events.send(Event::RowEnriched {
            row,
            record: record.clone(),
          });
          if let Err(e) = cache.replace_expired(&issue_id, &record) {
            // The row already rendered from the fetch result.
            warn!(issue = %issue_id, error = %e, "failed to cache fetched record");
          }
        }
        Err(e) => {
          debug!(issue = %issue_id, error = %e, "fetch failed, leaving row unenriched");
          let _ = events.send(Event::FetchFailed { row });
        }
      }
    });
  }
}
