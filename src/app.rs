use chrono::Duration;
use color_eyre::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::{BackingStore, ExpiringCache, MemoryStore, SqliteStore};
use crate::config::Config;
use crate::event::Event;
use crate::redmine::client::RedmineClient;
use crate::roadmap::{Enricher, RoadmapRow};

/// Ties the config, cache, client, and enrichment pass together for one run.
pub struct App {
  config: Config,
  rows: Vec<RoadmapRow>,
}

impl App {
  pub fn new(config: Config, issue_ids: Vec<String>) -> Self {
    let rows = issue_ids.into_iter().map(RoadmapRow::from_id).collect();
    Self { config, rows }
  }

  /// Run one enrichment pass and print the annotated rows.
  ///
  /// With `no_cache` the run uses a throwaway in-memory store, so every row
  /// fetches and nothing persists.
  pub async fn run(self, no_cache: bool) -> Result<()> {
    if no_cache {
      return self.run_with_store(MemoryStore::new()).await;
    }

    let store = match &self.config.cache.path {
      Some(path) => SqliteStore::open_at(path)?,
      None => SqliteStore::open()?,
    };
    self.run_with_store(store).await
  }

  async fn run_with_store<S: BackingStore + 'static>(mut self, store: S) -> Result<()> {
    let cache = ExpiringCache::new(store)
      .with_ttl(Duration::milliseconds(self.config.cache.ttl_ms as i64))
      .with_force_refresh(self.config.cache.force_refresh);

    let client = RedmineClient::new(&self.config)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let enricher = Enricher::new(cache, tx);

    let fetch = move |id: String| {
      let client = client.clone();
      async move { client.get_issue(&id).await }
    };

    let mut pending = enricher.process(&mut self.rows, fetch)?;
    debug!(pending, "enrichment pass dispatched");

    // Rows served from cache are already annotated; wait for the rest.
    while pending > 0 {
      let Some(event) = rx.recv().await else {
        break;
      };

      match event {
        Event::RowEnriched { row, record } => {
          if let Some(r) = self.rows.get_mut(row) {
            r.annotate(&record);
          }
          pending -= 1;
        }
        Event::FetchFailed { .. } => {
          pending -= 1;
        }
      }
    }

    for row in &self.rows {
      println!("{}", row.display());
    }

    Ok(())
  }
}
