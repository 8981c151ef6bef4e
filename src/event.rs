use crate::redmine::types::IssueRecord;

/// Application events
///
/// Results of fire-and-forget fetch tasks, delivered over an unbounded
/// channel to whoever owns the rows.
#[derive(Debug)]
pub enum Event {
  /// A fetch completed and produced a record for the given row.
  RowEnriched { row: usize, record: IssueRecord },
  /// A fetch failed or returned an unusable payload. The row stays in its
  /// pre-enrichment state; this event only lets the owner account for
  /// settled fetches.
  FetchFailed { row: usize },
}
