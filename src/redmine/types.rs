use serde::{Deserialize, Serialize};

/// Normalized enrichment payload for one work item.
///
/// Derived from a raw issue response; fields the server left out degrade to
/// empty strings. Immutable once produced and serialized as-is into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
  pub status: String,
  pub assignee: String,
  pub environment: String,
}
