use crate::redmine::types::IssueRecord;

/// One row of the roadmap table: a work-item id plus its display cell.
#[derive(Debug, Clone)]
pub struct RoadmapRow {
  pub issue_id: String,
  /// Original cell content, kept separate from the annotation.
  base: String,
  annotation: Option<String>,
}

impl RoadmapRow {
  pub fn new(issue_id: impl Into<String>, base: impl Into<String>) -> Self {
    Self {
      issue_id: issue_id.into(),
      base: base.into(),
      annotation: None,
    }
  }

  /// Row whose display cell starts as just the issue id.
  pub fn from_id(issue_id: impl Into<String>) -> Self {
    let issue_id = issue_id.into();
    let base = format!("#{}", issue_id);
    Self::new(issue_id, base)
  }

  /// Attach the enrichment annotation, replacing any previous one.
  ///
  /// The display cell is recomputed from the base content on every call, so
  /// repeated renders never stack annotations.
  pub fn annotate(&mut self, record: &IssueRecord) {
    self.annotation = Some(format_annotation(record));
  }

  pub fn is_annotated(&self) -> bool {
    self.annotation.is_some()
  }

  /// Full display cell content.
  pub fn display(&self) -> String {
    match &self.annotation {
      Some(annotation) => format!("{} {}", self.base, annotation),
      None => self.base.clone(),
    }
  }
}

/// Trailing-cell annotation: `(status [environment] - assignee)`.
fn format_annotation(record: &IssueRecord) -> String {
  format!(
    "({} [{}] - {})",
    record.status, record.environment, record.assignee
  )
}
