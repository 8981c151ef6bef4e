//! Serde-deserializable types matching Redmine API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::IssueRecord;

/// Name of the custom field carrying the deployment environment.
const ENVIRONMENT_FIELD: &str = "Environment";

#[derive(Debug, Deserialize)]
pub struct ApiNamed {
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCustomField {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub value: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiIssue {
  pub status: Option<ApiNamed>,
  pub assigned_to: Option<ApiNamed>,
  #[serde(default)]
  pub custom_fields: Vec<ApiCustomField>,
}

/// Issue endpoint response. The issue itself can be absent on malformed
/// replies; callers treat that as a failed fetch.
#[derive(Debug, Deserialize)]
pub struct ApiIssueResponse {
  pub issue: Option<ApiIssue>,
}

impl ApiIssue {
  pub fn into_record(self) -> IssueRecord {
    let environment = environment_value(&self.custom_fields).unwrap_or_default();
    IssueRecord {
      status: self.status.map(|s| s.name).unwrap_or_default(),
      assignee: self.assigned_to.map(|u| u.name).unwrap_or_default(),
      environment,
    }
  }
}

/// Scan the custom-field list for the environment entry.
fn environment_value(fields: &[ApiCustomField]) -> Option<String> {
  fields
    .iter()
    .find(|f| f.name == ENVIRONMENT_FIELD)
    .and_then(|f| f.value.clone())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_response_derives_a_record() {
    let raw = r#"{
      "issue": {
        "status": {"name": "Open"},
        "assigned_to": {"name": "Alice"},
        "custom_fields": [
          {"name": "Severity", "value": "low"},
          {"name": "Environment", "value": "prod"}
        ]
      }
    }"#;

    let response: ApiIssueResponse = serde_json::from_str(raw).unwrap();
    let record = response.issue.unwrap().into_record();

    assert_eq!(
      record,
      IssueRecord {
        status: "Open".to_string(),
        assignee: "Alice".to_string(),
        environment: "prod".to_string(),
      }
    );
  }

  #[test]
  fn missing_fields_degrade_to_empty_strings() {
    let response: ApiIssueResponse = serde_json::from_str(r#"{"issue": {}}"#).unwrap();
    let record = response.issue.unwrap().into_record();

    assert_eq!(record.status, "");
    assert_eq!(record.assignee, "");
    assert_eq!(record.environment, "");
  }

  #[test]
  fn missing_issue_field_is_preserved_as_none() {
    let response: ApiIssueResponse = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
    assert!(response.issue.is_none());
  }

  #[test]
  fn environment_scan_ignores_other_custom_fields() {
    let fields: Vec<ApiCustomField> = serde_json::from_str(
      r#"[
        {"name": "Sprint", "value": "12"},
        {"name": "environment", "value": "wrong-case"}
      ]"#,
    )
    .unwrap();

    assert_eq!(environment_value(&fields), None);
  }

  #[test]
  fn environment_with_null_value_degrades_to_empty() {
    let raw = r#"{"custom_fields": [{"name": "Environment", "value": null}]}"#;
    let issue: ApiIssue = serde_json::from_str(raw).unwrap();

    assert_eq!(issue.into_record().environment, "");
  }
}
