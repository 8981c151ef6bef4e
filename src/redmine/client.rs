use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::config::Config;
use crate::redmine::api_types::{ApiIssue, ApiIssueResponse};

/// Redmine API client wrapper
#[derive(Clone)]
pub struct RedmineClient {
  http: reqwest::Client,
  base_url: Url,
  login: String,
  password: String,
}

impl RedmineClient {
  pub fn new(config: &Config) -> Result<Self> {
    let password = Config::get_password()?;

    // A trailing slash keeps Url::join from eating the last path segment.
    let mut base = config.redmine.url.clone();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base_url =
      Url::parse(&base).map_err(|e| eyre!("Invalid Redmine URL {}: {}", base, e))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      login: config.redmine.login.clone(),
      password,
    })
  }

  /// Fetch a single issue by id.
  ///
  /// A well-formed reply carries the issue under a top-level `issue` field;
  /// anything else is reported as an error.
  pub async fn get_issue(&self, id: &str) -> Result<ApiIssue> {
    let url = self
      .base_url
      .join(&format!("issues/{}.json", id))
      .map_err(|e| eyre!("Failed to build URL for issue {}: {}", id, e))?;

    let response = self
      .http
      .get(url)
      .basic_auth(&self.login, Some(&self.password))
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch issue {}: {}", id, e))?
      .error_for_status()
      .map_err(|e| eyre!("Issue {} request rejected: {}", id, e))?;

    let body: ApiIssueResponse = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse issue {}: {}", id, e))?;

    body
      .issue
      .ok_or_else(|| eyre!("Issue {} missing from response", id))
  }
}
