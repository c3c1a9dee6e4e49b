use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::wire::{AdminDataResponse, ConfigResponse, IssueResponse, MutationResponse};
use super::{BackendError, InvitationBackend, INVALID_PASSWORD_MARKER, UNCONFIGURED_URL_MARKER};
use crate::config::BackendConfig;
use crate::workflows::admin::domain::{AdminRecord, RecordStatus};
use crate::workflows::intake::domain::ApplicantSubmission;
use crate::workflows::window::SystemConfig;

/// `GET`-only client for the issuing backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Option<String>,
    issue_timeout: Duration,
    user_agent: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().build().map_err(BackendError::Transport)?;
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && !url.contains(UNCONFIGURED_URL_MARKER))
            .map(str::to_string);
        if base_url.is_none() {
            warn!("backend URL missing; issuance and admin calls will fail");
        }

        Ok(Self {
            client,
            base_url,
            issue_timeout: config.timeout,
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn base_url(&self) -> Result<&str, BackendError> {
        self.base_url.as_deref().ok_or(BackendError::NotConfigured)
    }

    async fn get(
        &self,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Response, BackendError> {
        let mut request = self.client.get(self.base_url()?).query(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|err| classify(err, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<T, BackendError> {
        let response = self.get(params, timeout).await?;
        let body = response.text().await.map_err(|err| classify(err, timeout))?;
        serde_json::from_str(&body).map_err(|err| BackendError::InvalidResponse(err.to_string()))
    }

    async fn mutate(&self, action: &str, params: &[(&str, &str)]) -> Result<(), BackendError> {
        let response: MutationResponse = self.get_json(params, None).await?;
        if response.succeeded() {
            Ok(())
        } else {
            let reason = response
                .error
                .unwrap_or_else(|| "success flag not set".to_string());
            error!(action, %reason, "backend mutation not applied");
            if reason == INVALID_PASSWORD_MARKER {
                Err(BackendError::InvalidPassword)
            } else {
                Err(BackendError::Rejected(reason))
            }
        }
    }
}

fn classify(err: reqwest::Error, timeout: Option<Duration>) -> BackendError {
    match timeout {
        Some(limit) if err.is_timeout() => BackendError::Timeout(limit),
        _ => BackendError::Transport(err),
    }
}

#[async_trait]
impl InvitationBackend for HttpBackend {
    async fn issue_code(&self, submission: &ApplicantSubmission) -> Result<String, BackendError> {
        info!(region = %submission.contact.region, "requesting invitation code");
        let contact = &submission.contact;
        let mut params: Vec<(&str, &str)> = vec![
            ("email", contact.email.as_str()),
            ("identity", contact.identity.as_str()),
            ("region", contact.region.as_str()),
            ("source", contact.source.as_str()),
            ("userAgent", self.user_agent.as_str()),
        ];
        if let Some(scores) = &submission.scores {
            params.extend(scores.query_pairs());
        }

        let result: Result<IssueResponse, BackendError> =
            self.get_json(&params, Some(self.issue_timeout)).await;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "invitation request failed");
                return Err(err);
            }
        };

        match (response.invitation_code, response.error) {
            (Some(code), _) if !code.trim().is_empty() => {
                info!("invitation code issued");
                Ok(code)
            }
            (_, Some(reason)) if !reason.is_empty() => {
                error!(%reason, "backend refused to issue a code");
                Err(BackendError::Rejected(reason))
            }
            _ => Err(BackendError::InvalidResponse(
                "missing invitationCode".to_string(),
            )),
        }
    }

    async fn fetch_admin_data(&self, password: &str) -> Result<Vec<AdminRecord>, BackendError> {
        debug!("fetching admin records");
        let response: AdminDataResponse = self
            .get_json(&[("action", "getAdminData"), ("password", password)], None)
            .await?;

        if let Some(reason) = response.error.as_deref().filter(|reason| !reason.is_empty()) {
            warn!(%reason, "admin data request refused");
            return Err(if reason == INVALID_PASSWORD_MARKER {
                BackendError::InvalidPassword
            } else {
                BackendError::Rejected(reason.to_string())
            });
        }
        if !response.succeeded() {
            return Err(BackendError::InvalidResponse(
                "success flag not set".to_string(),
            ));
        }

        let records = response
            .into_records()
            .map_err(BackendError::InvalidResponse)?;
        info!(count = records.len(), "fetched admin records");
        Ok(records)
    }

    async fn update_status(
        &self,
        password: &str,
        id: &str,
        status: RecordStatus,
    ) -> Result<(), BackendError> {
        self.mutate(
            "updateStatus",
            &[
                ("action", "updateStatus"),
                ("id", id),
                ("status", status.as_str()),
                ("password", password),
            ],
        )
        .await?;
        info!(record = id, status = status.as_str(), "record status updated");
        Ok(())
    }

    async fn fetch_config(&self) -> SystemConfig {
        match self
            .get_json::<ConfigResponse>(&[("action", "getConfig")], None)
            .await
        {
            Ok(response) => response.data.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "system config unavailable; treating window as closed");
                SystemConfig::default()
            }
        }
    }

    async fn update_config(
        &self,
        password: &str,
        config: &SystemConfig,
    ) -> Result<(), BackendError> {
        self.mutate(
            "updateConfig",
            &[
                ("action", "updateConfig"),
                ("password", password),
                ("scoreEntryStart", config.score_entry_start.as_str()),
                ("scoreEntryEnd", config.end_or_empty()),
            ],
        )
        .await?;
        info!(
            start = %config.score_entry_start,
            end = config.end_or_empty(),
            "system config updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_url_counts_as_unconfigured() {
        let config = BackendConfig {
            base_url: Some("https://script.example.com/YOUR_GOOGLE_SCRIPT_WEB_APP_URL".to_string()),
            ..BackendConfig::default()
        };
        let backend = HttpBackend::new(&config).expect("client builds");
        assert!(!backend.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_backend_fails_issuance_and_returns_empty_config() {
        let backend = HttpBackend::new(&BackendConfig::default()).expect("client builds");
        let submission = ApplicantSubmission {
            contact: Default::default(),
            scores: None,
        };
        let err = backend
            .issue_code(&submission)
            .await
            .expect_err("issuance needs a backend");
        assert!(matches!(err, BackendError::NotConfigured));
        assert_eq!(backend.fetch_config().await, SystemConfig::default());
    }
}
