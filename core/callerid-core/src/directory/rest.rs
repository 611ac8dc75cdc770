//! PostgREST-style directory client.
//!
//! Queries `GET {url}/rest/v1/{table}?select=*&or=(phone.eq."A",...)&limit=1`.
//! Requests authenticate with the session's access token when one exists and
//! fall back to the anonymous API key otherwise (row-level security then
//! decides what is visible).

use std::sync::Arc;

use async_trait::async_trait;

use super::{Directory, DirectoryConnector};
use crate::config::DirectoryConfig;
use crate::error::{CallerIdError, Result};
use crate::types::{Contact, Session};

pub struct RestDirectory {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    session: Option<Session>,
}

impl RestDirectory {
    pub fn new(
        client: reqwest::Client,
        config: &DirectoryConfig,
        session: Option<Session>,
    ) -> Result<Self> {
        let base = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(CallerIdError::DirectoryNotConfigured)?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base.trim_end_matches('/'), config.table),
            api_key: config.api_key.clone(),
            session,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn bearer(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|session| session.access_token.as_str())
            .or(self.api_key.as_deref())
    }
}

#[async_trait]
impl Directory for RestDirectory {
    async fn find_contact_by_phone(&self, candidates: &[String]) -> Result<Option<Contact>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let filter = phone_filter(candidates);
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("or", filter.as_str()), ("limit", "1")])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CallerIdError::DirectoryRequest(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CallerIdError::DirectoryRequest(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let rows: Vec<Contact> = response
            .json()
            .await
            .map_err(|err| CallerIdError::DirectoryRequest(err.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.clone()
    }
}

/// Builds the PostgREST `or` filter body, quoting every value so that dashes,
/// spaces and `+` survive intact.
pub fn phone_filter(candidates: &[String]) -> String {
    let clauses: Vec<String> = candidates
        .iter()
        .map(|candidate| {
            let escaped = candidate.replace('\\', "\\\\").replace('"', "\\\"");
            format!("phone.eq.\"{}\"", escaped)
        })
        .collect();
    format!("({})", clauses.join(","))
}

/// Creates one [`RestDirectory`] per session, sharing a connection pool.
#[derive(Clone)]
pub struct RestDirectoryConnector {
    client: reqwest::Client,
    config: DirectoryConfig,
}

impl RestDirectoryConnector {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

impl DirectoryConnector for RestDirectoryConnector {
    fn connect(&self, session: Option<Session>) -> Result<Arc<dyn Directory>> {
        let directory = RestDirectory::new(self.client.clone(), &self.config, session)?;
        Ok(Arc::new(directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> DirectoryConfig {
        DirectoryConfig {
            url: url.map(str::to_string),
            api_key: Some("anon".to_string()),
            table: "clients".to_string(),
        }
    }

    #[test]
    fn filter_quotes_each_candidate() {
        let filter = phone_filter(&[
            "010-1234-5678".to_string(),
            "01012345678".to_string(),
            "+82 10 1234 5678".to_string(),
        ]);
        assert_eq!(
            filter,
            r#"(phone.eq."010-1234-5678",phone.eq."01012345678",phone.eq."+82 10 1234 5678")"#
        );
    }

    #[test]
    fn filter_escapes_quotes() {
        assert_eq!(phone_filter(&["a\"b".to_string()]), r#"(phone.eq."a\"b")"#);
    }

    #[test]
    fn endpoint_joins_base_and_table() {
        let directory =
            RestDirectory::new(reqwest::Client::new(), &config(Some("https://db.example/")), None)
                .unwrap();
        assert_eq!(directory.endpoint(), "https://db.example/rest/v1/clients");
    }

    #[test]
    fn missing_url_is_not_configured() {
        let result = RestDirectory::new(reqwest::Client::new(), &config(None), None);
        assert!(matches!(result, Err(CallerIdError::DirectoryNotConfigured)));
    }

    #[test]
    fn session_token_takes_precedence_over_api_key() {
        let session = Session {
            user_id: "u".to_string(),
            email: None,
            access_token: "user-token".to_string(),
        };
        let with_session = RestDirectory::new(
            reqwest::Client::new(),
            &config(Some("https://db.example")),
            Some(session),
        )
        .unwrap();
        let anonymous =
            RestDirectory::new(reqwest::Client::new(), &config(Some("https://db.example")), None)
                .unwrap();

        assert_eq!(with_session.bearer(), Some("user-token"));
        assert_eq!(anonymous.bearer(), Some("anon"));
    }

    #[tokio::test]
    async fn connector_reports_session() {
        let connector = RestDirectoryConnector::new(config(Some("https://db.example")));
        let session = Session {
            user_id: "u".to_string(),
            email: None,
            access_token: "t".to_string(),
        };
        let directory = connector.connect(Some(session.clone())).unwrap();
        assert_eq!(directory.current_session().await, Some(session));
    }

    #[tokio::test]
    async fn empty_candidates_short_circuit() {
        let directory =
            RestDirectory::new(reqwest::Client::new(), &config(Some("http://127.0.0.1:9")), None)
                .unwrap();
        assert_eq!(directory.find_contact_by_phone(&[]).await.unwrap(), None);
    }
}
