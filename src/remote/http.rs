//! HTTP document store client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::RemoteStore;
use crate::config::Config;
use crate::error::RemoteError;
use crate::queue::NewTrainingRecord;

/// Writes records as JSON documents with `POST {base_url}/{collection}`.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(config.remote_timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.remote.base_url.trim_end_matches('/').to_string(),
            auth_token: config
                .remote
                .auth_token
                .clone()
                .filter(|token| !token.is_empty()),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn write(&self, collection: &str, record: &NewTrainingRecord) -> Result<(), RemoteError> {
        let url = self.collection_url(collection);
        let mut request = self.client.post(&url).json(record);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%url, exercise = %record.exercise_name, "Remote write confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_url_trims_trailing_slash() {
        let mut config = Config::default();
        config.remote.base_url = "https://store.example.com/v1/documents/".to_string();
        let store = HttpRemoteStore::new(&config).unwrap();
        assert_eq!(
            store.collection_url("training_records"),
            "https://store.example.com/v1/documents/training_records"
        );
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let mut config = Config::default();
        config.remote.auth_token = Some(String::new());
        let store = HttpRemoteStore::new(&config).unwrap();
        assert!(store.auth_token.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let mut config = Config::default();
        // Port 9 on localhost: nothing should be listening
        config.remote.base_url = "http://127.0.0.1:9/v1".to_string();
        config.remote.timeout_secs = 2;
        let store = HttpRemoteStore::new(&config).unwrap();

        let record = NewTrainingRecord::now("u", "r", "e", "Row", 3, 12, 30.0);
        assert!(store.write("training_records", &record).await.is_err());
    }
}
