use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{CallLogService, ConversationService, ReplySink, UserDirectory};
use crate::config::CoreConfig;
use crate::models::{CallLogEntry, Conversation, RawMessage, ReplyPayload, UserRecord};

/// List endpoints answer either with a bare array or with `{"data": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Items(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Items(items) => items,
            Listing::Wrapped { data } => data,
        }
    }
}

/// REST client for the CRM's messaging, call-log, user and reply endpoints
#[derive(Clone)]
pub struct HttpCrmClient {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpCrmClient {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .authorize(self.client.get(self.url(path)).query(query))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("CRM API error on {} ({}): {}", path, status, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }
}

impl ConversationService for HttpCrmClient {
    fn get_conversation_by_identifier<'a>(
        &'a self,
        phone_or_email: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>>> {
        async move {
            let path = "/conversations/lookup";
            let response = self
                .authorize(
                    self.client
                        .get(self.url(path))
                        .query(&[("identifier", phone_or_email)]),
                )
                .send()
                .await
                .context("Failed to send conversation lookup")?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                anyhow::bail!("CRM API error on {} ({}): {}", path, status, error_text);
            }

            let conversation = response
                .json::<Option<Conversation>>()
                .await
                .context("Failed to parse conversation lookup")?;
            Ok(conversation)
        }
        .boxed()
    }

    fn get_messages_by_conversation<'a>(
        &'a self,
        conversation_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<RawMessage>>> {
        async move {
            let path = format!("/conversations/{}/messages", conversation_id);
            let listing: Listing<RawMessage> = self.get_json(&path, &[("limit", limit.to_string())]).await?;
            Ok(listing.into_vec())
        }
        .boxed()
    }
}

impl CallLogService for HttpCrmClient {
    fn get_call_logs<'a>(&'a self, phone_number: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<CallLogEntry>>> {
        async move {
            let query = [("phoneNumber", phone_number.to_string()), ("limit", limit.to_string())];
            let listing: Listing<CallLogEntry> = self.get_json("/call-logs", &query).await?;
            Ok(listing.into_vec())
        }
        .boxed()
    }
}

impl UserDirectory for HttpCrmClient {
    fn search_users<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<UserRecord>>> {
        async move {
            let params = [("query", query.to_string()), ("limit", limit.to_string())];
            let listing: Listing<UserRecord> = self.get_json("/users/search", &params).await?;
            Ok(listing.into_vec())
        }
        .boxed()
    }
}

impl ReplySink for HttpCrmClient {
    fn add_reply<'a>(&'a self, opportunity_id: &'a str, reply: &'a ReplyPayload) -> BoxFuture<'a, Result<()>> {
        async move {
            let path = format!("/opportunities/{}/replies", opportunity_id);
            let response = self
                .authorize(self.client.post(self.url(&path)).json(reply))
                .send()
                .await
                .context("Failed to send reply")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                anyhow::bail!("CRM API error on {} ({}): {}", path, status, error_text);
            }
            Ok(())
        }
        .boxed()
    }
}
