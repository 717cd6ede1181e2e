use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::card::{channel_message_body, wellbeing_card};
use crate::config::{ContainerKind, DashboardConfig};
use crate::error::{AdapterError, AdapterResult};
use crate::http::{HttpClient, HttpRequest, send_cancellable};
use crate::model::{Assignment, CardFacts, Container, EducationClass, Profile, Submission};
use crate::token::AccessToken;

/// OData collections arrive wrapped in `value`; some team endpoints return a
/// bare array instead.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Collection<T> {
    Bare(Vec<T>),
    Wrapped { value: Vec<T> },
}

impl<T> Collection<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Collection::Bare(items) => items,
            Collection::Wrapped { value } => value,
        }
    }
}

/// REST adapter over the fixed set of Graph endpoints the dashboard uses.
/// One attempt per call; every request carries the bearer token and asks
/// for JSON.
#[derive(Clone)]
pub struct GraphClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl GraphClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &DashboardConfig, http: Arc<dyn HttpClient>) -> Self {
        Self::new(http, cfg.graph_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(
        &self,
        request: HttpRequest,
        path: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<Vec<u8>> {
        let resp = send_cancellable(self.http.as_ref(), request, cancel).await?;
        if !resp.is_success() {
            let err_body: Value = serde_json::from_slice(&resp.body).unwrap_or(Value::Null);
            let message = err_body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            warn!(path, status = resp.status, %message, "graph request failed");
            return Err(AdapterError::Status {
                status: resp.status,
                message,
            });
        }
        debug!(path, status = resp.status, "graph request ok");
        Ok(resp.body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<T> {
        let request = HttpRequest::get(self.url(path))
            .header("Authorization", token.bearer())
            .header("Accept", "application/json");
        let body = self.execute(request, path, cancel).await?;
        serde_json::from_slice(&body).map_err(|err| {
            warn!(path, error = %err, "graph response did not parse");
            AdapterError::Malformed(format!("{path}: {err}"))
        })
    }

    async fn post_json(
        &self,
        token: &AccessToken,
        path: &str,
        payload: &Value,
        cancel: &CancellationToken,
    ) -> AdapterResult<Vec<u8>> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| AdapterError::InvalidInput(format!("encode body: {err}")))?;
        let request = HttpRequest::post(self.url(path), body)
            .header("Authorization", token.bearer())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        self.execute(request, path, cancel).await
    }

    /// Lists assignments for either container shape, in server order.
    pub async fn fetch_assignments(
        &self,
        token: &AccessToken,
        container: &Container,
        cancel: &CancellationToken,
    ) -> AdapterResult<Vec<Assignment>> {
        let path = match container {
            Container::Class { class_id } => {
                format!("/education/classes/{}/assignments", encode(class_id))
            }
            Container::Team { team_id } => format!("/teams/{}/assignments", encode(team_id)),
        };
        let collection: Collection<Assignment> = self.get_json(token, &path, cancel).await?;
        Ok(collection.into_items())
    }

    pub async fn fetch_submissions(
        &self,
        token: &AccessToken,
        class_id: &str,
        assignment_id: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<Vec<Submission>> {
        let path = format!(
            "/education/classes/{}/assignments/{}/submissions",
            encode(class_id),
            encode(assignment_id)
        );
        let collection: Collection<Submission> = self.get_json(token, &path, cancel).await?;
        Ok(collection.into_items())
    }

    pub async fn fetch_education_profile(
        &self,
        token: &AccessToken,
        cancel: &CancellationToken,
    ) -> AdapterResult<Profile> {
        self.get_json(token, "/education/me", cancel).await
    }

    pub async fn fetch_me(
        &self,
        token: &AccessToken,
        cancel: &CancellationToken,
    ) -> AdapterResult<Profile> {
        self.get_json(token, "/me", cancel).await
    }

    /// Class tabs read the education profile; team tabs read the plain user.
    pub async fn fetch_profile(
        &self,
        token: &AccessToken,
        kind: ContainerKind,
        cancel: &CancellationToken,
    ) -> AdapterResult<Profile> {
        match kind {
            ContainerKind::Class => self.fetch_education_profile(token, cancel).await,
            ContainerKind::Team => self.fetch_me(token, cancel).await,
        }
    }

    pub async fn fetch_class_details(
        &self,
        token: &AccessToken,
        class_id: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<EducationClass> {
        let path = format!("/education/classes/{}", encode(class_id));
        self.get_json(token, &path, cancel).await
    }

    /// Creates a text submission. Blank text is rejected before any request.
    pub async fn submit_reflection(
        &self,
        token: &AccessToken,
        class_id: &str,
        assignment_id: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> AdapterResult<Submission> {
        if text.trim().is_empty() {
            return Err(AdapterError::InvalidInput(
                "reflection text is empty".to_string(),
            ));
        }
        let path = format!(
            "/education/classes/{}/assignments/{}/submissions",
            encode(class_id),
            encode(assignment_id)
        );
        let payload = json!({
            "resourcesFolderUrl": null,
            "submittedDateTime": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "content": {
                "text": text,
                "contentType": "text"
            }
        });
        let body = self.post_json(token, &path, &payload, cancel).await?;
        serde_json::from_slice(&body)
            .map_err(|err| AdapterError::Malformed(format!("{path}: {err}")))
    }

    /// Posts the well-being facts card to a channel and returns the message id.
    /// A success reply without an id is `Malformed`.
    pub async fn post_adaptive_card(
        &self,
        token: &AccessToken,
        team_id: &str,
        channel_id: &str,
        facts: &CardFacts,
        cancel: &CancellationToken,
    ) -> AdapterResult<String> {
        let path = format!(
            "/teams/{}/channels/{}/messages",
            encode(team_id),
            encode(channel_id)
        );
        let payload = channel_message_body(&wellbeing_card(facts));
        let body = self.post_json(token, &path, &payload, cancel).await?;
        let body_json: Value = serde_json::from_slice(&body)
            .map_err(|err| AdapterError::Malformed(format!("{path}: {err}")))?;
        body_json
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Malformed(format!("{path}: message id missing")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_accepts_both_shapes() {
        let wrapped: Collection<Assignment> =
            serde_json::from_str(r#"{"value":[{"id":"a"}],"@odata.context":"x"}"#).unwrap();
        assert_eq!(wrapped.into_items().len(), 1);
        let bare: Collection<Assignment> = serde_json::from_str(r#"[{"id":"a"},{"id":"b"}]"#)
            .unwrap();
        assert_eq!(bare.into_items().len(), 2);
        let empty: Collection<Assignment> = serde_json::from_str("[]").unwrap();
        assert!(empty.into_items().is_empty());
    }

    #[test]
    fn collection_rejects_scalars() {
        assert!(serde_json::from_str::<Collection<Assignment>>("42").is_err());
    }
}
