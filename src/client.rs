//! Typed access to the portal API.
//!
//! [`PortalClient`] calls the endpoints declared in [`crate::contract`],
//! checks every successful response against the contract before
//! deserializing it, and keeps the last result of each query in a
//! [`QueryCache`] keyed by request path. Mutations drop the cached dashboard
//! and assignment list so the next read refetches them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::chat::{ChatReply, ChatRequest};
use crate::contract::{
    plain, Endpoint, ValidationError, ANNOUNCEMENTS_LIST, ASSIGNMENTS_LIST, ASSIGNMENTS_UPDATE,
    CHAT_CREATE, COURSES_GET, COURSES_LIST, DASHBOARD_GET, PREDICT_CREATE, SCORE_CREATE,
};
use crate::models::{Announcement, Assignment, AssignmentPatch, Course, DashboardData};
use crate::predict::{Prediction, RiskProfile, RoundedScore, ScoreRequest};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{message} (field `{field}`)")]
    Rejected { message: String, field: String },
    #[error("{message} (status {status})")]
    Failed { status: u16, message: String },
    /// The request did not satisfy the contract and was never sent.
    #[error("invalid input: {0}")]
    Invalid(ValidationError),
    /// The server answered with a body the contract does not allow.
    #[error("response from {endpoint} violates the contract: {source}")]
    Contract {
        endpoint: &'static str,
        source: ValidationError,
    },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    Idle,
    Loading,
    Success(Value),
    Error(String),
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<String, QueryState>>,
}

impl QueryCache {
    pub fn state(&self, key: &str) -> QueryState {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or(QueryState::Idle)
    }

    pub fn invalidate(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn set(&self, key: &str, state: QueryState) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), state);
    }

    fn fresh(&self, key: &str) -> Option<Value> {
        match self.state(key) {
            QueryState::Success(value) => Some(value),
            _ => None,
        }
    }
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    cache: QueryCache,
}

impl PortalClient {
    /// `base_url` is the server origin, e.g. `http://localhost:5000`.
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: QueryCache::default(),
        })
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn dashboard(&self) -> Result<DashboardData, ClientError> {
        self.query(&DASHBOARD_GET, plain(&DASHBOARD_GET), "Failed to fetch dashboard data")
            .await
    }

    pub async fn courses(&self) -> Result<Vec<Course>, ClientError> {
        self.query(&COURSES_LIST, plain(&COURSES_LIST), "Failed to fetch courses")
            .await
    }

    pub async fn course(&self, id: i32) -> Result<Course, ClientError> {
        self.query(&COURSES_GET, COURSES_GET.url([("id", id)]), "Failed to fetch course")
            .await
    }

    pub async fn assignments(&self) -> Result<Vec<Assignment>, ClientError> {
        self.query(&ASSIGNMENTS_LIST, plain(&ASSIGNMENTS_LIST), "Failed to fetch assignments")
            .await
    }

    pub async fn announcements(&self) -> Result<Vec<Announcement>, ClientError> {
        self.query(
            &ANNOUNCEMENTS_LIST,
            plain(&ANNOUNCEMENTS_LIST),
            "Failed to fetch announcements",
        )
        .await
    }

    pub async fn update_assignment(
        &self,
        id: i32,
        patch: &AssignmentPatch,
    ) -> Result<Assignment, ClientError> {
        let updated = self
            .mutate(
                &ASSIGNMENTS_UPDATE,
                ASSIGNMENTS_UPDATE.url([("id", id)]),
                patch,
                "Failed to update assignment",
            )
            .await?;
        self.cache.invalidate(&plain(&DASHBOARD_GET));
        self.cache.invalidate(&plain(&ASSIGNMENTS_LIST));
        Ok(updated)
    }

    /// Flips an assignment between pending and completed.
    pub async fn toggle_assignment(&self, assignment: &Assignment) -> Result<Assignment, ClientError> {
        let patch = AssignmentPatch::status(assignment.status.toggled());
        self.update_assignment(assignment.id, &patch).await
    }

    pub async fn score(&self, request: &ScoreRequest) -> Result<RoundedScore, ClientError> {
        self.mutate(&SCORE_CREATE, plain(&SCORE_CREATE), request, "Failed to compute score")
            .await
    }

    pub async fn predict(&self, profile: &RiskProfile) -> Result<Prediction, ClientError> {
        self.mutate(&PREDICT_CREATE, plain(&PREDICT_CREATE), profile, "Failed to predict risk")
            .await
    }

    pub async fn chat<S: Into<String>>(&self, input: S) -> Result<String, ClientError> {
        let request = ChatRequest {
            input: input.into(),
        };
        let reply: ChatReply = self
            .mutate(&CHAT_CREATE, plain(&CHAT_CREATE), &request, "Failed to get a reply")
            .await?;
        Ok(reply.text)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        endpoint: &'static Endpoint,
        path: String,
        failure: &str,
    ) -> Result<T, ClientError> {
        if let Some(value) = self.cache.fresh(&path) {
            return Ok(serde_json::from_value(value)?);
        }

        self.cache.set(&path, QueryState::Loading);
        match self.send(endpoint, &path, None, failure).await {
            Ok(value) => {
                self.cache.set(&path, QueryState::Success(value.clone()));
                Ok(serde_json::from_value(value)?)
            }
            Err(err) => {
                self.cache.set(&path, QueryState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn mutate<I: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &'static Endpoint,
        path: String,
        input: &I,
        failure: &str,
    ) -> Result<T, ClientError> {
        let input = serde_json::to_value(input)?;
        endpoint.validate_input(&input).map_err(ClientError::Invalid)?;
        let value = self.send(endpoint, &path, Some(&input), failure).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(
        &self,
        endpoint: &'static Endpoint,
        path: &str,
        body: Option<&Value>,
        failure: &str,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{} {}", endpoint.method.as_str(), url);
        let mut request = self.http.request(endpoint.method.into(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.json::<Value>().await.ok();
            return Err(failure_for(status, body, failure));
        }

        let value: Value = response.json().await?;
        endpoint
            .validate_response(status, &value)
            .map_err(|source| ClientError::Contract {
                endpoint: endpoint.name,
                source,
            })?;
        Ok(value)
    }
}

fn failure_for(status: u16, body: Option<Value>, failure: &str) -> ClientError {
    let text = |key: &str| {
        body.as_ref()
            .and_then(|b| b.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match (status, text("field")) {
        (401, _) => ClientError::Unauthorized,
        (404, _) => ClientError::NotFound(text("message").unwrap_or_else(|| "Not found".to_string())),
        (400, Some(field)) => ClientError::Rejected {
            message: text("message").unwrap_or_else(|| failure.to_string()),
            field,
        },
        (status, _) => ClientError::Failed {
            status,
            message: failure.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_tracks_query_state() {
        let cache = QueryCache::default();
        assert_eq!(cache.state("/api/courses"), QueryState::Idle);

        cache.set("/api/courses", QueryState::Loading);
        assert_eq!(cache.fresh("/api/courses"), None);

        cache.set("/api/courses", QueryState::Success(json!([])));
        assert_eq!(cache.fresh("/api/courses"), Some(json!([])));

        cache.invalidate("/api/courses");
        assert_eq!(cache.state("/api/courses"), QueryState::Idle);
    }

    #[test]
    fn errors_are_not_served_from_cache() {
        let cache = QueryCache::default();
        cache.set("/api/dashboard", QueryState::Error("boom".to_string()));
        assert_eq!(cache.fresh("/api/dashboard"), None);
    }

    #[test]
    fn failures_are_typed_by_status() {
        assert!(matches!(
            failure_for(401, None, "Failed to fetch dashboard data"),
            ClientError::Unauthorized
        ));

        let err = failure_for(404, Some(json!({ "message": "Assignment not found" })), "x");
        assert_eq!(err.to_string(), "Assignment not found");

        let err = failure_for(400, Some(json!({ "message": "Required", "field": "body" })), "x");
        assert!(matches!(err, ClientError::Rejected { ref field, .. } if field == "body"));

        let err = failure_for(500, Some(json!({ "message": "boom" })), "Failed to update assignment");
        assert!(matches!(err, ClientError::Failed { status: 500, .. }));
        assert_eq!(err.to_string(), "Failed to update assignment (status 500)");
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = PortalClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
