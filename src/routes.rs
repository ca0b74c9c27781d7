use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query};
use axum::Extension;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::chat::{ChatReply, ChatRequest};
use crate::contract::{
    Endpoint, ASSIGNMENTS_UPDATE, CHAT_CREATE, PREDICT_CREATE, SCORE_CREATE,
};
use crate::err::Error;
use crate::middleware::CurrentUser;
use crate::models::{Announcement, Assignment, AssignmentPatch, Course, DashboardData};
use crate::predict::{Prediction, RiskProfile, RoundedScore, ScoreRequest};
use crate::{breaks, proceeds, AppState, Payload};

#[derive(Debug, Deserialize)]
pub struct AssignmentFilter {
    #[serde(rename = "courseId")]
    pub course_id: Option<i32>,
}

pub async fn dashboard(
    CurrentUser(user): CurrentUser,
    Extension(state): Extension<AppState>,
) -> Payload<DashboardData> {
    proceeds(state.storage.get_dashboard_data(user.id).await?)
}

pub async fn list_courses(Extension(state): Extension<AppState>) -> Payload<Vec<Course>> {
    proceeds(state.storage.get_courses().await?)
}

pub async fn get_course(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Payload<Course> {
    let id = parse_id(&id, "Course not found")?;
    match state.storage.get_course(id).await? {
        Some(course) => proceeds(course),
        None => breaks(Error::not_found("Course not found")),
    }
}

pub async fn list_assignments(
    filter: Result<Query<AssignmentFilter>, QueryRejection>,
    Extension(state): Extension<AppState>,
) -> Payload<Vec<Assignment>> {
    let Query(filter) = filter.map_err(|err| Error::invalid("courseId", err.to_string()))?;
    proceeds(state.storage.get_assignments(filter.course_id).await?)
}

pub async fn update_assignment(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Payload<Assignment> {
    let id = parse_id(&id, "Assignment not found")?;
    let patch: AssignmentPatch = decode(&ASSIGNMENTS_UPDATE, &body)?;
    proceeds(state.storage.update_assignment(id, patch).await?)
}

pub async fn list_announcements(
    Extension(state): Extension<AppState>,
) -> Payload<Vec<Announcement>> {
    proceeds(state.storage.get_announcements().await?)
}

pub async fn score(Extension(state): Extension<AppState>, body: Bytes) -> Payload<RoundedScore> {
    let request: ScoreRequest = decode(&SCORE_CREATE, &body)?;
    let features = serde_json::to_value(request.features())?;
    let prediction = state
        .score_model
        .predict(&features)
        .await
        .map_err(|err| Error::internal("PredictionError", format!("{:#}", err)))?;
    proceeds(RoundedScore::from(prediction))
}

pub async fn predict(Extension(state): Extension<AppState>, body: Bytes) -> Payload<Prediction> {
    let profile: RiskProfile = decode(&PREDICT_CREATE, &body)?;
    log::debug!("Risk prediction for {} factors", profile.factors.len());
    let features = serde_json::to_value(&profile)?;
    let prediction = state
        .risk_model
        .predict(&features)
        .await
        .map_err(|err| Error::internal("PredictionError", format!("{:#}", err)))?;
    proceeds(prediction)
}

pub async fn chat(Extension(state): Extension<AppState>, body: Bytes) -> Payload<ChatReply> {
    let request: ChatRequest = decode(&CHAT_CREATE, &body)?;
    if request.input.trim().is_empty() {
        return breaks(Error::invalid("input", "Input must not be empty"));
    }
    let chat = match &state.chat {
        Some(chat) => chat,
        None => {
            return breaks(Error::internal(
                "ChatUnavailable",
                "Chat completion is not configured",
            ))
        }
    };
    let text = chat
        .complete(&request.input)
        .await
        .map_err(|err| Error::internal("ChatCompletionError", format!("{:#}", err)))?;
    proceeds(ChatReply { text })
}

/// An id that is not an integer cannot name a stored record.
fn parse_id(raw: &str, missing: &str) -> Result<i32, Error> {
    raw.parse::<i32>().map_err(|_| Error::not_found(missing))
}

/// Parses a request body and checks it against the endpoint's input schema
/// before handing it to serde.
fn decode<T: DeserializeOwned>(endpoint: &Endpoint, body: &[u8]) -> Result<T, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::invalid("body", "Required"));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| Error::invalid("body", format!("Malformed JSON: {}", err)))?;
    endpoint.validate_input(&value)?;
    serde_json::from_value(value).map_err(|err| Error::invalid("body", err.to_string()))
}
