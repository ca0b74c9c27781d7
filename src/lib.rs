pub mod chat;
pub mod client;
pub mod config;
pub mod contract;
pub mod err;
pub mod middleware;
pub mod models;
pub mod predict;
pub mod routes;
pub mod storage;

use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::on;
use axum::{Extension, Json, Router};
use serde::Serialize;

use crate::chat::{ChatCompletion, OpenAiClient};
use crate::config::Config;
use crate::contract::{
    ANNOUNCEMENTS_LIST, ASSIGNMENTS_LIST, ASSIGNMENTS_UPDATE, CHAT_CREATE, COURSES_GET,
    COURSES_LIST, DASHBOARD_GET, PREDICT_CREATE, SCORE_CREATE,
};
use crate::err::Error;
use crate::predict::{Predictor, ProcessPredictor};
use crate::storage::Storage;

pub type Payload<T> = axum::response::Result<Json<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(value))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Err(err)
}

/// Everything a request handler may reach. Shared through an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Identity attached to every request in place of a real session.
    pub demo_user_id: i32,
    pub risk_model: Arc<dyn Predictor>,
    pub score_model: Arc<dyn Predictor>,
    pub chat: Option<Arc<dyn ChatCompletion>>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::from_config(storage, &Config::default())
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &Config) -> Self {
        let chat = config.openai_api_key.as_ref().map(|key| {
            Arc::new(OpenAiClient::new(key.clone(), config.openai_model.clone()))
                as Arc<dyn ChatCompletion>
        });
        Self {
            storage,
            demo_user_id: config.demo_user_id,
            risk_model: Arc::new(ProcessPredictor::script(
                config.predict_program.clone(),
                config.risk_model_script.clone(),
            )),
            score_model: Arc::new(ProcessPredictor::script(
                config.predict_program.clone(),
                config.score_model_script.clone(),
            )),
            chat,
        }
    }

    pub fn with_predictors(mut self, risk: Arc<dyn Predictor>, score: Arc<dyn Predictor>) -> Self {
        self.risk_model = risk;
        self.score_model = score;
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatCompletion>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_demo_user(mut self, id: i32) -> Self {
        self.demo_user_id = id;
        self
    }
}

/// Binds every contract endpoint to its handler.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(DASHBOARD_GET.path, on(DASHBOARD_GET.method.into(), routes::dashboard))
        .route(COURSES_LIST.path, on(COURSES_LIST.method.into(), routes::list_courses))
        .route(COURSES_GET.path, on(COURSES_GET.method.into(), routes::get_course))
        .route(
            ASSIGNMENTS_LIST.path,
            on(ASSIGNMENTS_LIST.method.into(), routes::list_assignments),
        )
        .route(
            ASSIGNMENTS_UPDATE.path,
            on(ASSIGNMENTS_UPDATE.method.into(), routes::update_assignment),
        )
        .route(
            ANNOUNCEMENTS_LIST.path,
            on(ANNOUNCEMENTS_LIST.method.into(), routes::list_announcements),
        )
        .route(SCORE_CREATE.path, on(SCORE_CREATE.method.into(), routes::score))
        .route(PREDICT_CREATE.path, on(PREDICT_CREATE.method.into(), routes::predict))
        .route(CHAT_CREATE.path, on(CHAT_CREATE.method.into(), routes::chat))
        .fallback(err::handler404.into_service())
        .layer(axum::middleware::from_fn(middleware::identify))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(Extension(state))
}
