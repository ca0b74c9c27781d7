use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;

use crate::err::Error;
use crate::models::User;
use crate::AppState;

/// Identity of the caller, attached to the request by [`identify`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Resolves the demo identity and stores it in the request's extensions.
/// No session or token is consulted; a missing user simply leaves the
/// request anonymous. A store failure ends the request with its error.
pub async fn identify<B: Send>(mut req: Request<B>, next: Next<B>) -> Response {
    let state = req.extensions().get::<AppState>().cloned();
    if let Some(state) = state {
        match state.storage.get_user(state.demo_user_id).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(CurrentUser(user));
            }
            Ok(None) => log::debug!("Demo user {} does not exist", state.demo_user_id),
            Err(err) => return Error::from(err).into_response(),
        }
    }
    next.run(req).await
}

pub async fn log_requests<B: Send>(req: Request<B>, next: Next<B>) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    if path.starts_with("/api") {
        log::info!(
            "{} {} {} in {}ms",
            method,
            path,
            response.status().as_u16(),
            started.elapsed().as_millis()
        );
    }
    response
}

#[async_trait]
impl<B: Send> FromRequest<B> for CurrentUser {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        req.extensions()
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(Error::unauthorized)
    }
}
