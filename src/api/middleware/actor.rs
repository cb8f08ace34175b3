use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    domain::{Actor, Role},
    error::AppError,
};

/// Headers set by the authentication gateway in front of this service.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct CurrentActor {
    pub actor: Actor,
}

pub async fn require_actor(mut request: Request, next: Next) -> Result<Response, AppError> {
    let actor = actor_from_headers(request.headers()).ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentActor { actor });

    Ok(next.run(request).await)
}

fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let role = headers
        .get(ACTOR_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Role::from_str(v.trim()))?;
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())?;

    Some(Actor { role, id })
}
