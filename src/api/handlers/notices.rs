use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{middleware::actor::CurrentActor, state::AppState},
    domain::{
        ActorScope, Audience, Category, CreateInstitutionNoticeRequest,
        CreateSystemNoticeRequest, Notice, NoticeSearch, UpdateNoticeRequest,
    },
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct ListMineQuery {
    pub audience: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListMineQuery {
    fn into_search(self) -> Result<NoticeSearch> {
        let audience = match self.audience.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                Audience::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown audience: {}", s)))?,
            ),
            None => None,
        };
        let category = match self.category.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                Category::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown category: {}", s)))?,
            ),
            None => None,
        };

        Ok(NoticeSearch {
            audience,
            category,
            search: self.search,
        })
    }
}

async fn scope_of(state: &AppState, current: &CurrentActor) -> Result<ActorScope> {
    state
        .service_context
        .notice_service
        .resolve_scope(&current.actor)
        .await
}

pub async fn create_system(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentActor>,
    Json(request): Json<CreateSystemNoticeRequest>,
) -> Result<(StatusCode, Json<Notice>)> {
    let scope = scope_of(&state, &current).await?;
    let notice = state
        .service_context
        .notice_service
        .create_system_notice(&scope, request)
        .await?;

    Ok((StatusCode::CREATED, Json(notice)))
}

pub async fn create_institution(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentActor>,
    Json(request): Json<CreateInstitutionNoticeRequest>,
) -> Result<(StatusCode, Json<Notice>)> {
    let scope = scope_of(&state, &current).await?;
    let notice = state
        .service_context
        .notice_service
        .create_institution_notice(&scope, request)
        .await?;

    Ok((StatusCode::CREATED, Json(notice)))
}

pub async fn feed(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentActor>,
) -> Result<Json<Vec<Notice>>> {
    let scope = scope_of(&state, &current).await?;
    let notices = state.service_context.notice_service.list_feed(&scope).await?;

    Ok(Json(notices))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentActor>,
    Query(params): Query<ListMineQuery>,
) -> Result<Json<Vec<Notice>>> {
    let search = params.into_search()?;
    let scope = scope_of(&state, &current).await?;
    let notices = state
        .service_context
        .notice_service
        .list_mine(&scope, search)
        .await?;

    Ok(Json(notices))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentActor>,
) -> Result<Json<Notice>> {
    let scope = scope_of(&state, &current).await?;
    let notice = state.service_context.notice_service.get_by_id(&scope, id).await?;

    Ok(Json(notice))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentActor>,
    Json(request): Json<UpdateNoticeRequest>,
) -> Result<Json<Notice>> {
    let scope = scope_of(&state, &current).await?;
    let notice = state
        .service_context
        .notice_service
        .update_notice(&scope, id, request)
        .await?;

    Ok(Json(notice))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentActor>,
) -> Result<StatusCode> {
    let scope = scope_of(&state, &current).await?;
    state
        .service_context
        .notice_service
        .delete_notice(&scope, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
