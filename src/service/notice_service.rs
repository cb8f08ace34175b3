use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    query::{self, Intent},
    repository::{InstitutionDirectory, NoticeRepository},
    visibility::{self, Access, NoticePolicy},
};

/// Role-gated notice operations. Every storage error leaving this type has
/// been collapsed to `AppError::Internal`.
pub struct NoticeService {
    repo: Arc<dyn NoticeRepository>,
    directory: Arc<dyn InstitutionDirectory>,
    policy: NoticePolicy,
}

impl NoticeService {
    pub fn new(
        repo: Arc<dyn NoticeRepository>,
        directory: Arc<dyn InstitutionDirectory>,
        policy: NoticePolicy,
    ) -> Self {
        Self { repo, directory, policy }
    }

    /// Builds the request scope. An institution admin with no institution
    /// still gets a scope, which every operation then rejects.
    pub async fn resolve_scope(&self, actor: &Actor) -> Result<ActorScope> {
        match actor.role {
            Role::SystemAdmin => Ok(ActorScope::system_admin(actor.id)),
            Role::Student => Ok(ActorScope::student()),
            Role::InstitutionAdmin => {
                let institution = self
                    .directory
                    .institution_for_admin(actor.id)
                    .await
                    .map_err(AppError::from_storage)?;
                if institution.is_none() {
                    tracing::warn!("Institution admin {} has no institution assigned", actor.id);
                }
                Ok(ActorScope::institution_admin(institution))
            }
        }
    }

    pub async fn create_system_notice(
        &self,
        scope: &ActorScope,
        request: CreateSystemNoticeRequest,
    ) -> Result<Notice> {
        let admin_id = scope.require_system_admin()?;
        let request = request.normalized();
        request.validate()?;

        let now = Utc::now();
        let notice = Notice {
            id: Uuid::new_v4(),
            title: request.title,
            content: request.content,
            audience: request.audience,
            category: request.category.unwrap_or(Category::General),
            published: true,
            published_at: Some(now),
            provenance: Provenance::System(admin_id),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(notice).await.map_err(AppError::from_storage)?;
        tracing::info!(
            "System admin {} created notice {} for {}",
            admin_id,
            created.id,
            created.audience.as_str()
        );
        Ok(created)
    }

    pub async fn create_institution_notice(
        &self,
        scope: &ActorScope,
        request: CreateInstitutionNoticeRequest,
    ) -> Result<Notice> {
        let institution_id = scope.require_institution()?;
        let request = request.normalized();
        request.validate()?;

        let now = Utc::now();
        let notice = Notice {
            id: Uuid::new_v4(),
            title: request.title,
            content: request.content,
            audience: Audience::Both,
            category: Category::Academic,
            published: true,
            published_at: Some(now),
            provenance: Provenance::Institution(institution_id),
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(notice).await.map_err(AppError::from_storage)?;
        tracing::info!("Institution {} created notice {}", institution_id, created.id);
        Ok(created)
    }

    pub async fn update_notice(
        &self,
        scope: &ActorScope,
        id: Uuid,
        request: UpdateNoticeRequest,
    ) -> Result<Notice> {
        let guard = query::ownership_guard(scope)?;
        let request = request.normalized();
        request.validate()?;

        let existing = self.load_writable(scope, id).await?;
        if existing.is_institutional() && (request.audience.is_some() || request.category.is_some())
        {
            return Err(AppError::Validation(
                "audience and category cannot be changed on institution notices".to_string(),
            ));
        }

        // The guard is re-applied in the UPDATE itself, so a notice deleted
        // since the read above comes back as not found.
        let updated = self
            .repo
            .update_where(id, &guard, &request)
            .await
            .map_err(AppError::from_storage)?
            .ok_or_else(AppError::notice_not_found)?;

        tracing::info!("Notice {} updated by {}", id, scope.role.as_str());
        Ok(updated)
    }

    pub async fn delete_notice(&self, scope: &ActorScope, id: Uuid) -> Result<()> {
        let guard = query::ownership_guard(scope)?;
        self.load_writable(scope, id).await?;

        let deleted = self
            .repo
            .delete_where(id, &guard)
            .await
            .map_err(AppError::from_storage)?;
        if !deleted {
            return Err(AppError::notice_not_found());
        }

        tracing::info!("Notice {} deleted by {}", id, scope.role.as_str());
        Ok(())
    }

    pub async fn get_by_id(&self, scope: &ActorScope, id: Uuid) -> Result<Notice> {
        scope.ensure_valid()?;

        let notice = self
            .repo
            .find_by_id(id)
            .await
            .map_err(AppError::from_storage)?
            .ok_or_else(AppError::notice_not_found)?;

        match visibility::can_read(scope, &notice, &self.policy) {
            Access::Granted => Ok(notice),
            Access::Denied(reason) => {
                tracing::debug!("Read of notice {} denied: {:?}", id, reason);
                Err(AppError::notice_not_found())
            }
        }
    }

    pub async fn list_feed(&self, scope: &ActorScope) -> Result<Vec<Notice>> {
        let query = query::compose(scope, &Intent::Feed, &self.policy)?;
        self.repo.find_many(&query).await.map_err(AppError::from_storage)
    }

    pub async fn list_mine(&self, scope: &ActorScope, search: NoticeSearch) -> Result<Vec<Notice>> {
        let query = query::compose(scope, &Intent::Mine(search), &self.policy)?;
        self.repo.find_many(&query).await.map_err(AppError::from_storage)
    }

    /// Fetches a notice the scope may modify. Absence and foreign ownership
    /// both come back as not found.
    async fn load_writable(&self, scope: &ActorScope, id: Uuid) -> Result<Notice> {
        let notice = self
            .repo
            .find_by_id(id)
            .await
            .map_err(AppError::from_storage)?
            .ok_or_else(AppError::notice_not_found)?;

        match visibility::can_write(scope, &notice) {
            Access::Granted => Ok(notice),
            Access::Denied(reason) => {
                tracing::debug!("Write to notice {} denied: {:?}", id, reason);
                Err(AppError::notice_not_found())
            }
        }
    }
}
