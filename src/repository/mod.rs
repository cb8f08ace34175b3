use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;
use crate::query::{Filter, NoticeQuery};

pub mod notice_repository;
pub mod institution_repository;

pub use notice_repository::SqliteNoticeRepository;
pub use institution_repository::SqliteInstitutionDirectory;

#[async_trait]
pub trait NoticeRepository: Send + Sync {
    async fn create(&self, notice: Notice) -> Result<Notice>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notice>>;
    async fn find_many(&self, query: &NoticeQuery) -> Result<Vec<Notice>>;
    /// Applies the defined fields of `changes` only if the row still matches
    /// `guard`. Returns `None` when no row matched.
    async fn update_where(
        &self,
        id: Uuid,
        guard: &Filter,
        changes: &UpdateNoticeRequest,
    ) -> Result<Option<Notice>>;
    /// Deletes the row only if it still matches `guard`. Returns whether a row was removed.
    async fn delete_where(&self, id: Uuid, guard: &Filter) -> Result<bool>;
}

/// Maps institution admin accounts to the institution they act for.
#[async_trait]
pub trait InstitutionDirectory: Send + Sync {
    async fn institution_for_admin(&self, admin_id: Uuid) -> Result<Option<Uuid>>;
    async fn create_institution(&self, name: &str) -> Result<Institution>;
    async fn assign_admin(&self, admin_id: Uuid, institution_id: Option<Uuid>) -> Result<()>;
}
