pub mod notice_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::repository::*;
use crate::visibility::NoticePolicy;
use notice_service::NoticeService;

pub struct ServiceContext {
    pub notice_repo: Arc<dyn NoticeRepository>,
    pub institution_directory: Arc<dyn InstitutionDirectory>,
    pub notice_service: Arc<NoticeService>,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, policy: NoticePolicy) -> Self {
        let notice_repo: Arc<dyn NoticeRepository> =
            Arc::new(SqliteNoticeRepository::new(db_pool.clone()));
        let institution_directory: Arc<dyn InstitutionDirectory> =
            Arc::new(SqliteInstitutionDirectory::new(db_pool));

        let notice_service = Arc::new(NoticeService::new(
            notice_repo.clone(),
            institution_directory.clone(),
            policy,
        ));

        Self {
            notice_repo,
            institution_directory,
            notice_service,
        }
    }
}
