use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Institution,
    error::{AppError, Result},
    repository::InstitutionDirectory,
};

#[derive(FromRow)]
struct InstitutionRow {
    id: String,
    name: String,
    created_at: NaiveDateTime,
}

pub struct SqliteInstitutionDirectory {
    pool: SqlitePool,
}

impl SqliteInstitutionDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_institution(row: InstitutionRow) -> Result<Institution> {
        Ok(Institution {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl InstitutionDirectory for SqliteInstitutionDirectory {
    async fn institution_for_admin(&self, admin_id: Uuid) -> Result<Option<Uuid>> {
        let institution: Option<Option<String>> = sqlx::query_scalar(
            "SELECT institution_id FROM institution_admins WHERE admin_id = ?",
        )
        .bind(admin_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        institution
            .flatten()
            .map(|id| Uuid::parse_str(&id).map_err(|e| AppError::Database(e.to_string())))
            .transpose()
    }

    async fn create_institution(&self, name: &str) -> Result<Institution> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, InstitutionRow>(
            r#"
            INSERT INTO institutions (id, name, created_at)
            VALUES (?, ?, ?)
            RETURNING id, name, created_at
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Self::row_to_institution(row)
    }

    async fn assign_admin(&self, admin_id: Uuid, institution_id: Option<Uuid>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO institution_admins (admin_id, institution_id)
            VALUES (?, ?)
            ON CONFLICT(admin_id) DO UPDATE SET institution_id = excluded.institution_id
            "#,
        )
        .bind(admin_id.to_string())
        .bind(institution_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
