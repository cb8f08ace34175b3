use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Audience, Category, Notice, Provenance, UpdateNoticeRequest},
    error::{AppError, Result},
    query::{fold_case, Field, Filter, NoticeQuery, Value},
    repository::NoticeRepository,
};

const NOTICE_COLUMNS: &str = "id, title, content, audience, category, published, published_at, \
     created_by_system_admin_id, institution_id, created_at, updated_at";

#[derive(FromRow)]
struct NoticeRow {
    id: String,
    title: String,
    content: String,
    audience: String,
    category: String,
    published: i32,
    published_at: Option<NaiveDateTime>,
    created_by_system_admin_id: Option<String>,
    institution_id: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteNoticeRepository {
    pool: SqlitePool,
}

impl SqliteNoticeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_notice(row: NoticeRow) -> Result<Notice> {
        let provenance = Provenance::from_columns(
            Self::parse_optional_uuid(row.created_by_system_admin_id.as_deref())?,
            Self::parse_optional_uuid(row.institution_id.as_deref())?,
        )
        .map_err(|e| AppError::Database(format!("Notice {}: {}", row.id, e)))?;

        Ok(Notice {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            content: row.content,
            audience: Audience::from_str(&row.audience)
                .ok_or_else(|| AppError::Database(format!("Invalid audience: {}", row.audience)))?,
            category: Category::from_str(&row.category)
                .ok_or_else(|| AppError::Database(format!("Invalid category: {}", row.category)))?,
            published: row.published != 0,
            published_at: row.published_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            provenance,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_optional_uuid(value: Option<&str>) -> Result<Option<Uuid>> {
        value
            .map(|s| Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string())))
            .transpose()
    }

    fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
        match value {
            Value::Uuid(id) => builder.push_bind(id.to_string()),
            Value::Audience(audience) => builder.push_bind(audience.as_str().to_string()),
            Value::Category(category) => builder.push_bind(category.as_str().to_string()),
            Value::Bool(flag) => builder.push_bind(if *flag { 1i32 } else { 0i32 }),
        };
    }

    /// Renders a filter as a parenthesised SQL boolean expression. Every
    /// operand is a bound parameter.
    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) {
        match filter {
            Filter::Equals(field, value) => {
                builder.push(field.column()).push(" = ");
                Self::push_value(builder, value);
            }
            Filter::NotNull(field) => {
                builder.push(field.column()).push(" IS NOT NULL");
            }
            Filter::OneOf(field, values) => {
                if values.is_empty() {
                    builder.push("0");
                    return;
                }
                builder.push(field.column()).push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    Self::push_value(builder, value);
                }
                builder.push(")");
            }
            Filter::SubstringOr(a, b, needle) => {
                let needle = fold_case(needle);
                builder.push("(");
                Self::push_contains(builder, *a, &needle);
                builder.push(" OR ");
                Self::push_contains(builder, *b, &needle);
                builder.push(")");
            }
            Filter::And(filters) => Self::push_joined(builder, filters, " AND ", "1"),
            Filter::Or(filters) => Self::push_joined(builder, filters, " OR ", "0"),
        }
    }

    /// `needle` must already be case-folded. Fields without a folded
    /// column never match, as in `Filter::matches`.
    fn push_contains(builder: &mut QueryBuilder<'_, Sqlite>, field: Field, needle: &str) {
        match field.folded_column() {
            Some(column) => {
                builder
                    .push("instr(")
                    .push(column)
                    .push(", ")
                    .push_bind(needle.to_string())
                    .push(") > 0");
            }
            None => {
                builder.push("0");
            }
        }
    }

    fn push_joined(
        builder: &mut QueryBuilder<'_, Sqlite>,
        filters: &[Filter],
        separator: &str,
        empty: &str,
    ) {
        if filters.is_empty() {
            builder.push(empty);
            return;
        }
        builder.push("(");
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 {
                builder.push(separator);
            }
            builder.push("(");
            Self::push_filter(builder, filter);
            builder.push(")");
        }
        builder.push(")");
    }
}

#[async_trait]
impl NoticeRepository for SqliteNoticeRepository {
    async fn create(&self, notice: Notice) -> Result<Notice> {
        let id_str = notice.id.to_string();
        let published_int = if notice.published { 1i32 } else { 0i32 };
        let published_at_naive = notice.published_at.map(|dt| dt.naive_utc());
        let system_admin_str = notice.provenance.system_admin_id().map(|id| id.to_string());
        let institution_str = notice.provenance.institution_id().map(|id| id.to_string());

        sqlx::query(
            r#"
            INSERT INTO notices (
                id, title, content, title_folded, content_folded, audience, category,
                published, published_at, created_by_system_admin_id, institution_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(fold_case(&notice.title))
        .bind(fold_case(&notice.content))
        .bind(notice.audience.as_str())
        .bind(notice.category.as_str())
        .bind(published_int)
        .bind(published_at_naive)
        .bind(system_admin_str)
        .bind(institution_str)
        .bind(notice.created_at.naive_utc())
        .bind(notice.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(notice.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created notice".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notice>> {
        let row = sqlx::query_as::<_, NoticeRow>(&format!(
            "SELECT {} FROM notices WHERE id = ?",
            NOTICE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_notice(r)?)),
            None => Ok(None),
        }
    }

    async fn find_many(&self, query: &NoticeQuery) -> Result<Vec<Notice>> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM notices WHERE ", NOTICE_COLUMNS));
        Self::push_filter(&mut builder, &query.filter);
        builder.push(" ORDER BY published_at DESC, id DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        tracing::debug!("Notice query: {}", builder.sql());

        let rows = builder
            .build_query_as::<NoticeRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_notice).collect()
    }

    async fn update_where(
        &self,
        id: Uuid,
        guard: &Filter,
        changes: &UpdateNoticeRequest,
    ) -> Result<Option<Notice>> {
        let now = Utc::now().naive_utc();
        let published_int = changes.published.map(|p| if p { 1i32 } else { 0i32 });

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("UPDATE notices SET title = COALESCE(");
        builder
            .push_bind(changes.title.clone())
            .push(", title), content = COALESCE(")
            .push_bind(changes.content.clone())
            .push(", content), title_folded = COALESCE(")
            .push_bind(changes.title.as_deref().map(fold_case))
            .push(", title_folded), content_folded = COALESCE(")
            .push_bind(changes.content.as_deref().map(fold_case))
            .push(", content_folded), audience = COALESCE(")
            .push_bind(changes.audience.map(|a| a.as_str().to_string()))
            .push(", audience), category = COALESCE(")
            .push_bind(changes.category.map(|c| c.as_str().to_string()))
            .push(", category), published = COALESCE(")
            .push_bind(published_int)
            .push(", published), updated_at = ")
            .push_bind(now)
            .push(" WHERE id = ")
            .push_bind(id.to_string())
            .push(" AND ");
        Self::push_filter(&mut builder, guard);
        builder.push(" RETURNING ").push(NOTICE_COLUMNS);

        let row = builder
            .build_query_as::<NoticeRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_notice(r)?)),
            None => Ok(None),
        }
    }

    async fn delete_where(&self, id: Uuid, guard: &Filter) -> Result<bool> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("DELETE FROM notices WHERE id = ");
        builder.push_bind(id.to_string()).push(" AND ");
        Self::push_filter(&mut builder, guard);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
