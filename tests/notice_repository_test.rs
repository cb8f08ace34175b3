use chrono::{Duration, Utc};
use noticeboard::{
    domain::*,
    query::{self, Field, Filter, Intent, NoticeQuery, Value},
    repository::{
        InstitutionDirectory, NoticeRepository, SqliteInstitutionDirectory,
        SqliteNoticeRepository,
    },
    visibility::NoticePolicy,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

async fn pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}

fn notice(provenance: Provenance, audience: Audience, minutes_ago: i64) -> Notice {
    let published_at = Utc::now() - Duration::minutes(minutes_ago);
    Notice {
        id: Uuid::new_v4(),
        title: "Orientation week".to_string(),
        content: "Orientation starts Monday in the main hall.".to_string(),
        audience,
        category: Category::General,
        published: true,
        published_at: Some(published_at),
        provenance,
        created_at: published_at,
        updated_at: published_at,
    }
}

#[tokio::test]
async fn test_notice_crud() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let admin = Uuid::new_v4();

    let created = repo.create(notice(Provenance::System(admin), Audience::Student, 0)).await?;
    assert_eq!(created.provenance, Provenance::System(admin));

    let found = repo.find_by_id(created.id).await?;
    assert_eq!(found.map(|n| n.title), Some("Orientation week".to_string()));

    let guard = query::ownership_guard(&ActorScope::system_admin(admin))?;
    let changes = UpdateNoticeRequest {
        content: Some("Orientation moved to Tuesday in the library.".to_string()),
        ..Default::default()
    };
    let updated = repo.update_where(created.id, &guard, &changes).await?;
    let updated = updated.expect("owner update applies");
    assert_eq!(updated.title, "Orientation week");
    assert_eq!(updated.content, "Orientation moved to Tuesday in the library.");
    assert_eq!(updated.audience, Audience::Student);

    assert!(repo.delete_where(created.id, &guard).await?);
    assert!(repo.find_by_id(created.id).await?.is_none());
    assert!(!repo.delete_where(created.id, &guard).await?);

    Ok(())
}

#[tokio::test]
async fn test_guard_blocks_foreign_writes() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let owner = Uuid::new_v4();

    let created = repo.create(notice(Provenance::System(owner), Audience::Both, 0)).await?;
    let foreign = query::ownership_guard(&ActorScope::system_admin(Uuid::new_v4()))?;

    let changes = UpdateNoticeRequest {
        title: Some("Taken over".to_string()),
        ..Default::default()
    };
    assert!(repo.update_where(created.id, &foreign, &changes).await?.is_none());
    assert!(!repo.delete_where(created.id, &foreign).await?);

    let stored = repo.find_by_id(created.id).await?.expect("still stored");
    assert_eq!(stored.title, "Orientation week");

    Ok(())
}

#[tokio::test]
async fn test_feed_query_orders_newest_first() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let admin = Uuid::new_v4();

    let oldest = repo.create(notice(Provenance::System(admin), Audience::Student, 30)).await?;
    let newest = repo.create(notice(Provenance::System(admin), Audience::Both, 1)).await?;
    let middle = repo.create(notice(Provenance::System(admin), Audience::Student, 10)).await?;
    repo.create(notice(Provenance::System(admin), Audience::Institution, 0)).await?;

    let query = query::compose(&ActorScope::student(), &Intent::Feed, &NoticePolicy::default())?;
    let feed = repo.find_many(&query).await?;
    let ids: Vec<Uuid> = feed.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

    let capped = repo
        .find_many(&NoticeQuery { filter: query.filter.clone(), limit: Some(2) })
        .await?;
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].id, newest.id);

    Ok(())
}

#[tokio::test]
async fn test_equal_timestamps_keep_a_stable_order() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let admin = Uuid::new_v4();
    let at = Utc::now();

    for _ in 0..5 {
        let mut n = notice(Provenance::System(admin), Audience::Student, 0);
        n.published_at = Some(at);
        repo.create(n).await?;
    }

    let query = NoticeQuery { filter: Filter::NotNull(Field::CreatedBySystemAdminId), limit: None };
    let first: Vec<Uuid> = repo.find_many(&query).await?.iter().map(|n| n.id).collect();
    let second: Vec<Uuid> = repo.find_many(&query).await?.iter().map(|n| n.id).collect();
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
async fn test_store_enforces_provenance() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let directory = SqliteInstitutionDirectory::new(pool.clone());
    let institution = directory.create_institution("Provenance College").await?;

    let now = Utc::now().naive_utc();
    for (system_admin, owner_institution) in [
        (None, None),
        (Some(Uuid::new_v4().to_string()), Some(institution.id.to_string())),
    ] {
        let result = sqlx::query(
            r#"
            INSERT INTO notices (
                id, title, content, audience, category, published, published_at,
                created_by_system_admin_id, institution_id, created_at, updated_at
            ) VALUES (?, 'Broken', 'Broken provenance row', 'BOTH', 'GENERAL', 1, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(now)
        .bind(system_admin)
        .bind(owner_institution)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    // Provenance cannot be rewritten after creation.
    let created = repo
        .create(notice(Provenance::Institution(institution.id), Audience::Both, 0))
        .await?;
    let rewrite = sqlx::query(
        "UPDATE notices SET institution_id = NULL, created_by_system_admin_id = ? WHERE id = ?",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(created.id.to_string())
    .execute(&pool)
    .await;
    assert!(rewrite.is_err());

    let stored = repo.find_by_id(created.id).await?.expect("still stored");
    assert_eq!(stored.provenance, Provenance::Institution(institution.id));

    Ok(())
}

#[tokio::test]
async fn test_filter_primitives_render() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let directory = SqliteInstitutionDirectory::new(pool.clone());
    let institution = directory.create_institution("Filter College").await?;
    let admin = Uuid::new_v4();

    let mut academic = notice(Provenance::Institution(institution.id), Audience::Both, 2);
    academic.category = Category::Academic;
    academic.title = "Lab Safety".to_string();
    let academic = repo.create(academic).await?;
    let general = repo.create(notice(Provenance::System(admin), Audience::Institution, 1)).await?;

    let cases = vec![
        (Filter::Equals(Field::Category, Value::Category(Category::Academic)), vec![academic.id]),
        (Filter::NotNull(Field::InstitutionId), vec![academic.id]),
        (
            Filter::OneOf(
                Field::Audience,
                vec![Value::Audience(Audience::Institution), Value::Audience(Audience::Student)],
            ),
            vec![general.id],
        ),
        (Filter::OneOf(Field::Audience, vec![]), vec![]),
        (
            Filter::SubstringOr(Field::Title, Field::Content, "lab saf".to_string()),
            vec![academic.id],
        ),
        (Filter::And(vec![]), vec![general.id, academic.id]),
        (Filter::Or(vec![]), vec![]),
        (Filter::Equals(Field::Published, Value::Bool(true)), vec![general.id, academic.id]),
    ];

    for (filter, expected) in cases {
        let found: Vec<Uuid> = repo
            .find_many(&NoticeQuery { filter: filter.clone(), limit: None })
            .await?
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(found, expected, "filter {:?}", filter);
    }

    Ok(())
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() -> anyhow::Result<()> {
    let pool = pool().await?;
    let repo = SqliteNoticeRepository::new(pool.clone());
    let admin = Uuid::new_v4();
    let guard = query::ownership_guard(&ActorScope::system_admin(admin))?;

    let mut ecole = notice(Provenance::System(admin), Audience::Both, 1);
    ecole.title = "ÉCOLE NORMALE".to_string();
    let ecole = repo.create(ecole).await?;
    let mut strasse = notice(Provenance::System(admin), Audience::Both, 2);
    strasse.content = "Anmeldung in der GROSSEN AULA, ÜBERGANG Süd.".to_string();
    let strasse = repo.create(strasse).await?;

    let search = |needle: &str| NoticeQuery {
        filter: Filter::SubstringOr(Field::Title, Field::Content, needle.to_string()),
        limit: None,
    };
    for (needle, expected) in [
        ("école", vec![ecole.id]),
        ("École Norm", vec![ecole.id]),
        ("übergang süd", vec![strasse.id]),
        ("ÉCOLE ANNEXE", vec![]),
    ] {
        let query = search(needle);
        let found: Vec<Uuid> = repo.find_many(&query).await?.iter().map(|n| n.id).collect();
        assert_eq!(found, expected, "search {:?}", needle);

        let stored = vec![
            repo.find_by_id(ecole.id).await?.expect("stored"),
            repo.find_by_id(strasse.id).await?.expect("stored"),
        ];
        let in_memory: Vec<Uuid> =
            stored.iter().filter(|n| query.filter.matches(n)).map(|n| n.id).collect();
        assert_eq!(in_memory, expected, "in-memory search {:?}", needle);
    }

    // Folded copies follow title and content updates.
    let changes = UpdateNoticeRequest {
        title: Some("ÖFFENTLICHE VORLESUNG".to_string()),
        ..Default::default()
    };
    repo.update_where(ecole.id, &guard, &changes).await?;
    assert!(repo.find_many(&search("école")).await?.is_empty());
    let found: Vec<Uuid> =
        repo.find_many(&search("öffentliche")).await?.iter().map(|n| n.id).collect();
    assert_eq!(found, vec![ecole.id]);

    Ok(())
}

#[tokio::test]
async fn test_directory_lookup() -> anyhow::Result<()> {
    let pool = pool().await?;
    let directory = SqliteInstitutionDirectory::new(pool.clone());
    let institution = directory.create_institution("Lookup College").await?;
    let admin = Uuid::new_v4();

    assert_eq!(directory.institution_for_admin(admin).await?, None);

    directory.assign_admin(admin, Some(institution.id)).await?;
    assert_eq!(directory.institution_for_admin(admin).await?, Some(institution.id));

    directory.assign_admin(admin, None).await?;
    assert_eq!(directory.institution_for_admin(admin).await?, None);

    assert!(directory.create_institution("Lookup College").await.is_err());

    Ok(())
}
