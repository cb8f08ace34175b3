use clap::Parser;
use fake::{
    faker::{company::en::CompanyName, lorem::en::{Paragraph, Sentence}},
    Fake,
};
use noticeboard::{
    domain::{
        Actor, Audience, Category, CreateInstitutionNoticeRequest, CreateSystemNoticeRequest,
        Role,
    },
    repository::InstitutionDirectory,
    service::ServiceContext,
    visibility::NoticePolicy,
};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Populate a development database with institutions, admins and notices.
#[derive(Parser, Debug)]
#[command(name = "seed")]
struct Args {
    /// Database to seed
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://noticeboard.db?mode=rwc")]
    database_url: String,

    /// Number of institutions to create
    #[arg(long, default_value_t = 3)]
    institutions: usize,

    /// Notices created per institution and per system audience
    #[arg(long, default_value_t = 4)]
    notices: usize,
}

fn title() -> String {
    let sentence: String = Sentence(3..8).fake();
    sentence.chars().take(255).collect()
}

fn content() -> String {
    Paragraph(2..4).fake()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let context = ServiceContext::new(db_pool, NoticePolicy::default());
    let directory = &context.institution_directory;
    let notices = &context.notice_service;

    // System admin notices, one batch per audience
    println!("📢 Creating system notices...");
    let system_admin = Actor { role: Role::SystemAdmin, id: Uuid::new_v4() };
    let system_scope = notices.resolve_scope(&system_admin).await?;
    for audience in [Audience::Student, Audience::Institution, Audience::Both] {
        for i in 0..args.notices {
            let category = if i % 2 == 0 { Category::General } else { Category::Academic };
            notices
                .create_system_notice(&system_scope, CreateSystemNoticeRequest {
                    title: title(),
                    content: content(),
                    audience,
                    category: Some(category),
                })
                .await?;
        }
    }
    println!("  ✅ System admin {} ({} notices)", system_admin.id, args.notices * 3);

    println!("🏫 Creating institutions...");
    for _ in 0..args.institutions {
        let name: String = CompanyName().fake();
        let institution = directory
            .create_institution(&format!("{} University {}", name, &Uuid::new_v4().to_string()[..4]))
            .await?;

        let admin = Actor { role: Role::InstitutionAdmin, id: Uuid::new_v4() };
        directory.assign_admin(admin.id, Some(institution.id)).await?;

        let scope = notices.resolve_scope(&admin).await?;
        for _ in 0..args.notices {
            notices
                .create_institution_notice(&scope, CreateInstitutionNoticeRequest {
                    title: title(),
                    content: content(),
                })
                .await?;
        }
        println!("  ✅ {} (admin {})", institution.name, admin.id);
    }

    println!("\n✨ Database seeding complete!");
    println!("\n📝 Send requests with:");
    println!("  x-actor-role: SYSTEM_ADMIN | INSTITUTION_ADMIN | STUDENT");
    println!("  x-actor-id: <one of the ids above, any uuid for students>");

    Ok(())
}
