//! Live integration tests for wadash-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx test
//! harness. `"../../migrations"` is relative to `crates/wadash-db/`.
//! Run with `cargo test -p wadash-db -- --ignored` against a live server.

use chrono::{NaiveDate, NaiveTime};
use wadash_core::PostStatus;
use wadash_db::{
    admin_list_scheduled_posts, create_assembly, create_scheduled_post, deactivate_assembly,
    delete_scheduled_post, ensure_assembly, get_scheduled_post, list_active_assemblies,
    list_post_groups, list_scheduled_posts_for_user, post_status_counts, seed_default_users,
    update_post_status, DbError, NewAssembly, NewScheduledPost, Page, PostFilters, StatusUpdate,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn admin_id(pool: &sqlx::PgPool) -> i64 {
    seed_default_users(pool).await.expect("seed users");
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = 'admin'")
        .fetch_one(pool)
        .await
        .expect("admin row")
}

async fn insert_post(pool: &sqlx::PgPool, user_id: i64, assembly: &str, groups: &[String]) -> i64 {
    let (row, _) = ensure_assembly(
        pool,
        &NewAssembly {
            name: assembly,
            remarks: None,
            created_by_id: user_id,
        },
    )
    .await
    .expect("ensure assembly");

    create_scheduled_post(
        pool,
        &NewScheduledPost {
            title: "Morning update",
            message_text: Some("Hello"),
            audio_file: None,
            video_file: None,
            image_file: None,
            scheduled_date: NaiveDate::from_ymd_opt(2025, 1, 20).expect("date"),
            scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).expect("time"),
            created_by_id: user_id,
            assembly_id: row.id,
            assembly_name: &row.name,
            groups,
        },
    )
    .await
    .expect("create post")
}

// ---------------------------------------------------------------------------
// Users and assemblies
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn seeding_users_is_idempotent(pool: sqlx::PgPool) {
    assert_eq!(seed_default_users(&pool).await.unwrap(), 2);
    assert_eq!(seed_default_users(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn duplicate_assembly_name_is_reported(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    let new = NewAssembly {
        name: "North",
        remarks: Some("first"),
        created_by_id: admin,
    };
    create_assembly(&pool, &new).await.unwrap();

    let err = create_assembly(&pool, &new).await.unwrap_err();
    assert!(matches!(err, DbError::Duplicate(ref m) if m == "Assembly name already exists"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn deactivated_assembly_leaves_active_list(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    let row = create_assembly(
        &pool,
        &NewAssembly {
            name: "North",
            remarks: None,
            created_by_id: admin,
        },
    )
    .await
    .unwrap();
    assert_eq!(row.created_by.as_deref(), Some("admin"));

    deactivate_assembly(&pool, row.id).await.unwrap();
    assert!(list_active_assemblies(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn ensure_assembly_creates_once(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    let new = NewAssembly {
        name: "South",
        remarks: Some("Created via group upload"),
        created_by_id: admin,
    };
    let (first, created) = ensure_assembly(&pool, &new).await.unwrap();
    let (second, created_again) = ensure_assembly(&pool, &new).await.unwrap();
    assert!(created);
    assert!(!created_again);
    assert_eq!(first.id, second.id);
}

// ---------------------------------------------------------------------------
// Scheduled posts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn post_is_created_with_groups(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    let groups = vec!["Ward 1".to_string(), "Ward 2".to_string()];
    let id = insert_post(&pool, admin, "North", &groups).await;

    let post = get_scheduled_post(&pool, id).await.unwrap();
    assert_eq!(post.status, "pending");
    assert_eq!(post.assembly_name.as_deref(), Some("North"));

    let rows = list_post_groups(&pool, &[id]).await.unwrap();
    let names: Vec<&str> = rows.iter().map(|g| g.group_name.as_str()).collect();
    assert_eq!(names, vec!["Ward 1", "Ward 2"]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn completing_a_post_marks_it_sent(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    let id = insert_post(&pool, admin, "North", &["Ward 1".to_string()]).await;

    let post = update_post_status(
        &pool,
        id,
        &StatusUpdate {
            status: PostStatus::Completed,
            admin_notes: Some("done".to_string()),
            completion_file: Some("North/completion_files/report.xlsx".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(post.status, "completed");
    assert!(post.is_sent);
    assert!(post.sent_at.is_some());
    assert_eq!(post.admin_notes.as_deref(), Some("done"));

    let counts = post_status_counts(&pool).await.unwrap();
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn admin_listing_filters_and_paginates(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    insert_post(&pool, admin, "North", &["Ward 1".to_string()]).await;
    insert_post(&pool, admin, "North", &["Ward 2".to_string()]).await;
    insert_post(&pool, admin, "South", &["Ward 9".to_string()]).await;

    let filters = PostFilters {
        assembly: Some("North".to_string()),
        ..PostFilters::default()
    };
    let page = admin_list_scheduled_posts(&pool, &filters, Page::new(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.pages, 2);

    let own = list_scheduled_posts_for_user(&pool, admin, Page::default())
        .await
        .unwrap();
    assert_eq!(own.pagination.total, 3);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "needs a Postgres server in DATABASE_URL"]
async fn deleting_a_post_removes_its_groups(pool: sqlx::PgPool) {
    let admin = admin_id(&pool).await;
    let id = insert_post(&pool, admin, "North", &["Ward 1".to_string()]).await;

    delete_scheduled_post(&pool, id).await.unwrap();

    assert!(matches!(
        get_scheduled_post(&pool, id).await,
        Err(DbError::NotFound)
    ));
    assert!(list_post_groups(&pool, &[id]).await.unwrap().is_empty());
}
