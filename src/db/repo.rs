use super::model::{
    ContentPatch, IdeaPatch, NewContent, NewIdea, NewPrompt, NewSource, NewUser, PromptPatch,
    UserPatch,
};
use crate::model::{Content, EntityId, Idea, Prompt, PromptKind, Source, SourceType, User};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open database {normalized}"))?;
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/`, ensure the parent
/// directory exists and ask SQLite to create the file. In-memory URLs pass
/// through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    match query_part {
        Some(q) if q.contains("mode=") => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
            rebuilt.push_str("&mode=rwc");
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn not_found(what: &str, id: i64) -> anyhow::Error {
    anyhow!("{what} {id} not found")
}

// ---- users ----

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        domain: row.try_get("domain")?,
        linkedin_url: row.try_get("linkedin_url")?,
        facebook_url: row.try_get("facebook_url")?,
        instagram_url: row.try_get("instagram_url")?,
        twitter_url: row.try_get("twitter_url")?,
    })
}

#[instrument(skip_all)]
pub async fn list_users(pool: &Pool) -> Result<Vec<User>> {
    let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(user_from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_user(pool: &Pool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn find_user_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_user(pool: &Pool, user: &NewUser) -> Result<User> {
    let email = user.email.trim();
    if email.is_empty() {
        return Err(anyhow!("user email must be non-empty"));
    }
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (created_at, name, email, domain) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(Utc::now())
    .bind(&user.name)
    .bind(email)
    .bind(&user.domain)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to create user {email}"))?;
    get_user(pool, id).await?.ok_or_else(|| not_found("user", id))
}

#[instrument(skip_all)]
pub async fn update_user(pool: &Pool, id: i64, patch: &UserPatch) -> Result<User> {
    let res = sqlx::query(
        "UPDATE users SET name = COALESCE(?, name), email = COALESCE(?, email), \
         domain = COALESCE(?, domain), linkedin_url = COALESCE(?, linkedin_url), \
         facebook_url = COALESCE(?, facebook_url), instagram_url = COALESCE(?, instagram_url), \
         twitter_url = COALESCE(?, twitter_url) WHERE id = ?",
    )
    .bind(&patch.name)
    .bind(&patch.email)
    .bind(&patch.domain)
    .bind(&patch.linkedin_url)
    .bind(&patch.facebook_url)
    .bind(&patch.instagram_url)
    .bind(&patch.twitter_url)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("user", id));
    }
    get_user(pool, id).await?.ok_or_else(|| not_found("user", id))
}

#[instrument(skip_all)]
pub async fn delete_user(pool: &Pool, id: i64) -> Result<()> {
    delete_by_id(pool, "users", "user", id).await
}

// ---- ideas ----

fn idea_from_row(row: &SqliteRow) -> Result<Idea> {
    Ok(Idea {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        priority_score: row.try_get("priority_score")?,
        used_at: row.try_get("used_at")?,
        status: row.try_get("status")?,
    })
}

#[instrument(skip_all)]
pub async fn list_ideas(pool: &Pool) -> Result<Vec<Idea>> {
    let rows = sqlx::query("SELECT * FROM ideas ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(idea_from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_idea(pool: &Pool, id: EntityId) -> Result<Option<Idea>> {
    let row = sqlx::query("SELECT * FROM ideas WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(idea_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_idea(pool: &Pool, user_id: Option<i64>, idea: &NewIdea) -> Result<Idea> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO ideas (created_at, user_id, content, priority_score, status) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(&idea.content)
    .bind(idea.priority_score)
    .bind(&idea.status)
    .fetch_one(pool)
    .await?;
    get_idea(pool, id).await?.ok_or_else(|| not_found("idea", id))
}

#[instrument(skip_all)]
pub async fn update_idea(pool: &Pool, id: EntityId, patch: &IdeaPatch) -> Result<Idea> {
    let res = sqlx::query(
        "UPDATE ideas SET content = COALESCE(?, content), priority_score = COALESCE(?, priority_score), \
         used_at = COALESCE(?, used_at), status = COALESCE(?, status) WHERE id = ?",
    )
    .bind(&patch.content)
    .bind(patch.priority_score)
    .bind(patch.used_at)
    .bind(&patch.status)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("idea", id));
    }
    get_idea(pool, id).await?.ok_or_else(|| not_found("idea", id))
}

#[instrument(skip_all)]
pub async fn delete_idea(pool: &Pool, id: EntityId) -> Result<()> {
    delete_by_id(pool, "ideas", "idea", id).await
}

// ---- contents ----

fn content_from_row(row: &SqliteRow) -> Result<Content> {
    Ok(Content {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        user_id: row.try_get("user_id")?,
        idea_id: row.try_get("idea_id")?,
        platform: row.try_get("platform")?,
        kind: row.try_get("type")?,
        content_url: row.try_get("content_url")?,
        status: row.try_get("status")?,
        content: row.try_get("content")?,
    })
}

#[instrument(skip_all)]
pub async fn list_contents(pool: &Pool) -> Result<Vec<Content>> {
    let rows = sqlx::query("SELECT * FROM contents ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(content_from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_content(pool: &Pool, id: EntityId) -> Result<Option<Content>> {
    let row = sqlx::query("SELECT * FROM contents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(content_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_content(pool: &Pool, user_id: Option<i64>, content: &NewContent) -> Result<Content> {
    let status = content.status.as_deref().unwrap_or("draft");
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO contents (created_at, user_id, idea_id, platform, type, content_url, status, content) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(content.idea_id)
    .bind(&content.platform)
    .bind(&content.kind)
    .bind(&content.content_url)
    .bind(status)
    .bind(&content.content)
    .fetch_one(pool)
    .await?;
    get_content(pool, id).await?.ok_or_else(|| not_found("content", id))
}

#[instrument(skip_all)]
pub async fn update_content(pool: &Pool, id: EntityId, patch: &ContentPatch) -> Result<Content> {
    let res = sqlx::query(
        "UPDATE contents SET idea_id = COALESCE(?, idea_id), platform = COALESCE(?, platform), \
         type = COALESCE(?, type), content_url = COALESCE(?, content_url), \
         status = COALESCE(?, status), content = COALESCE(?, content) WHERE id = ?",
    )
    .bind(patch.idea_id)
    .bind(&patch.platform)
    .bind(&patch.kind)
    .bind(&patch.content_url)
    .bind(&patch.status)
    .bind(&patch.content)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("content", id));
    }
    get_content(pool, id).await?.ok_or_else(|| not_found("content", id))
}

/// Set `status = 'published'` on every listed content row. Returns how many
/// rows changed; unknown ids are ignored.
#[instrument(skip_all, fields(count = ids.len()))]
pub async fn mark_published(pool: &Pool, ids: &[EntityId]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE contents SET status = 'published' WHERE id IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    let res = qb.build().execute(pool).await?;
    Ok(res.rows_affected())
}

#[instrument(skip_all)]
pub async fn delete_content(pool: &Pool, id: EntityId) -> Result<()> {
    delete_by_id(pool, "contents", "content", id).await
}

// ---- sources ----

fn source_from_row(row: &SqliteRow) -> Result<Source> {
    let source_type: String = row.try_get("source_type")?;
    Ok(Source {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        source_type: SourceType::parse(&source_type),
    })
}

#[instrument(skip_all)]
pub async fn list_sources(pool: &Pool) -> Result<Vec<Source>> {
    let rows = sqlx::query("SELECT * FROM sources ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(source_from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_source(pool: &Pool, id: i64) -> Result<Option<Source>> {
    let row = sqlx::query("SELECT * FROM sources WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(source_from_row).transpose()
}

/// Insert a source owned by `user_id`; its type is derived from the URL.
#[instrument(skip_all)]
pub async fn insert_source(pool: &Pool, user_id: i64, source: &NewSource) -> Result<Source> {
    let source_type = source
        .url
        .as_deref()
        .map(SourceType::classify)
        .unwrap_or(SourceType::Website);
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO sources (created_at, user_id, name, url, source_type) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(&source.name)
    .bind(&source.url)
    .bind(source_type.as_str())
    .fetch_one(pool)
    .await?;
    get_source(pool, id).await?.ok_or_else(|| not_found("source", id))
}

/// Patch a source. A new URL re-classifies the source type.
#[instrument(skip_all)]
pub async fn update_source(pool: &Pool, id: i64, patch: &NewSource) -> Result<Source> {
    let source_type = patch.url.as_deref().map(|u| SourceType::classify(u).as_str());
    let res = sqlx::query(
        "UPDATE sources SET name = COALESCE(?, name), url = COALESCE(?, url), \
         source_type = COALESCE(?, source_type) WHERE id = ?",
    )
    .bind(&patch.name)
    .bind(&patch.url)
    .bind(source_type)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("source", id));
    }
    get_source(pool, id).await?.ok_or_else(|| not_found("source", id))
}

#[instrument(skip_all)]
pub async fn delete_source(pool: &Pool, id: i64) -> Result<()> {
    delete_by_id(pool, "sources", "source", id).await
}

// ---- prompts ----

fn prompt_from_row(kind: PromptKind, row: &SqliteRow) -> Result<Prompt> {
    Ok(Prompt {
        id: row.try_get("id")?,
        kind,
        created_at: row.try_get("created_at")?,
        name: row.try_get("name")?,
        prompt: row.try_get("prompt")?,
        status: row.try_get("status")?,
    })
}

#[instrument(skip_all)]
pub async fn list_prompts(pool: &Pool, kind: PromptKind) -> Result<Vec<Prompt>> {
    let sql = format!("SELECT * FROM {} ORDER BY created_at DESC, id DESC", kind.table());
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(|r| prompt_from_row(kind, r)).collect()
}

#[instrument(skip_all)]
pub async fn get_prompt(pool: &Pool, kind: PromptKind, id: i64) -> Result<Option<Prompt>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", kind.table());
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(|r| prompt_from_row(kind, r)).transpose()
}

#[instrument(skip_all)]
pub async fn insert_prompt(pool: &Pool, kind: PromptKind, prompt: &NewPrompt) -> Result<Prompt> {
    let sql = format!(
        "INSERT INTO {} (created_at, name, prompt, status) VALUES (?, ?, ?, ?) RETURNING id",
        kind.table()
    );
    let id: i64 = sqlx::query_scalar(&sql)
        .bind(Utc::now())
        .bind(&prompt.name)
        .bind(&prompt.prompt)
        .bind(&prompt.status)
        .fetch_one(pool)
        .await?;
    get_prompt(pool, kind, id).await?.ok_or_else(|| not_found("prompt", id))
}

#[instrument(skip_all)]
pub async fn update_prompt(pool: &Pool, kind: PromptKind, id: i64, patch: &PromptPatch) -> Result<Prompt> {
    let sql = format!(
        "UPDATE {} SET name = COALESCE(?, name), prompt = COALESCE(?, prompt), status = COALESCE(?, status) WHERE id = ?",
        kind.table()
    );
    let res = sqlx::query(&sql)
        .bind(&patch.name)
        .bind(&patch.prompt)
        .bind(&patch.status)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(not_found("prompt", id));
    }
    get_prompt(pool, kind, id).await?.ok_or_else(|| not_found("prompt", id))
}

/// Make `id` the only active prompt of its kind.
#[instrument(skip_all, fields(table = kind.table(), id = id))]
pub async fn set_active_prompt(pool: &Pool, kind: PromptKind, id: i64) -> Result<Prompt> {
    let mut tx = pool.begin().await?;
    let deactivate = format!("UPDATE {} SET status = 'inactive' WHERE id != ?", kind.table());
    sqlx::query(&deactivate).bind(id).execute(&mut *tx).await?;
    let activate = format!("UPDATE {} SET status = 'active' WHERE id = ?", kind.table());
    let res = sqlx::query(&activate).bind(id).execute(&mut *tx).await?;
    if res.rows_affected() == 0 {
        return Err(not_found("prompt", id));
    }
    tx.commit().await?;
    get_prompt(pool, kind, id).await?.ok_or_else(|| not_found("prompt", id))
}

#[instrument(skip_all)]
pub async fn active_prompt(pool: &Pool, kind: PromptKind) -> Result<Option<Prompt>> {
    let sql = format!(
        "SELECT * FROM {} WHERE status = 'active' ORDER BY created_at DESC, id DESC LIMIT 1",
        kind.table()
    );
    let row = sqlx::query(&sql).fetch_optional(pool).await?;
    row.as_ref().map(|r| prompt_from_row(kind, r)).transpose()
}

#[instrument(skip_all)]
pub async fn delete_prompt(pool: &Pool, kind: PromptKind, id: i64) -> Result<()> {
    delete_by_id(pool, kind.table(), "prompt", id).await
}

async fn delete_by_id(pool: &Pool, table: &'static str, what: &str, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {table} WHERE id = ?");
    let res = sqlx::query(&sql).bind(id).execute(pool).await?;
    if res.rows_affected() == 0 {
        return Err(not_found(what, id));
    }
    Ok(())
}
