use std::collections::{BTreeSet, HashMap};

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::AppState;
use crate::auth::middleware::AuthContext;
use crate::error::AppError;
use crate::models::media::LOCAL_SERVER_LOCATION;
use crate::models::tag::Tag;
use crate::query::{Paginated, SortOrder, TagSortBy, page_bounds, page_links};
use crate::recommend::{self, RelatedTag};
use crate::tag_match::push_tag_filter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/populate", post(populate_tags))
        .route("/check-tags", post(check_tags))
        .route("/recommendations/{tag_name}", get(recommendations))
}

// --- Listing ---

#[derive(Debug, Deserialize)]
struct ListTagsParams {
    page: Option<i64>,
    limit: Option<i64>,
    is_protected: Option<bool>,
    #[serde(default)]
    is_hidden: bool,
    #[serde(rename = "type")]
    tag_type: Option<String>,
    #[serde(default)]
    sort_by: TagSortBy,
    #[serde(default)]
    sort_order: SortOrder,
    #[serde(default)]
    check_media: bool,
    #[serde(default)]
    popularity: bool,
}

#[derive(Debug, Serialize)]
struct TagListItem {
    #[serde(flatten)]
    tag: Tag,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
}

fn push_tag_visibility(
    qb: &mut QueryBuilder<'_, Postgres>,
    auth: &AuthContext,
    params: &ListTagsParams,
) {
    if auth.is_authenticated() {
        if let Some(is_protected) = params.is_protected {
            qb.push(" AND t.is_protected = ").push_bind(is_protected);
        }
    } else {
        qb.push(" AND t.is_protected = FALSE");
    }

    qb.push(" AND t.is_hidden = ").push_bind(params.is_hidden);

    if let Some(tag_type) = &params.tag_type {
        qb.push(" AND t.type = ").push_bind(tag_type.clone());
    }
}

async fn list_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListTagsParams>,
) -> Result<Json<Paginated<TagListItem>>, AppError> {
    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;

    let mut count_qb =
        QueryBuilder::new("SELECT COUNT(*) FROM tags t WHERE t.deleted_at IS NULL");
    push_tag_visibility(&mut count_qb, &auth, &params);
    let count: i64 = count_qb.build_query_scalar().fetch_one(&state.db).await?;

    let mut qb = if params.popularity {
        // Rank by live usage in the normalized join table.
        QueryBuilder::new(
            "SELECT t.*, COALESCE(u.uses, 0) AS uses FROM tags t
             LEFT JOIN (
                 SELECT tag_name, COUNT(*) AS uses FROM media_tags GROUP BY tag_name
             ) u ON u.tag_name = t.name
             WHERE t.deleted_at IS NULL",
        )
    } else {
        QueryBuilder::new("SELECT t.* FROM tags t WHERE t.deleted_at IS NULL")
    };
    push_tag_visibility(&mut qb, &auth, &params);
    if params.popularity {
        qb.push(" ORDER BY uses DESC, t.id");
    } else {
        qb.push(" ORDER BY t.")
            .push(params.sort_by.as_column())
            .push(" ")
            .push(params.sort_order.as_sql());
    }
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let tags: Vec<Tag> = qb.build_query_as().fetch_all(&state.db).await?;

    let mut thumbnails: HashMap<String, String> = HashMap::new();
    if params.check_media && !tags.is_empty() {
        let names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();
        let rows: Vec<(String, Option<String>, Option<String>, String, String)> = sqlx::query_as(
            "SELECT DISTINCT ON (mt.tag_name)
                    mt.tag_name, m.thumbnail_path, m.thumbnail_md, m.file_path, m.server_location
             FROM media_tags mt
             JOIN media m ON m.id = mt.media_id
             WHERE mt.tag_name = ANY($1) AND m.deleted_at IS NULL
             ORDER BY mt.tag_name, m.id DESC",
        )
        .bind(&names)
        .fetch_all(&state.db)
        .await?;

        for (name, thumbnail_path, thumbnail_md, file_path, server_location) in rows {
            let path = thumbnail_path.or(thumbnail_md).unwrap_or(file_path);
            let url = if server_location == LOCAL_SERVER_LOCATION {
                state.config.file_url(&path)
            } else {
                path
            };
            thumbnails.insert(name, url);
        }
    }

    let (next, prev) = page_links(page, limit, count);
    Ok(Json(Paginated {
        data: tags
            .into_iter()
            .map(|tag| {
                let thumbnail = thumbnails.remove(&tag.name);
                TagListItem { tag, thumbnail }
            })
            .collect(),
        next,
        prev,
        count,
    }))
}

// --- Population / normalization ---

#[derive(Debug, Default, Deserialize)]
struct PopulateRequest {
    #[serde(default)]
    start_id: i32,
}

#[derive(Debug, Serialize)]
struct PopulateResponse {
    message: String,
    created_count: usize,
    restored_count: usize,
    created: Vec<String>,
    restored: Vec<String>,
}

/// Distinct trimmed tag names across a set of legacy comma lists.
fn collect_tag_names<'a, I>(tag_columns: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut names = BTreeSet::new();
    for column in tag_columns.into_iter().flatten() {
        for tag in column.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() {
                names.insert(tag.to_string());
            }
        }
    }
    names
}

/// Reconcile the legacy `media.tags` column with the tag registry and the
/// `media_tags` join table. Idempotent: a second run over unchanged data
/// creates and restores nothing. Deliberately not one transaction — a
/// crash mid-run leaves partial inserts that the next run converges over.
async fn populate_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Option<Json<PopulateRequest>>,
) -> Result<Json<PopulateResponse>, AppError> {
    auth.require_authenticated()?;
    let start_id = body.map(|Json(b)| b.start_id).unwrap_or_default();

    let tag_columns: Vec<Option<String>> =
        sqlx::query_scalar("SELECT tags FROM media WHERE id >= $1 AND deleted_at IS NULL")
            .bind(start_id)
            .fetch_all(&state.db)
            .await?;
    let live_names = collect_tag_names(tag_columns.iter().map(|c| c.as_deref()));

    let existing: Vec<(String, bool)> =
        sqlx::query_as("SELECT name, deleted_at IS NOT NULL FROM tags")
            .fetch_all(&state.db)
            .await?;
    let existing: HashMap<String, bool> = existing.into_iter().collect();

    let mut created = Vec::new();
    let mut restored = Vec::new();
    for name in &live_names {
        match existing.get(name) {
            None => created.push(name.clone()),
            Some(true) => restored.push(name.clone()),
            Some(false) => {}
        }
    }

    // New tags land hidden so they can be reviewed before showing up in
    // public listings.
    for name in &created {
        sqlx::query("INSERT INTO tags (name, is_hidden) VALUES ($1, TRUE) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&state.db)
            .await?;
    }

    if !restored.is_empty() {
        sqlx::query("UPDATE tags SET deleted_at = NULL WHERE name = ANY($1)")
            .bind(&restored)
            .execute(&state.db)
            .await?;
    }

    // Mirror live pairs into the normalized join table now that every name
    // exists in the registry.
    sqlx::query(
        "INSERT INTO media_tags (media_id, tag_name)
         SELECT m.id, trim(t)
         FROM media m, unnest(string_to_array(m.tags, ',')) AS t
         JOIN tags tg ON tg.name = trim(t)
         WHERE m.id >= $1 AND m.deleted_at IS NULL
         ON CONFLICT DO NOTHING",
    )
    .bind(start_id)
    .execute(&state.db)
    .await?;

    tracing::info!(
        created = created.len(),
        restored = restored.len(),
        "Tags populated"
    );

    Ok(Json(PopulateResponse {
        message: "Tags populated successfully".into(),
        created_count: created.len(),
        restored_count: restored.len(),
        created,
        restored,
    }))
}

#[derive(Debug, Serialize)]
struct CheckTagsResponse {
    message: String,
    removed_count: usize,
    removed: Vec<String>,
}

/// Soft-delete tags no live media references, using the same legacy
/// matching semantics as the listing filter (including its looseness).
async fn check_tags(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<CheckTagsResponse>, AppError> {
    auth.require_authenticated()?;

    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM tags WHERE deleted_at IS NULL")
        .fetch_all(&state.db)
        .await?;

    let mut removed = Vec::new();
    for name in names {
        let include = vec![name.to_lowercase()];
        let mut qb = QueryBuilder::new(
            "SELECT EXISTS (SELECT 1 FROM media media WHERE media.deleted_at IS NULL",
        );
        push_tag_filter(
            &mut qb,
            "media",
            &include,
            true,
            &[],
            state.config.tag_match_mode,
        );
        qb.push(")");
        let in_use: bool = qb.build_query_scalar().fetch_one(&state.db).await?;

        if !in_use {
            sqlx::query("UPDATE tags SET deleted_at = NOW() WHERE name = $1")
                .bind(&name)
                .execute(&state.db)
                .await?;
            removed.push(name);
        }
    }

    Ok(Json(CheckTagsResponse {
        message: "Unused tags removed".into(),
        removed_count: removed.len(),
        removed,
    }))
}

// --- Recommendations ---

#[derive(Debug, Deserialize)]
struct RecommendationParams {
    is_protected: Option<bool>,
}

#[derive(Debug, Serialize)]
struct RecommendationsResponse {
    data: Vec<RelatedTag>,
}

async fn recommendations(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(tag_name): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    // Protected tags surface only for an admin explicitly asking for them.
    let include_protected = auth.is_admin() && params.is_protected == Some(true);

    let seed = sqlx::query_as::<_, Tag>(
        "SELECT * FROM tags WHERE LOWER(name) = LOWER($1) AND deleted_at IS NULL",
    )
    .bind(&tag_name)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    if seed.is_protected && !include_protected {
        return Err(AppError::NotFound("Tag not found".into()));
    }

    let data = recommend::related_tags(&state.db, &state.config, &seed, include_protected).await?;
    Ok(Json(RecommendationsResponse { data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_tag_names_trims_and_dedupes() {
        let columns = vec![
            Some("cat, dog ,beach"),
            None,
            Some("dog,,  "),
            Some("alps"),
        ];
        let names = collect_tag_names(columns);
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["alps", "beach", "cat", "dog"]);
    }

    #[test]
    fn collect_tag_names_of_nothing_is_empty() {
        assert!(collect_tag_names([None, Some("")]).is_empty());
    }
}
