use axum::extract::{Path, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Postgres, QueryBuilder};

use crate::AppState;
use crate::auth::middleware::AuthContext;
use crate::batch::BatchFailure;
use crate::error::AppError;
use crate::models::media::{FileType, LOCAL_SERVER_LOCATION, Media, MediaResponse};
use crate::models::playlist::Favorite;
use crate::query::{MediaSortBy, Paginated, SortOrder, page_bounds, page_links};
use crate::tag_match::{parse_tag_list, push_tag_filter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media))
        .route(
            "/batch",
            post(batch_insert).put(batch_update).delete(batch_delete),
        )
        .route("/batch/tags", put(batch_add_tags).delete(batch_remove_tags))
        .route("/batch/protected", put(batch_protected))
        .route("/check-files", get(check_files))
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/{media_id}", delete(remove_favorite))
        .route("/{id}", delete(delete_media))
}

// --- Listing ---

#[derive(Debug, Deserialize)]
struct ListMediaParams {
    page: Option<i64>,
    limit: Option<i64>,
    tags: Option<String>,
    tag_exclude: Option<String>,
    #[serde(default)]
    match_all_tags: bool,
    file_type: Option<FileType>,
    is_protected: Option<bool>,
    #[serde(default)]
    is_random: bool,
    #[serde(default)]
    sort_by: MediaSortBy,
    #[serde(default)]
    sort_order: SortOrder,
}

/// Append the shared WHERE conditions for a media listing. The caller has
/// already pushed `... FROM media WHERE media.deleted_at IS NULL`.
fn push_media_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    auth: &AuthContext,
    params: &ListMediaParams,
    state: &AppState,
) {
    // Visibility: only admins may filter on protection explicitly; everyone
    // else is forced to the public view no matter what they asked for.
    if auth.is_admin() {
        if let Some(is_protected) = params.is_protected {
            qb.push(" AND media.is_protected = ").push_bind(is_protected);
        }
    } else {
        qb.push(" AND media.is_protected = FALSE");
    }

    if let Some(file_type) = params.file_type {
        qb.push(" AND media.file_type = ").push_bind(file_type.as_str());
    }

    let include = params.tags.as_deref().map(parse_tag_list).unwrap_or_default();
    let exclude = params
        .tag_exclude
        .as_deref()
        .map(parse_tag_list)
        .unwrap_or_default();
    push_tag_filter(
        qb,
        "media",
        &include,
        params.match_all_tags,
        &exclude,
        state.config.tag_match_mode,
    );
}

async fn list_media(
    State(state): State<AppState>,
    auth: AuthContext,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListMediaParams>,
) -> Result<Response, AppError> {
    let cache_key = format!(
        "medias:admin={}:{}",
        auth.is_admin(),
        raw_query.as_deref().unwrap_or("")
    );
    if !params.is_random
        && let Some(cached) = state.cache.get(&cache_key)
    {
        return Ok(json_body(cached));
    }

    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;

    let mut count_qb = QueryBuilder::new(
        "SELECT COUNT(*) FROM media media WHERE media.deleted_at IS NULL",
    );
    push_media_filters(&mut count_qb, &auth, &params, &state);
    let count: i64 = count_qb
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut qb =
        QueryBuilder::new("SELECT * FROM media media WHERE media.deleted_at IS NULL");
    push_media_filters(&mut qb, &auth, &params, &state);
    if params.is_random {
        qb.push(" ORDER BY random() LIMIT ").push_bind(limit);
    } else {
        qb.push(" ORDER BY media.")
            .push(params.sort_by.as_column())
            .push(" ")
            .push(params.sort_order.as_sql())
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
    }
    let rows: Vec<Media> = qb.build_query_as().fetch_all(&state.db).await?;

    let (next, prev) = page_links(page, limit, count);
    let body = Paginated {
        data: rows
            .into_iter()
            .map(|m| m.into_response(&state.config))
            .collect::<Vec<MediaResponse>>(),
        next,
        prev,
        count,
    };

    let serialized = serde_json::to_string(&body)
        .map_err(|e| AppError::Internal(format!("Failed to serialize listing: {e}")))?;
    if !params.is_random {
        state.cache.put(cache_key, serialized.clone());
    }
    Ok(json_body(serialized))
}

fn json_body(serialized: String) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        serialized,
    )
        .into_response()
}

// --- Batch mutations ---

#[derive(Debug, Serialize, Deserialize)]
struct NewMedia {
    title: String,
    file_path: String,
    file_type: FileType,
    duration: Option<f32>,
    tags: Option<String>,
    thumbnail_path: Option<String>,
    thumbnail_md: Option<String>,
    thumbnail_lg: Option<String>,
    server_location: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_protected: bool,
}

#[derive(Debug, Serialize)]
struct BatchInsertResponse {
    message: String,
    data: Vec<NewMedia>,
    #[serde(rename = "failedInserts")]
    failed_inserts: Vec<BatchFailure>,
}

async fn batch_insert(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<Vec<NewMedia>>,
) -> Result<(StatusCode, Json<BatchInsertResponse>), AppError> {
    auth.require_authenticated()?;

    let mut failed_inserts = Vec::new();
    let mut tx = state.db.begin().await?;

    for item in &body {
        // Savepoint per element: a failed insert poisons a Postgres
        // transaction, so roll back just this element and keep going.
        let mut sp = tx.begin().await?;
        let result = sqlx::query(
            "INSERT INTO media
               (title, file_path, file_type, duration, tags, thumbnail_path,
                thumbnail_md, thumbnail_lg, server_location, created_at, is_protected)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()), $11)",
        )
        .bind(&item.title)
        .bind(&item.file_path)
        .bind(item.file_type.as_str())
        .bind(item.duration)
        .bind(&item.tags)
        .bind(&item.thumbnail_path)
        .bind(&item.thumbnail_md)
        .bind(&item.thumbnail_lg)
        .bind(
            item.server_location
                .as_deref()
                .unwrap_or(LOCAL_SERVER_LOCATION),
        )
        .bind(item.created_at)
        .bind(item.is_protected)
        .execute(&mut *sp)
        .await;

        match result {
            Ok(_) => sp.commit().await?,
            Err(e) => {
                sp.rollback().await?;
                tracing::warn!("Failed to insert media file {}: {e}", item.file_path);
                failed_inserts.push(BatchFailure::by_path(&item.file_path, e));
            }
        }
    }

    tx.commit().await?;
    state.cache.clear();

    Ok((
        StatusCode::CREATED,
        Json(BatchInsertResponse {
            message: "Batch media data inserted successfully".into(),
            data: body,
            failed_inserts,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
struct MediaUpdate {
    id: i32,
    title: Option<String>,
    file_path: Option<String>,
    file_type: Option<FileType>,
    duration: Option<f32>,
    tags: Option<String>,
    thumbnail_path: Option<String>,
    thumbnail_md: Option<String>,
    thumbnail_lg: Option<String>,
    server_location: Option<String>,
    optimized_path: Option<String>,
    is_protected: Option<bool>,
    protected_by: Option<String>,
    user_protecting: Option<i32>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct BatchUpdateResponse {
    message: String,
    data: Vec<MediaUpdate>,
    #[serde(rename = "failedUpdates")]
    failed_updates: Vec<BatchFailure>,
}

/// Build an UPDATE statement for the fields the caller actually provided.
/// Returns None when the element carries no updatable fields.
fn build_media_update(item: &MediaUpdate) -> Option<QueryBuilder<'_, Postgres>> {
    let mut qb = QueryBuilder::new("UPDATE media SET ");
    let mut fields = qb.separated(", ");
    let mut any = false;

    macro_rules! set_field {
        ($column:literal, $value:expr) => {
            if let Some(value) = $value {
                fields.push(concat!($column, " = "));
                fields.push_bind_unseparated(value);
                any = true;
            }
        };
    }

    set_field!("title", item.title.clone());
    set_field!("file_path", item.file_path.clone());
    set_field!("file_type", item.file_type.map(|t| t.as_str()));
    set_field!("duration", item.duration);
    set_field!("tags", item.tags.clone());
    set_field!("thumbnail_path", item.thumbnail_path.clone());
    set_field!("thumbnail_md", item.thumbnail_md.clone());
    set_field!("thumbnail_lg", item.thumbnail_lg.clone());
    set_field!("server_location", item.server_location.clone());
    set_field!("optimized_path", item.optimized_path.clone());
    set_field!("is_protected", item.is_protected);
    set_field!("protected_by", item.protected_by.clone());
    set_field!("user_protecting", item.user_protecting);
    set_field!("created_at", item.created_at);

    if !any {
        return None;
    }
    qb.push(" WHERE id = ").push_bind(item.id);
    Some(qb)
}

async fn batch_update(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<Vec<MediaUpdate>>,
) -> Result<Json<BatchUpdateResponse>, AppError> {
    auth.require_authenticated()?;

    let mut failed_updates = Vec::new();
    let mut tx = state.db.begin().await?;

    for item in &body {
        let Some(mut qb) = build_media_update(item) else {
            continue;
        };

        let mut sp = tx.begin().await?;
        match qb.build().execute(&mut *sp).await {
            Ok(_) => sp.commit().await?,
            Err(e) => {
                sp.rollback().await?;
                tracing::warn!("Failed to update media ID {}: {e}", item.id);
                failed_updates.push(BatchFailure::by_id(item.id, e));
            }
        }
    }

    tx.commit().await?;
    state.cache.clear();

    Ok(Json(BatchUpdateResponse {
        message: "Batch media data updated successfully".into(),
        data: body,
        failed_updates,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
struct MediaKey {
    file_path: String,
}

#[derive(Debug, Serialize)]
struct BatchDeleteResponse {
    message: String,
    data: Vec<MediaKey>,
    #[serde(rename = "failedDeletes")]
    failed_deletes: Vec<BatchFailure>,
}

async fn batch_delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<Vec<MediaKey>>,
) -> Result<Json<BatchDeleteResponse>, AppError> {
    auth.require_authenticated()?;

    let mut failed_deletes = Vec::new();
    let mut tx = state.db.begin().await?;

    for item in &body {
        let mut sp = tx.begin().await?;
        let result = sqlx::query(
            "UPDATE media SET deleted_at = NOW()
             WHERE file_path = $1 AND deleted_at IS NULL",
        )
        .bind(&item.file_path)
        .execute(&mut *sp)
        .await;

        match result {
            Ok(_) => sp.commit().await?,
            Err(e) => {
                sp.rollback().await?;
                tracing::warn!("Failed to delete media file {}: {e}", item.file_path);
                failed_deletes.push(BatchFailure::by_path(&item.file_path, e));
            }
        }
    }

    tx.commit().await?;
    state.cache.clear();

    Ok(Json(BatchDeleteResponse {
        message: "Batch media data deleted successfully".into(),
        data: body,
        failed_deletes,
    }))
}

#[derive(Debug, Deserialize)]
struct BatchTagsRequest {
    ids: Vec<i32>,
    tags: String,
}

#[derive(Debug, Serialize)]
struct BatchTagsResponse {
    message: String,
    data: Vec<i32>,
    #[serde(rename = "failedUpdates")]
    failed_updates: Vec<BatchFailure>,
}

/// Union of the existing comma list and the additions, preserving order of
/// first appearance. Returns None when nothing changes. Membership is exact
/// string comparison, matching the write path of the legacy column (only
/// the read-side matcher is loose).
fn merge_tags(existing: Option<&str>, added: &str) -> Option<String> {
    let current: Vec<&str> = existing
        .map(|t| t.split(',').collect())
        .unwrap_or_default();
    let additions: Vec<&str> = added
        .split(',')
        .filter(|tag| !tag.is_empty() && !current.contains(tag))
        .collect();

    if additions.is_empty() {
        return None;
    }

    let mut merged: Vec<&str> = current;
    let mut seen = Vec::new();
    let additions = additions.into_iter().filter(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t);
            true
        }
    });
    merged.extend(additions);
    Some(merged.join(","))
}

/// Difference of the existing comma list and the removals.
fn remove_tags(existing: Option<&str>, removed: &str) -> String {
    let removals: Vec<&str> = removed.split(',').collect();
    existing
        .map(|t| {
            t.split(',')
                .filter(|tag| !removals.contains(tag))
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default()
}

async fn batch_add_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<BatchTagsRequest>,
) -> Result<Json<BatchTagsResponse>, AppError> {
    auth.require_authenticated()?;

    let mut failed_updates = Vec::new();
    let mut tx = state.db.begin().await?;

    for &id in &body.ids {
        let mut sp = tx.begin().await?;
        // Read-modify-write on the comma list; concurrent writers to the
        // same row can lose an update (no row locking, as before).
        let result: Result<(), sqlx::Error> = async {
            let existing: Option<Option<String>> =
                sqlx::query_scalar("SELECT tags FROM media WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *sp)
                    .await?;

            if let Some(existing) = existing
                && let Some(updated) = merge_tags(existing.as_deref(), &body.tags)
            {
                sqlx::query("UPDATE media SET tags = $1 WHERE id = $2")
                    .bind(updated)
                    .bind(id)
                    .execute(&mut *sp)
                    .await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => sp.commit().await?,
            Err(e) => {
                sp.rollback().await?;
                tracing::warn!("Failed to update tags for media ID {id}: {e}");
                failed_updates.push(BatchFailure::by_id(id, e));
            }
        }
    }

    tx.commit().await?;
    state.cache.clear();

    Ok(Json(BatchTagsResponse {
        message: "Batch tags updated successfully".into(),
        data: body.ids,
        failed_updates,
    }))
}

async fn batch_remove_tags(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<BatchTagsRequest>,
) -> Result<Json<BatchTagsResponse>, AppError> {
    auth.require_authenticated()?;

    let mut failed_updates = Vec::new();
    let mut tx = state.db.begin().await?;

    for &id in &body.ids {
        let mut sp = tx.begin().await?;
        let result: Result<(), sqlx::Error> = async {
            let existing: Option<Option<String>> =
                sqlx::query_scalar("SELECT tags FROM media WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *sp)
                    .await?;

            if let Some(existing) = existing {
                let updated = remove_tags(existing.as_deref(), &body.tags);
                sqlx::query("UPDATE media SET tags = $1 WHERE id = $2")
                    .bind(updated)
                    .bind(id)
                    .execute(&mut *sp)
                    .await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => sp.commit().await?,
            Err(e) => {
                sp.rollback().await?;
                tracing::warn!("Failed to remove tags for media ID {id}: {e}");
                failed_updates.push(BatchFailure::by_id(id, e));
            }
        }
    }

    tx.commit().await?;
    state.cache.clear();

    Ok(Json(BatchTagsResponse {
        message: "Batch tags removed successfully".into(),
        data: body.ids,
        failed_updates,
    }))
}

#[derive(Debug, Deserialize)]
struct BatchProtectedRequest {
    ids: Vec<i32>,
    is_protected: bool,
}

async fn batch_protected(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<BatchProtectedRequest>,
) -> Result<Json<BatchTagsResponse>, AppError> {
    auth.require_authenticated()?;

    let mut failed_updates = Vec::new();
    let mut tx = state.db.begin().await?;

    for &id in &body.ids {
        let mut sp = tx.begin().await?;
        let result = sqlx::query(
            "UPDATE media SET is_protected = $1, protected_by = $2 WHERE id = $3",
        )
        .bind(body.is_protected)
        .bind(auth.user_id())
        .bind(id)
        .execute(&mut *sp)
        .await;

        match result {
            Ok(_) => sp.commit().await?,
            Err(e) => {
                sp.rollback().await?;
                tracing::warn!("Failed to update protection status for media ID {id}: {e}");
                failed_updates.push(BatchFailure::by_id(id, e));
            }
        }
    }

    tx.commit().await?;
    state.cache.clear();

    Ok(Json(BatchTagsResponse {
        message: "Batch protection status updated successfully".into(),
        data: body.ids,
        failed_updates,
    }))
}

// --- Single delete & reconciliation ---

#[derive(Debug, Deserialize)]
struct DeleteMediaParams {
    #[serde(default, rename = "deleteWithData")]
    delete_with_data: bool,
}

/// Best-effort unlink of a local row's backing file and thumbnails.
/// Stored paths are relative to the media root. Filesystem errors are
/// logged and never surfaced.
async fn remove_backing_files(media: &Media, media_root: &str) {
    if media.server_location != LOCAL_SERVER_LOCATION {
        return;
    }
    let root = std::path::Path::new(media_root);
    let paths = [
        Some(&media.file_path),
        media.thumbnail_path.as_ref(),
        media.thumbnail_md.as_ref(),
        media.thumbnail_lg.as_ref(),
    ];
    for path in paths.into_iter().flatten() {
        if let Err(e) = tokio::fs::remove_file(root.join(path)).await {
            tracing::warn!("Failed to unlink {path}: {e}");
        }
    }
}

async fn delete_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Query(params): Query<DeleteMediaParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_authenticated()?;

    let media = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".into()))?;

    if params.delete_with_data {
        sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;
        remove_backing_files(&media, &state.config.media_root).await;
    } else {
        sqlx::query("UPDATE media SET deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;
    }

    state.cache.clear();
    Ok(Json(serde_json::json!({ "message": "Media deleted successfully" })))
}

#[derive(Debug, Deserialize)]
struct CheckFilesParams {
    #[serde(default, rename = "deleteMissing")]
    delete_missing: bool,
}

#[derive(Debug, Serialize)]
struct MissingFile {
    id: i32,
    file_path: String,
}

#[derive(Debug, Serialize)]
struct CheckFilesResponse {
    checked: usize,
    missing_count: usize,
    missing: Vec<MissingFile>,
    deleted_count: usize,
}

/// Reconcile live local rows against filesystem existence.
async fn check_files(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<CheckFilesParams>,
) -> Result<Json<CheckFilesResponse>, AppError> {
    auth.require_authenticated()?;

    let rows: Vec<(i32, String)> = sqlx::query_as(
        "SELECT id, file_path FROM media
         WHERE deleted_at IS NULL AND server_location = $1",
    )
    .bind(LOCAL_SERVER_LOCATION)
    .fetch_all(&state.db)
    .await?;

    let root = std::path::Path::new(&state.config.media_root);
    let checked = rows.len();
    let mut missing = Vec::new();
    for (id, file_path) in rows {
        let exists = tokio::fs::try_exists(root.join(&file_path))
            .await
            .unwrap_or(false);
        if !exists {
            missing.push(MissingFile { id, file_path });
        }
    }

    let mut deleted_count = 0;
    if params.delete_missing && !missing.is_empty() {
        let ids: Vec<i32> = missing.iter().map(|m| m.id).collect();
        let result = sqlx::query("UPDATE media SET deleted_at = NOW() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&state.db)
            .await?;
        deleted_count = result.rows_affected() as usize;
        state.cache.clear();
    }

    Ok(Json(CheckFilesResponse {
        checked,
        missing_count: missing.len(),
        missing,
        deleted_count,
    }))
}

// --- Favorites ---

#[derive(Debug, Deserialize)]
struct FavoritesParams {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<FavoritesParams>,
) -> Result<Json<Paginated<MediaResponse>>, AppError> {
    let claims = auth.require_authenticated()?;
    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM favorites f
         JOIN media m ON m.id = f.media_id
         WHERE f.user_id = $1 AND m.deleted_at IS NULL",
    )
    .bind(&claims.sub)
    .fetch_one(&state.db)
    .await?;

    let rows: Vec<Media> = sqlx::query_as(
        "SELECT m.* FROM favorites f
         JOIN media m ON m.id = f.media_id
         WHERE f.user_id = $1 AND m.deleted_at IS NULL
         ORDER BY f.created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(&claims.sub)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let (next, prev) = page_links(page, limit, count);
    Ok(Json(Paginated {
        data: rows
            .into_iter()
            .map(|m| m.into_response(&state.config))
            .collect(),
        next,
        prev,
        count,
    }))
}

#[derive(Debug, Deserialize)]
struct AddFavoriteRequest {
    media_id: i32,
}

async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<Favorite>), AppError> {
    let claims = auth.require_authenticated()?;

    let exists: Option<i32> =
        sqlx::query_scalar("SELECT id FROM media WHERE id = $1 AND deleted_at IS NULL")
            .bind(body.media_id)
            .fetch_optional(&state.db)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Media not found".into()));
    }

    let favorite = sqlx::query_as::<_, Favorite>(
        "INSERT INTO favorites (user_id, media_id) VALUES ($1, $2)
         ON CONFLICT (user_id, media_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING *",
    )
    .bind(&claims.sub)
    .bind(body.media_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(favorite)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(media_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = auth.require_authenticated()?;

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND media_id = $2")
        .bind(&claims.sub)
        .bind(media_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Favorite not found".into()));
    }
    Ok(Json(serde_json::json!({ "message": "Favorite removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_tags_unions_without_duplicates() {
        assert_eq!(
            merge_tags(Some("cat,dog"), "dog,beach").as_deref(),
            Some("cat,dog,beach")
        );
        assert_eq!(merge_tags(None, "cat,cat,dog").as_deref(), Some("cat,dog"));
    }

    #[test]
    fn merge_tags_reports_no_change() {
        assert_eq!(merge_tags(Some("cat,dog"), "cat,dog"), None);
        assert_eq!(merge_tags(Some("cat"), ""), None);
    }

    #[test]
    fn remove_tags_takes_difference() {
        assert_eq!(remove_tags(Some("cat,dog,beach"), "dog"), "cat,beach");
        assert_eq!(remove_tags(Some("cat"), "cat"), "");
        assert_eq!(remove_tags(None, "cat"), "");
    }

    #[test]
    fn remove_tags_is_exact_membership() {
        // "art" does not remove "smart": set operations on the write path
        // are exact even though the read-side matcher is loose.
        assert_eq!(remove_tags(Some("smart,art"), "art"), "smart");
    }

    #[test]
    fn update_builder_skips_empty_elements() {
        let item = MediaUpdate {
            id: 1,
            title: None,
            file_path: None,
            file_type: None,
            duration: None,
            tags: None,
            thumbnail_path: None,
            thumbnail_md: None,
            thumbnail_lg: None,
            server_location: None,
            optimized_path: None,
            is_protected: None,
            protected_by: None,
            user_protecting: None,
            created_at: None,
        };
        assert!(build_media_update(&item).is_none());
    }

    #[test]
    fn update_builder_sets_only_provided_fields() {
        let item = MediaUpdate {
            id: 7,
            title: Some("new title".into()),
            file_path: None,
            file_type: None,
            duration: None,
            tags: None,
            thumbnail_path: None,
            thumbnail_md: None,
            thumbnail_lg: None,
            server_location: None,
            optimized_path: None,
            is_protected: Some(true),
            protected_by: None,
            user_protecting: None,
            created_at: None,
        };
        let qb = build_media_update(&item).unwrap();
        let sql = qb.sql();
        assert!(sql.contains("title = $1"));
        assert!(sql.contains("is_protected = $2"));
        assert!(sql.contains("WHERE id = $3"));
        assert!(!sql.contains("file_path"));
    }
}
