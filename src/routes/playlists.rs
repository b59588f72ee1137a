use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, QueryBuilder};

use crate::AppState;
use crate::auth::middleware::AuthContext;
use crate::batch::BatchFailure;
use crate::error::AppError;
use crate::models::media::{Media, MediaResponse};
use crate::models::playlist::Playlist;
use crate::query::{Paginated, page_bounds, page_links};
use crate::tag_match::{parse_tag_list, push_tag_filter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_playlists).post(create_playlist))
        .route(
            "/{id}/media",
            get(playlist_media).post(add_media).put(apply_media_actions),
        )
        .route("/{id}/media/{media_id}", delete(remove_media))
}

#[derive(Debug, Deserialize)]
struct ListPlaylistsParams {
    page: Option<i64>,
    limit: Option<i64>,
    is_protected: Option<bool>,
    tags: Option<String>,
    #[serde(default)]
    is_random: bool,
}

async fn list_playlists(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListPlaylistsParams>,
) -> Result<Json<Paginated<Playlist>>, AppError> {
    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;
    let include = params
        .tags
        .as_deref()
        .map(parse_tag_list)
        .unwrap_or_default();

    let push_filters = |qb: &mut QueryBuilder<'_, sqlx::Postgres>| {
        if auth.is_authenticated() {
            if let Some(is_protected) = params.is_protected {
                qb.push(" AND p.is_protected = ").push_bind(is_protected);
            }
        } else {
            qb.push(" AND p.is_protected = FALSE");
        }
        // Playlists only ever carried the comma-list column, so their tag
        // filter is always the legacy predicate.
        push_tag_filter(
            qb,
            "p",
            &include,
            false,
            &[],
            crate::config::TagMatchMode::Legacy,
        );
    };

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM playlists p WHERE TRUE");
    push_filters(&mut count_qb);
    let count: i64 = count_qb.build_query_scalar().fetch_one(&state.db).await?;

    let mut qb = QueryBuilder::new("SELECT p.* FROM playlists p WHERE TRUE");
    push_filters(&mut qb);
    if params.is_random {
        qb.push(" ORDER BY random()");
    } else {
        qb.push(" ORDER BY p.created_at DESC");
    }
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let playlists: Vec<Playlist> = qb.build_query_as().fetch_all(&state.db).await?;

    let (next, prev) = page_links(page, limit, count);
    Ok(Json(Paginated {
        data: playlists,
        next,
        prev,
        count,
    }))
}

#[derive(Debug, Deserialize)]
struct NewPlaylist {
    name: Option<String>,
    description: Option<String>,
    tags: Option<String>,
    #[serde(default)]
    is_protected: bool,
}

async fn create_playlist(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<NewPlaylist>,
) -> Result<(StatusCode, Json<Playlist>), AppError> {
    auth.require_authenticated()?;
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Playlist name is required".into()))?;

    let is_protected = body.is_protected && auth.is_admin();
    let playlist = sqlx::query_as::<_, Playlist>(
        "INSERT INTO playlists (name, description, tags, is_protected)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(name)
    .bind(&body.description)
    .bind(&body.tags)
    .bind(is_protected)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(playlist)))
}

async fn fetch_visible_playlist(
    state: &AppState,
    auth: &AuthContext,
    id: i32,
) -> Result<Playlist, AppError> {
    let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Playlist not found".into()))?;

    if playlist.is_protected && !auth.is_authenticated() {
        return Err(AppError::NotFound("Playlist not found".into()));
    }
    Ok(playlist)
}

async fn playlist_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Query(params): Query<ListPlaylistsParams>,
) -> Result<Json<Paginated<MediaResponse>>, AppError> {
    fetch_visible_playlist(&state, &auth, id).await?;
    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM playlist_media pm
         JOIN media m ON m.id = pm.media_id
         WHERE pm.playlist_id = $1 AND m.deleted_at IS NULL",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    let media: Vec<Media> = sqlx::query_as(
        "SELECT m.* FROM playlist_media pm
         JOIN media m ON m.id = pm.media_id
         WHERE pm.playlist_id = $1 AND m.deleted_at IS NULL
         ORDER BY m.id
         LIMIT $2 OFFSET $3",
    )
    .bind(id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let (next, prev) = page_links(page, limit, count);
    Ok(Json(Paginated {
        data: media
            .into_iter()
            .map(|m| m.into_response(&state.config))
            .collect(),
        next,
        prev,
        count,
    }))
}

#[derive(Debug, Deserialize)]
struct AddMediaRequest {
    media_id: i32,
}

async fn add_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(body): Json<AddMediaRequest>,
) -> Result<StatusCode, AppError> {
    auth.require_authenticated()?;
    fetch_visible_playlist(&state, &auth, id).await?;

    let live: Option<i32> =
        sqlx::query_scalar("SELECT id FROM media WHERE id = $1 AND deleted_at IS NULL")
            .bind(body.media_id)
            .fetch_optional(&state.db)
            .await?;
    if live.is_none() {
        return Err(AppError::NotFound("Media not found".into()));
    }

    sqlx::query(
        "INSERT INTO playlist_media (playlist_id, media_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(body.media_id)
    .execute(&state.db)
    .await?;

    Ok(StatusCode::CREATED)
}

async fn remove_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, media_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    auth.require_authenticated()?;
    fetch_visible_playlist(&state, &auth, id).await?;

    let result = sqlx::query("DELETE FROM playlist_media WHERE playlist_id = $1 AND media_id = $2")
        .bind(id)
        .bind(media_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Media is not in the playlist".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct MediaAction {
    id: i32,
    action: String,
}

#[derive(Debug, Serialize)]
struct MediaActionsResponse {
    message: String,
    #[serde(rename = "failedActions")]
    failed_actions: Vec<BatchFailure>,
}

/// Apply a mixed list of `in`/`out` membership actions. Each action runs
/// under its own savepoint so one bad element does not abort the rest.
async fn apply_media_actions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(actions): Json<Vec<MediaAction>>,
) -> Result<Json<MediaActionsResponse>, AppError> {
    auth.require_authenticated()?;
    fetch_visible_playlist(&state, &auth, id).await?;

    let mut failed_actions = Vec::new();
    let mut tx = state.db.begin().await?;

    for action in &actions {
        let mut sp = tx.begin().await?;
        let result = match action.action.as_str() {
            "in" => {
                let live: Option<i32> = sqlx::query_scalar(
                    "SELECT id FROM media WHERE id = $1 AND deleted_at IS NULL",
                )
                .bind(action.id)
                .fetch_optional(&mut *sp)
                .await?;
                if live.is_none() {
                    Err("media not found".to_string())
                } else {
                    sqlx::query(
                        "INSERT INTO playlist_media (playlist_id, media_id) VALUES ($1, $2)
                         ON CONFLICT DO NOTHING",
                    )
                    .bind(id)
                    .bind(action.id)
                    .execute(&mut *sp)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
                }
            }
            "out" => sqlx::query(
                "DELETE FROM playlist_media WHERE playlist_id = $1 AND media_id = $2",
            )
            .bind(id)
            .bind(action.id)
            .execute(&mut *sp)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
            other => Err(format!("unknown action '{other}'")),
        };

        match result {
            Ok(()) => sp.commit().await?,
            Err(reason) => {
                sp.rollback().await?;
                failed_actions.push(BatchFailure::by_action(action.id, &action.action, reason));
            }
        }
    }

    tx.commit().await?;

    if !failed_actions.is_empty() {
        tracing::warn!(
            playlist_id = id,
            failed = failed_actions.len(),
            "Some playlist actions failed"
        );
    }

    Ok(Json(MediaActionsResponse {
        message: "Playlist updated".into(),
        failed_actions,
    }))
}
