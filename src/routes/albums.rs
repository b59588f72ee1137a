use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::QueryBuilder;

use crate::AppState;
use crate::auth::middleware::AuthContext;
use crate::error::AppError;
use crate::models::album::{Album, FavoriteAlbum};
use crate::models::media::{Media, MediaResponse};
use crate::query::{Paginated, page_bounds, page_links};
use crate::tag_match::{parse_tag_list, push_tag_filter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_albums))
        .route(
            "/favorites",
            get(list_favorite_albums).post(add_favorite_album),
        )
        .route(
            "/favorites/{album_id}",
            axum::routing::delete(remove_favorite_album),
        )
        .route("/{id}/media", get(album_media))
}

#[derive(Debug, Deserialize)]
struct ListAlbumsParams {
    page: Option<i64>,
    limit: Option<i64>,
    is_protected: Option<bool>,
    #[serde(default)]
    is_hidden: bool,
    tags: Option<String>,
    #[serde(default)]
    is_random: bool,
}

async fn list_albums(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListAlbumsParams>,
) -> Result<Json<Paginated<Album>>, AppError> {
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
                qb.push(" AND a.is_protected = ").push_bind(is_protected);
            }
        } else {
            qb.push(" AND a.is_protected = FALSE");
        }
        qb.push(" AND a.is_hidden = ").push_bind(params.is_hidden);
        // Albums carry the same comma-list tags column as playlists.
        push_tag_filter(
            qb,
            "a",
            &include,
            false,
            &[],
            crate::config::TagMatchMode::Legacy,
        );
    };

    let mut count_qb =
        QueryBuilder::new("SELECT COUNT(*) FROM albums a WHERE a.deleted_at IS NULL");
    push_filters(&mut count_qb);
    let count: i64 = count_qb.build_query_scalar().fetch_one(&state.db).await?;

    let mut qb = QueryBuilder::new("SELECT a.* FROM albums a WHERE a.deleted_at IS NULL");
    push_filters(&mut qb);
    if params.is_random {
        qb.push(" ORDER BY random()");
    } else {
        qb.push(" ORDER BY a.title");
    }
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let albums: Vec<Album> = qb.build_query_as().fetch_all(&state.db).await?;

    let (next, prev) = page_links(page, limit, count);
    Ok(Json(Paginated {
        data: albums,
        next,
        prev,
        count,
    }))
}

async fn fetch_visible_album(
    state: &AppState,
    auth: &AuthContext,
    id: i32,
) -> Result<Album, AppError> {
    let album =
        sqlx::query_as::<_, Album>("SELECT * FROM albums WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Album not found".into()))?;

    if album.is_protected && !auth.is_authenticated() {
        return Err(AppError::NotFound("Album not found".into()));
    }
    Ok(album)
}

async fn album_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Query(params): Query<ListAlbumsParams>,
) -> Result<Json<Paginated<MediaResponse>>, AppError> {
    fetch_visible_album(&state, &auth, id).await?;
    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM album_media am
         JOIN media m ON m.id = am.media_id
         WHERE am.album_id = $1 AND m.deleted_at IS NULL",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    let media: Vec<Media> = sqlx::query_as(
        "SELECT m.* FROM album_media am
         JOIN media m ON m.id = am.media_id
         WHERE am.album_id = $1 AND m.deleted_at IS NULL
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

// --- Favorite albums, keyed by the token subject ---

async fn list_favorite_albums(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListAlbumsParams>,
) -> Result<Json<Paginated<Album>>, AppError> {
    let user = auth.require_authenticated()?.sub.clone();
    let (page, limit) = page_bounds(params.page, params.limit);
    let offset = (page - 1) * limit;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM favorite_albums fa
         JOIN albums a ON a.id = fa.album_id
         WHERE fa.user_identifier = $1 AND a.deleted_at IS NULL",
    )
    .bind(&user)
    .fetch_one(&state.db)
    .await?;

    let albums: Vec<Album> = sqlx::query_as(
        "SELECT a.* FROM favorite_albums fa
         JOIN albums a ON a.id = fa.album_id
         WHERE fa.user_identifier = $1 AND a.deleted_at IS NULL
         ORDER BY fa.created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(&user)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let (next, prev) = page_links(page, limit, count);
    Ok(Json(Paginated {
        data: albums,
        next,
        prev,
        count,
    }))
}

#[derive(Debug, Deserialize)]
struct AddFavoriteAlbum {
    album_id: i32,
}

async fn add_favorite_album(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<AddFavoriteAlbum>,
) -> Result<(StatusCode, Json<FavoriteAlbum>), AppError> {
    let user = auth.require_authenticated()?.sub.clone();

    fetch_visible_album(&state, &auth, body.album_id).await?;

    // Re-favoriting is a no-op that still returns the row.
    let favorite = sqlx::query_as::<_, FavoriteAlbum>(
        "INSERT INTO favorite_albums (user_identifier, album_id) VALUES ($1, $2)
         ON CONFLICT (user_identifier, album_id) DO UPDATE SET album_id = EXCLUDED.album_id
         RETURNING *",
    )
    .bind(&user)
    .bind(body.album_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(favorite)))
}

async fn remove_favorite_album(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(album_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let user = auth.require_authenticated()?.sub.clone();

    let result =
        sqlx::query("DELETE FROM favorite_albums WHERE user_identifier = $1 AND album_id = $2")
            .bind(&user)
            .bind(album_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Favorite not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
