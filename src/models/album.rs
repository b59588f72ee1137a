use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Album {
    pub id: i32,
    pub title: String,
    pub cover_url: Option<String>,
    pub fallback_cover_url: Option<String>,
    pub parent: Option<i32>,
    pub tags: Option<String>,
    pub is_protected: bool,
    pub is_hidden: bool,
    pub online_album_urls: Option<serde_json::Value>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FavoriteAlbum {
    pub id: i32,
    pub user_identifier: String,
    pub album_id: i32,
    pub created_at: DateTime<Utc>,
}
