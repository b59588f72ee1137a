use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Playlist {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub is_protected: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Favorite {
    pub id: i32,
    pub user_id: String,
    pub media_id: i32,
    pub created_at: DateTime<Utc>,
}
