use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::Config;

/// Coarse file classification derived from the extension at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Photo,
    Video,
    Music,
    Document,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Music => "music",
            Self::Document => "document",
        }
    }
}

pub const LOCAL_SERVER_LOCATION: &str = "local";

#[derive(Debug, Clone, FromRow)]
pub struct Media {
    pub id: i32,
    pub title: String,
    pub file_path: String,
    pub file_type: String,
    pub duration: Option<f32>,
    pub tags: Option<String>,
    pub thumbnail_path: Option<String>,
    pub thumbnail_md: Option<String>,
    pub thumbnail_lg: Option<String>,
    pub server_location: String,
    pub optimized_path: Option<String>,
    pub is_protected: bool,
    pub protected_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: i32,
    pub title: String,
    pub file_path: String,
    pub file_type: String,
    pub duration: Option<f32>,
    pub tags: Option<String>,
    pub thumbnail_path: Option<String>,
    pub thumbnail_md: Option<String>,
    pub thumbnail_lg: Option<String>,
    pub server_location: String,
    pub optimized_path: Option<String>,
    pub is_protected: bool,
    pub protected_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Media {
    /// Shape a row for the wire. Locally stored rows have their path fields
    /// rewritten to absolute URLs on the `/file` mount; rows on other server
    /// locations already carry absolute URLs and pass through unchanged.
    /// Every endpoint that returns media rows goes through this.
    pub fn into_response(self, config: &Config) -> MediaResponse {
        let local = self.server_location == LOCAL_SERVER_LOCATION;
        let rewrite = |path: String| {
            if local {
                config.file_url(&path)
            } else {
                path
            }
        };

        MediaResponse {
            id: self.id,
            title: self.title,
            file_path: rewrite(self.file_path),
            file_type: self.file_type,
            duration: self.duration,
            tags: self.tags,
            thumbnail_path: self.thumbnail_path.map(rewrite),
            thumbnail_md: self.thumbnail_md.map(rewrite),
            thumbnail_lg: self.thumbnail_lg.map(rewrite),
            server_location: self.server_location,
            optimized_path: self.optimized_path,
            is_protected: self.is_protected,
            protected_by: self.protected_by,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn media(server_location: &str) -> Media {
        Media {
            id: 1,
            title: "b".into(),
            file_path: "a/b.jpg".into(),
            file_type: "photo".into(),
            duration: None,
            tags: Some("holiday,beach".into()),
            thumbnail_path: Some("a/thumbnails/thumb_b.jpg".into()),
            thumbnail_md: Some("a/thumbnails/thumb_b_md.jpg".into()),
            thumbnail_lg: None,
            server_location: server_location.into(),
            optimized_path: None,
            is_protected: false,
            protected_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn local_rows_get_absolute_file_urls() {
        let response = media("local").into_response(&test_config());
        assert_eq!(response.file_path, "http://localhost:5002/file/a/b.jpg");
        assert_eq!(
            response.thumbnail_path.as_deref(),
            Some("http://localhost:5002/file/a/thumbnails/thumb_b.jpg")
        );
        assert_eq!(
            response.thumbnail_md.as_deref(),
            Some("http://localhost:5002/file/a/thumbnails/thumb_b_md.jpg")
        );
        assert_eq!(response.thumbnail_lg, None);
    }

    #[test]
    fn remote_rows_pass_through_unchanged() {
        let response = media("remote").into_response(&test_config());
        assert_eq!(response.file_path, "a/b.jpg");
        assert_eq!(
            response.thumbnail_path.as_deref(),
            Some("a/thumbnails/thumb_b.jpg")
        );
    }
}
