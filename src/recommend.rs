//! Related-tag recommendations driven by co-occurrence on `media_tags`.
//!
//! Each strategy runs a handful of queries whose results are concatenated
//! and deduplicated by name, so branch ordering is the ranking: earlier
//! branches win ties. Every branch applies the same visibility rules and
//! resolves one representative thumbnail per tag.

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::config::Config;
use crate::error::AppError;
use crate::models::media::LOCAL_SERVER_LOCATION;
use crate::models::tag::{Tag, TagType};

#[derive(Debug, Clone, Serialize)]
pub struct RelatedTag {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, FromRow)]
struct RelatedRow {
    id: i32,
    name: String,
    #[sqlx(rename = "type")]
    tag_type: Option<String>,
    thumbnail_path: Option<String>,
    thumbnail_md: Option<String>,
    file_path: Option<String>,
    server_location: Option<String>,
}

/// Thumbnail preference order for a representative media row.
fn preferred_thumbnail(
    thumbnail_path: Option<&str>,
    thumbnail_md: Option<&str>,
    file_path: Option<&str>,
) -> Option<String> {
    thumbnail_path
        .or(thumbnail_md)
        .or(file_path)
        .map(str::to_string)
}

impl RelatedRow {
    fn into_related(self, config: &Config) -> RelatedTag {
        let thumbnail = preferred_thumbnail(
            self.thumbnail_path.as_deref(),
            self.thumbnail_md.as_deref(),
            self.file_path.as_deref(),
        )
        .map(|path| {
            if self.server_location.as_deref() == Some(LOCAL_SERVER_LOCATION) {
                config.file_url(&path)
            } else {
                path
            }
        });

        RelatedTag {
            id: self.id,
            name: self.name,
            tag_type: self.tag_type,
            thumbnail,
        }
    }
}

/// First occurrence of each name wins; later branches only fill gaps.
fn dedupe_by_name(tags: Vec<RelatedTag>) -> Vec<RelatedTag> {
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    tags.into_iter()
        .filter(|tag| {
            if seen.contains(&tag.name) {
                false
            } else {
                seen.push(tag.name.clone());
                true
            }
        })
        .collect()
}

/// Tags of `wanted_type` sharing media with the seed tag, ranked by how
/// often they co-occur. Each result carries its most-recent media by id.
async fn co_occurring(
    db: &PgPool,
    seed: &str,
    wanted_type: TagType,
    include_protected: bool,
    limit: i64,
) -> Result<Vec<RelatedRow>, AppError> {
    let rows = sqlx::query_as::<_, RelatedRow>(
        "SELECT t.id, t.name, t.type,
                lm.thumbnail_path, lm.thumbnail_md, lm.file_path, lm.server_location
         FROM (
             SELECT mt.tag_name, COUNT(*) AS uses
             FROM media_tags seed
             JOIN media_tags mt
               ON mt.media_id = seed.media_id AND mt.tag_name <> seed.tag_name
             WHERE seed.tag_name = $1
             GROUP BY mt.tag_name
         ) co
         JOIN tags t ON t.name = co.tag_name
         JOIN LATERAL (
             SELECT m.thumbnail_path, m.thumbnail_md, m.file_path, m.server_location
             FROM media_tags mt2
             JOIN media m ON m.id = mt2.media_id
             WHERE mt2.tag_name = t.name AND m.deleted_at IS NULL
             ORDER BY m.id DESC
             LIMIT 1
         ) lm ON TRUE
         WHERE t.type = $2 AND t.deleted_at IS NULL AND t.is_hidden = FALSE
           AND ($3 OR t.is_protected = FALSE)
         ORDER BY co.uses DESC, t.name
         LIMIT $4",
    )
    .bind(seed)
    .bind(wanted_type.as_str())
    .bind(include_protected)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Albums reachable from a seed album through a shared person: any person
/// co-occurring with the seed links to every other album that person
/// appears in. Each candidate album is represented by its most-recent
/// media by id.
async fn albums_sharing_person(
    db: &PgPool,
    seed: &str,
    include_protected: bool,
    limit: i64,
) -> Result<Vec<RelatedRow>, AppError> {
    let rows = sqlx::query_as::<_, RelatedRow>(
        "WITH people AS (
             SELECT DISTINCT mt.tag_name
             FROM media_tags seed
             JOIN media_tags mt ON mt.media_id = seed.media_id
             JOIN tags p ON p.name = mt.tag_name
             WHERE seed.tag_name = $1 AND p.type = 'person'
               AND p.deleted_at IS NULL AND p.is_hidden = FALSE
               AND ($2 OR p.is_protected = FALSE)
         )
         SELECT DISTINCT ON (t.name)
                t.id, t.name, t.type,
                m.thumbnail_path, m.thumbnail_md, m.file_path, m.server_location
         FROM media_tags pm
         JOIN people ON people.tag_name = pm.tag_name
         JOIN media_tags am ON am.media_id = pm.media_id
         JOIN tags t ON t.name = am.tag_name
         JOIN media m ON m.id = am.media_id AND m.deleted_at IS NULL
         WHERE t.type = 'album' AND t.name <> $1
           AND t.deleted_at IS NULL AND t.is_hidden = FALSE
           AND ($2 OR t.is_protected = FALSE)
         ORDER BY t.name, m.id DESC
         LIMIT $3",
    )
    .bind(seed)
    .bind(include_protected)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Padding only kicks in when the ranked branches come up short of a full
/// page of results.
const FALLBACK_THRESHOLD: usize = 10;
const FALLBACK_LIMIT: i64 = 10;

fn fallback_budget(ranked: usize) -> Option<i64> {
    (ranked < FALLBACK_THRESHOLD).then_some(FALLBACK_LIMIT)
}

/// Random visible tags, used to pad sparse results and as the whole answer
/// for tags of unknown type.
async fn fallback(
    db: &PgPool,
    include_protected: bool,
    limit: i64,
) -> Result<Vec<RelatedRow>, AppError> {
    let rows = sqlx::query_as::<_, RelatedRow>(
        "SELECT t.id, t.name, t.type,
                lm.thumbnail_path, lm.thumbnail_md, lm.file_path, lm.server_location
         FROM tags t
         LEFT JOIN LATERAL (
             SELECT m.thumbnail_path, m.thumbnail_md, m.file_path, m.server_location
             FROM media_tags mt
             JOIN media m ON m.id = mt.media_id
             WHERE mt.tag_name = t.name AND m.deleted_at IS NULL
             ORDER BY m.id DESC
             LIMIT 1
         ) lm ON TRUE
         WHERE t.deleted_at IS NULL AND t.is_hidden = FALSE
           AND ($1 OR t.is_protected = FALSE)
         ORDER BY random()
         LIMIT $2",
    )
    .bind(include_protected)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Ranked related tags for a seed tag. Branch order encodes priority; the
/// final list carries no duplicate names.
pub async fn related_tags(
    db: &PgPool,
    config: &Config,
    seed: &Tag,
    include_protected: bool,
) -> Result<Vec<RelatedTag>, AppError> {
    let mut rows: Vec<RelatedRow> = Vec::new();

    match TagType::from_db(seed.tag_type.as_deref()) {
        Some(TagType::Album) => {
            rows.extend(co_occurring(db, &seed.name, TagType::Stage, include_protected, 5).await?);
            rows.extend(co_occurring(db, &seed.name, TagType::Person, include_protected, 1).await?);
            rows.extend(albums_sharing_person(db, &seed.name, include_protected, 10).await?);
        }
        Some(TagType::Person) => {
            rows.extend(co_occurring(db, &seed.name, TagType::Album, include_protected, 10).await?);
            rows.extend(co_occurring(db, &seed.name, TagType::Stage, include_protected, 5).await?);
        }
        Some(TagType::Stage) => {
            rows.extend(co_occurring(db, &seed.name, TagType::Person, include_protected, 15).await?);
            rows.extend(co_occurring(db, &seed.name, TagType::Album, include_protected, 8).await?);
        }
        None => {}
    }

    if let Some(limit) = fallback_budget(rows.len()) {
        rows.extend(fallback(db, include_protected, limit).await?);
    }

    let related = rows
        .into_iter()
        .map(|row| row.into_related(config))
        .filter(|tag| tag.name != seed.name)
        .collect();
    Ok(dedupe_by_name(related))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn related(name: &str, tag_type: Option<&str>) -> RelatedTag {
        RelatedTag {
            id: 0,
            name: name.into(),
            tag_type: tag_type.map(str::to_string),
            thumbnail: None,
        }
    }

    #[test]
    fn fallback_pads_only_sparse_results() {
        assert_eq!(fallback_budget(0), Some(FALLBACK_LIMIT));
        assert_eq!(fallback_budget(9), Some(FALLBACK_LIMIT));
        assert_eq!(fallback_budget(10), None);
        assert_eq!(fallback_budget(25), None);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let tags = vec![
            related("alps", Some("album")),
            related("anna", Some("person")),
            related("alps", None),
            related("anna", Some("person")),
            related("beach", Some("stage")),
        ];
        let deduped = dedupe_by_name(tags);
        let names: Vec<&str> = deduped.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alps", "anna", "beach"]);
        // The first "alps" (with its type) won.
        assert_eq!(deduped[0].tag_type.as_deref(), Some("album"));
    }

    #[test]
    fn thumbnail_prefers_small_then_md_then_original() {
        assert_eq!(
            preferred_thumbnail(Some("t.jpg"), Some("m.jpg"), Some("f.jpg")).as_deref(),
            Some("t.jpg")
        );
        assert_eq!(
            preferred_thumbnail(None, Some("m.jpg"), Some("f.jpg")).as_deref(),
            Some("m.jpg")
        );
        assert_eq!(
            preferred_thumbnail(None, None, Some("f.jpg")).as_deref(),
            Some("f.jpg")
        );
        assert_eq!(preferred_thumbnail(None, None, None), None);
    }

    #[test]
    fn local_thumbnails_are_rewritten_remote_pass_through() {
        let config = test_config();
        let local = RelatedRow {
            id: 1,
            name: "alps".into(),
            tag_type: Some("album".into()),
            thumbnail_path: Some("a/thumb.jpg".into()),
            thumbnail_md: None,
            file_path: Some("a/b.jpg".into()),
            server_location: Some("local".into()),
        };
        assert_eq!(
            local.into_related(&config).thumbnail.as_deref(),
            Some("http://localhost:5002/file/a/thumb.jpg")
        );

        let remote = RelatedRow {
            id: 2,
            name: "anna".into(),
            tag_type: Some("person".into()),
            thumbnail_path: None,
            thumbnail_md: Some("https://cdn/x_md.jpg".into()),
            file_path: None,
            server_location: Some("remote".into()),
        };
        assert_eq!(
            remote.into_related(&config).thumbnail.as_deref(),
            Some("https://cdn/x_md.jpg")
        );
    }
}
