//! Filesystem ingestion: walking the media root, deriving titles and tags
//! from paths, and reconciling what's on disk with the catalog.
//!
//! All paths stored in the catalog are relative to the media root, so the
//! `/file` static mount can serve them directly. Jobs can be scoped to a
//! subdirectory of the root; the scope never widens what gets stored, only
//! what gets visited.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::AppError;
use crate::models::media::{FileType, LOCAL_SERVER_LOCATION};
use crate::thumbnails::{self, THUMBNAIL_DIR, ThumbnailSet};
use crate::video;

/// Fixed fan-out width for thumbnail generation across files.
const THUMBNAIL_BATCH_SIZE: usize = 4;

/// Map a file extension to its catalog type. Unknown extensions are
/// skipped entirely during scans.
pub fn classify_extension(path: &Path) -> Option<FileType> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" => Some(FileType::Photo),
        "mp4" | "mkv" => Some(FileType::Video),
        "mp3" => Some(FileType::Music),
        "pdf" => Some(FileType::Document),
        _ => None,
    }
}

/// Request-provided knobs for an ingestion scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory relative to the media root; empty scans the whole root.
    pub directory: String,
    /// Tags appended to every ingested row on top of the path-derived ones.
    pub seed_tags: Vec<String>,
    /// Protection flag for every inserted row.
    pub is_protected: bool,
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            directory: String::new(),
            seed_tags: Vec::new(),
            is_protected: false,
            recursive: true,
        }
    }
}

fn scoped_root(config: &Config, directory: &str) -> PathBuf {
    let root = Path::new(&config.media_root);
    if directory.is_empty() {
        root.to_path_buf()
    } else {
        root.join(directory)
    }
}

/// SQL LIKE prefix limiting a catalog query to a scope directory.
fn dir_prefix(directory: &str) -> Option<String> {
    (!directory.is_empty()).then(|| format!("{directory}/%"))
}

/// Collect media files under `root`, skipping `thumbnails` directories.
/// Non-recursive walks stop at the top level. Iterative so no async
/// recursion is needed.
pub async fn walk_media_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {e}", dir.display())))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {e}", dir.display())))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to stat entry: {e}")))?;
            if file_type.is_dir() {
                if path.file_name().is_some_and(|n| n == THUMBNAIL_DIR) {
                    continue;
                }
                if recursive {
                    pending.push(path);
                }
            } else if classify_extension(&path).is_some() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_drive_letter(component: &str) -> bool {
    let mut chars = component.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some(':'), None) if c.is_ascii_alphabetic()
    )
}

/// Tags inferred from a path relative to the media root: every directory
/// component, plus the filename prefix before the first underscore. All
/// lowercased; drive letters and dots are dropped.
pub fn extract_tags_from_path(relative: &Path) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    let mut push = |tag: String| {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            let component = component.as_os_str().to_string_lossy().to_lowercase();
            if component == "." || component == ".." || is_drive_letter(&component) {
                continue;
            }
            push(component);
        }
    }

    if let Some(stem) = relative.file_stem().and_then(|s| s.to_str()) {
        let prefix = stem.split('_').next().unwrap_or(stem);
        push(prefix.to_lowercase());
    }

    tags
}

/// Path-derived tags plus the scan's seed tags, lowercased and deduplicated
/// with path tags first.
fn combined_tags(relative: &Path, seed_tags: &[String]) -> Vec<String> {
    let mut tags = extract_tags_from_path(relative);
    for tag in seed_tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn relative_path_string(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

#[derive(Debug, Serialize)]
pub struct ScanFailure {
    pub file_path: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: Vec<ScanFailure>,
}

/// Files in the scope that are not yet cataloged (live rows only).
pub async fn uncataloged_files(
    db: &PgPool,
    config: &Config,
    directory: &str,
    recursive: bool,
) -> Result<Vec<String>, AppError> {
    let root = Path::new(&config.media_root);
    let files = walk_media_files(&scoped_root(config, directory), recursive).await?;

    let known: Vec<String> =
        sqlx::query_scalar("SELECT file_path FROM media WHERE deleted_at IS NULL")
            .fetch_all(db)
            .await?;

    Ok(files
        .iter()
        .map(|p| relative_path_string(root, p))
        .filter(|p| !known.contains(p))
        .collect())
}

type GeneratedThumbnails = HashMap<PathBuf, Result<Option<ThumbnailSet>, AppError>>;

/// Generate thumbnails for every photo and video in `files` whose set on
/// disk is incomplete, fanning out in fixed-width parallel batches.
async fn generate_missing_thumbnails(files: &[PathBuf]) -> GeneratedThumbnails {
    let jobs: Vec<(PathBuf, FileType)> = files
        .iter()
        .filter_map(|path| classify_extension(path).map(|t| (path.clone(), t)))
        .filter(|(path, file_type)| {
            matches!(file_type, FileType::Photo | FileType::Video)
                && ThumbnailSet::for_media(path).is_some_and(|set| !set.exists())
        })
        .collect();

    let mut results = GeneratedThumbnails::new();
    for batch in jobs.chunks(THUMBNAIL_BATCH_SIZE) {
        let mut tasks = JoinSet::new();
        for (path, file_type) in batch.iter().cloned() {
            tasks.spawn(async move {
                let result = thumbnails::generate_for_file(&path, file_type).await;
                (path, result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Ok((path, result)) = joined {
                results.insert(path, result);
            }
        }
    }
    results
}

async fn ingest_file(
    db: &PgPool,
    root: &Path,
    path: &Path,
    options: &ScanOptions,
    generated: Option<Result<Option<ThumbnailSet>, AppError>>,
) -> Result<bool, AppError> {
    let Some(file_type) = classify_extension(path) else {
        return Ok(false);
    };
    let relative = path.strip_prefix(root).unwrap_or(path);
    let file_path = relative_path_string(root, path);

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string();
    let tags = combined_tags(relative, &options.seed_tags);
    let tags = (!tags.is_empty()).then(|| tags.join(","));

    let duration = match file_type {
        FileType::Video | FileType::Music => Some(video::probe_duration(path).await?),
        FileType::Photo | FileType::Document => None,
    };

    // Thumbnails were generated up front in parallel batches; files whose
    // set already existed fall through to the on-disk paths.
    let set = match generated {
        Some(result) => result?,
        None => ThumbnailSet::for_media(path).filter(|set| set.exists()),
    };
    let thumbs = set
        .filter(|_| matches!(file_type, FileType::Photo | FileType::Video))
        .map(|set| {
            (
                relative_path_string(root, &set.sm),
                relative_path_string(root, &set.md),
                relative_path_string(root, &set.lg),
            )
        });
    let (thumb_sm, thumb_md, thumb_lg) = match thumbs {
        Some((sm, md, lg)) => (Some(sm), Some(md), Some(lg)),
        None => (None, None, None),
    };

    // The partial unique index keeps one live row per path; a soft-deleted
    // row does not block re-ingestion.
    let result = sqlx::query(
        "INSERT INTO media (title, file_path, file_type, duration, tags,
                            thumbnail_path, thumbnail_md, thumbnail_lg,
                            server_location, is_protected)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (file_path) WHERE deleted_at IS NULL DO NOTHING",
    )
    .bind(&title)
    .bind(&file_path)
    .bind(file_type.as_str())
    .bind(duration)
    .bind(&tags)
    .bind(&thumb_sm)
    .bind(&thumb_md)
    .bind(&thumb_lg)
    .bind(LOCAL_SERVER_LOCATION)
    .bind(options.is_protected)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Full ingestion pass: walk the scope and catalog every new file, probing
/// durations and generating missing thumbnails along the way. Thumbnail
/// generation fans out in fixed-width batches; failures are collected per
/// file, so one bad file never aborts the scan.
pub async fn scan_media(
    db: &PgPool,
    config: &Config,
    options: &ScanOptions,
) -> Result<ScanReport, AppError> {
    let root = Path::new(&config.media_root);
    let files = walk_media_files(&scoped_root(config, &options.directory), options.recursive).await?;

    let mut report = ScanReport {
        scanned: files.len(),
        ..ScanReport::default()
    };

    let mut generated = generate_missing_thumbnails(&files).await;
    for path in &files {
        match ingest_file(db, root, path, options, generated.remove(path)).await {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.skipped += 1,
            Err(err) => {
                let file_path = relative_path_string(root, path);
                tracing::warn!(file = %file_path, error = %err, "Scan failed for file");
                report.failed.push(ScanFailure {
                    file_path,
                    reason: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        inserted = report.inserted,
        skipped = report.skipped,
        failed = report.failed.len(),
        "Media scan finished"
    );
    Ok(report)
}

#[derive(Debug, Default, Serialize)]
pub struct CreatedDateReport {
    pub checked: usize,
    pub updated: usize,
}

/// Backdate `created_at` for converted videos: an `.mp4` whose sibling
/// `.MOV` original still exists inherits the original's modification time.
/// With `recursive` off, only direct children of the scope directory are
/// considered.
pub async fn update_created_dates(
    db: &PgPool,
    config: &Config,
    directory: &str,
    recursive: bool,
) -> Result<CreatedDateReport, AppError> {
    let root = Path::new(&config.media_root);
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT id, file_path FROM media
         WHERE file_type = 'video' AND server_location = 'local' AND deleted_at IS NULL",
    );
    if let Some(prefix) = dir_prefix(directory) {
        qb.push(" AND file_path LIKE ").push_bind(prefix);
    }
    let mut rows: Vec<(i32, String)> = qb.build_query_as().fetch_all(db).await?;
    if !recursive {
        rows.retain(|(_, path)| {
            Path::new(path)
                .parent()
                .is_some_and(|parent| parent == Path::new(directory))
        });
    }

    let mut report = CreatedDateReport::default();
    for (id, file_path) in rows {
        let path = root.join(&file_path);
        if !path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("mp4"))
        {
            continue;
        }
        let original = path.with_extension("MOV");
        report.checked += 1;

        let Ok(metadata) = tokio::fs::metadata(&original).await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let timestamp: chrono::DateTime<chrono::Utc> = modified.into();

        sqlx::query("UPDATE media SET created_at = $1 WHERE id = $2")
            .bind(timestamp)
            .bind(id)
            .execute(db)
            .await?;
        report.updated += 1;
    }

    Ok(report)
}

#[derive(Debug, Default, Serialize)]
pub struct ThumbnailCoverageReport {
    pub checked: usize,
    pub missing: Vec<String>,
}

/// Report-only pass: which cataloged photos and videos in the scope lack a
/// complete thumbnail set on disk. Generation is a separate job.
pub async fn missing_thumbnail_report(
    db: &PgPool,
    config: &Config,
    directory: &str,
) -> Result<ThumbnailCoverageReport, AppError> {
    let root = Path::new(&config.media_root);
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT file_path FROM media
         WHERE file_type IN ('photo', 'video') AND server_location = 'local'
           AND deleted_at IS NULL",
    );
    if let Some(prefix) = dir_prefix(directory) {
        qb.push(" AND file_path LIKE ").push_bind(prefix);
    }
    let rows: Vec<String> = qb.build_query_scalar().fetch_all(db).await?;

    let mut report = ThumbnailCoverageReport {
        checked: rows.len(),
        ..ThumbnailCoverageReport::default()
    };
    for file_path in rows {
        let complete = ThumbnailSet::for_media(&root.join(&file_path))
            .is_some_and(|set| set.exists());
        if !complete {
            report.missing.push(file_path);
        }
    }
    report.missing.sort();
    Ok(report)
}

#[derive(Debug, Default, Serialize)]
pub struct MissingThumbnailsReport {
    pub checked: usize,
    pub generated: usize,
    pub failed: Vec<ScanFailure>,
}

/// Generate thumbnails for cataloged photos and videos in the scope whose
/// set on disk is incomplete, fanning out in fixed-width batches, and
/// record the new paths on their rows.
pub async fn find_missing_thumbnails(
    db: &PgPool,
    config: &Config,
    directory: &str,
) -> Result<MissingThumbnailsReport, AppError> {
    let root = Path::new(&config.media_root);
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT id, file_path, file_type FROM media
         WHERE file_type IN ('photo', 'video') AND server_location = 'local'
           AND deleted_at IS NULL",
    );
    if let Some(prefix) = dir_prefix(directory) {
        qb.push(" AND file_path LIKE ").push_bind(prefix);
    }
    let rows: Vec<(i32, String, String)> = qb.build_query_as().fetch_all(db).await?;

    let mut report = MissingThumbnailsReport {
        checked: rows.len(),
        ..MissingThumbnailsReport::default()
    };

    let jobs: Vec<(i32, String, FileType)> = rows
        .into_iter()
        .filter_map(|(id, file_path, file_type)| {
            let set = ThumbnailSet::for_media(&root.join(&file_path))?;
            (!set.exists()).then(|| {
                let file_type = match file_type.as_str() {
                    "photo" => FileType::Photo,
                    _ => FileType::Video,
                };
                (id, file_path, file_type)
            })
        })
        .collect();

    for batch in jobs.chunks(THUMBNAIL_BATCH_SIZE) {
        let mut tasks = JoinSet::new();
        for (id, file_path, file_type) in batch.iter().cloned() {
            let path = root.join(&file_path);
            tasks.spawn(async move {
                let result = thumbnails::generate_for_file(&path, file_type).await;
                (id, file_path, result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let Ok((id, file_path, result)) = joined else {
                continue;
            };
            match result {
                Ok(Some(set)) => {
                    sqlx::query(
                        "UPDATE media
                         SET thumbnail_path = $1, thumbnail_md = $2, thumbnail_lg = $3
                         WHERE id = $4",
                    )
                    .bind(relative_path_string(root, &set.sm))
                    .bind(relative_path_string(root, &set.md))
                    .bind(relative_path_string(root, &set.lg))
                    .bind(id)
                    .execute(db)
                    .await?;
                    report.generated += 1;
                }
                Ok(None) => {}
                Err(err) => report.failed.push(ScanFailure {
                    file_path,
                    reason: err.to_string(),
                }),
            }
        }
    }

    Ok(report)
}

/// Original stem encoded in a thumbnail filename, if it follows the
/// `thumb_<stem>[_md|_lg].jpg` convention.
pub fn thumbnail_stem(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".jpg")?.strip_prefix("thumb_")?;
    let stem = stem.strip_suffix("_md").unwrap_or(stem);
    let stem = stem.strip_suffix("_lg").unwrap_or(stem);
    (!stem.is_empty()).then_some(stem)
}

#[derive(Debug, Default, Serialize)]
pub struct OrphanThumbnailsReport {
    pub orphans: Vec<String>,
    pub removed: usize,
}

/// Thumbnails in the scope whose original no longer exists next to them.
/// Deletion only happens when `remove` is set; the default run just
/// reports.
pub async fn find_orphan_thumbnails(
    config: &Config,
    directory: &str,
    remove: bool,
) -> Result<OrphanThumbnailsReport, AppError> {
    let root = Path::new(&config.media_root);
    let mut report = OrphanThumbnailsReport::default();
    let mut pending = vec![scoped_root(config, directory)];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {e}", dir.display())))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {}: {e}", dir.display())))?
        {
            let path = entry.path();
            if entry
                .file_type()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to stat entry: {e}")))?
                .is_dir()
            {
                pending.push(path);
                continue;
            }
            if dir.file_name().is_none_or(|n| n != THUMBNAIL_DIR) {
                continue;
            }

            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(thumbnail_stem)
            else {
                continue;
            };
            let Some(media_dir) = dir.parent() else {
                continue;
            };

            let mut original_exists = false;
            for ext in ["jpg", "jpeg", "png", "mp4", "mkv"] {
                if media_dir.join(format!("{stem}.{ext}")).exists() {
                    original_exists = true;
                    break;
                }
            }
            if original_exists {
                continue;
            }

            report
                .orphans
                .push(relative_path_string(root, &path));
            if remove && tokio::fs::remove_file(&path).await.is_ok() {
                report.removed += 1;
            }
        }
    }

    report.orphans.sort();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_classify_case_insensitively() {
        assert_eq!(
            classify_extension(Path::new("a/b.JPG")),
            Some(FileType::Photo)
        );
        assert_eq!(
            classify_extension(Path::new("a/b.mkv")),
            Some(FileType::Video)
        );
        assert_eq!(
            classify_extension(Path::new("a/b.mp3")),
            Some(FileType::Music)
        );
        assert_eq!(
            classify_extension(Path::new("a/b.pdf")),
            Some(FileType::Document)
        );
        assert_eq!(classify_extension(Path::new("a/b.txt")), None);
        assert_eq!(classify_extension(Path::new("a/noext")), None);
    }

    #[test]
    fn tags_come_from_directories_and_filename_prefix() {
        let tags = extract_tags_from_path(Path::new("Trips/Alps/alps_001.jpg"));
        assert_eq!(tags, vec!["trips", "alps"]);

        let tags = extract_tags_from_path(Path::new("Concerts/berlin_2024.mp4"));
        assert_eq!(tags, vec!["concerts", "berlin"]);
    }

    #[test]
    fn drive_letters_and_dots_are_not_tags() {
        let tags = extract_tags_from_path(Path::new("C:/media/cats/cat_01.jpg"));
        assert_eq!(tags, vec!["media", "cats", "cat"]);

        let tags = extract_tags_from_path(Path::new("./pets/dog.jpg"));
        assert_eq!(tags, vec!["pets", "dog"]);
    }

    #[test]
    fn seed_tags_append_after_path_tags_without_duplicates() {
        let tags = combined_tags(
            Path::new("Trips/alps_001.jpg"),
            &["Holiday".to_string(), "trips".to_string(), " ".to_string()],
        );
        assert_eq!(tags, vec!["trips", "alps", "holiday"]);
    }

    #[test]
    fn thumbnail_stems_round_trip_all_three_sizes() {
        assert_eq!(thumbnail_stem("thumb_alps_001.jpg"), Some("alps_001"));
        assert_eq!(thumbnail_stem("thumb_alps_001_md.jpg"), Some("alps_001"));
        assert_eq!(thumbnail_stem("thumb_alps_001_lg.jpg"), Some("alps_001"));
        assert_eq!(thumbnail_stem("alps_001.jpg"), None);
        assert_eq!(thumbnail_stem("thumb_.jpg"), None);
    }

    #[tokio::test]
    async fn walk_skips_thumbnail_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("trips/thumbnails")).unwrap();
        std::fs::write(root.join("trips/alps.jpg"), b"x").unwrap();
        std::fs::write(root.join("trips/thumbnails/thumb_alps.jpg"), b"x").unwrap();
        std::fs::write(root.join("notes.txt"), b"x").unwrap();

        let files = walk_media_files(root, true).await.unwrap();
        assert_eq!(files, vec![root.join("trips/alps.jpg")]);
    }

    #[tokio::test]
    async fn non_recursive_walk_stays_at_the_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("trips")).unwrap();
        std::fs::write(root.join("top.jpg"), b"x").unwrap();
        std::fs::write(root.join("trips/alps.jpg"), b"x").unwrap();

        let files = walk_media_files(root, false).await.unwrap();
        assert_eq!(files, vec![root.join("top.jpg")]);
    }

    #[tokio::test]
    async fn batched_generation_covers_only_incomplete_sets() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pics")).unwrap();
        let img = image::DynamicImage::new_rgb8(16, 16);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        std::fs::write(root.join("pics/dot.png"), buf.into_inner()).unwrap();

        let files = vec![root.join("pics/dot.png")];
        let mut results = generate_missing_thumbnails(&files).await;
        let set = results.remove(&files[0]).unwrap().unwrap().unwrap();
        assert!(set.exists());

        // A complete set on disk means no further work is scheduled.
        let results = generate_missing_thumbnails(&files).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn orphan_report_spares_thumbnails_with_originals() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("trips/thumbnails")).unwrap();
        std::fs::write(root.join("trips/alps.jpg"), b"x").unwrap();
        std::fs::write(root.join("trips/thumbnails/thumb_alps.jpg"), b"x").unwrap();
        std::fs::write(root.join("trips/thumbnails/thumb_gone_md.jpg"), b"x").unwrap();

        let config = crate::config::Config {
            media_root: root.to_string_lossy().into_owned(),
            ..crate::config::test_config()
        };

        let report = find_orphan_thumbnails(&config, "", false).await.unwrap();
        assert_eq!(report.orphans, vec!["trips/thumbnails/thumb_gone_md.jpg"]);
        assert_eq!(report.removed, 0);
        assert!(root.join("trips/thumbnails/thumb_gone_md.jpg").exists());

        let report = find_orphan_thumbnails(&config, "", true).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(!root.join("trips/thumbnails/thumb_gone_md.jpg").exists());
    }

    #[tokio::test]
    async fn orphan_scan_respects_the_scope_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("a/thumbnails")).unwrap();
        std::fs::create_dir_all(root.join("b/thumbnails")).unwrap();
        std::fs::write(root.join("a/thumbnails/thumb_gone.jpg"), b"x").unwrap();
        std::fs::write(root.join("b/thumbnails/thumb_lost.jpg"), b"x").unwrap();

        let config = crate::config::Config {
            media_root: root.to_string_lossy().into_owned(),
            ..crate::config::test_config()
        };

        let report = find_orphan_thumbnails(&config, "a", false).await.unwrap();
        assert_eq!(report.orphans, vec!["a/thumbnails/thumb_gone.jpg"]);
    }
}
