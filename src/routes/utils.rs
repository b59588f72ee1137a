use std::path::{Component, Path};

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::middleware::AuthContext;
use crate::error::AppError;
use crate::scanner::{
    self, CreatedDateReport, MissingThumbnailsReport, OrphanThumbnailsReport, ScanOptions,
    ScanReport, ThumbnailCoverageReport,
};
use crate::tag_match::parse_tag_list;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scan-dir", get(scan_dir))
        .route("/scan-media", get(scan_media))
        .route("/generate-thumbnails", get(generate_thumbnails))
        .route("/find-thumbnails", get(find_thumbnails))
        .route("/update-created-date", get(update_created_date))
        .route("/find-orphan-thumbnails", get(find_orphan_thumbnails))
}

/// Normalize a `directory_path` parameter to a path relative to the media
/// root. Absolute paths and `..` components are rejected so a job can never
/// escape the root; an absent or `.` value means the whole root.
fn optional_scope(param: Option<&str>) -> Result<String, AppError> {
    let raw = param
        .map(|p| p.trim().trim_start_matches("./").trim_matches('/'))
        .unwrap_or("");
    if raw == "." {
        return Ok(String::new());
    }
    let path = Path::new(raw);
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(AppError::BadRequest(
            "directory_path must stay inside the media root".into(),
        ));
    }
    Ok(raw.to_string())
}

fn required_scope(param: Option<&str>) -> Result<String, AppError> {
    if param.map(str::trim).filter(|p| !p.is_empty()).is_none() {
        return Err(AppError::BadRequest("directory_path is required".into()));
    }
    optional_scope(param)
}

#[derive(Debug, Deserialize)]
struct ScanParams {
    directory_path: Option<String>,
    tags: Option<String>,
    #[serde(default)]
    is_protected: bool,
    recursive: Option<bool>,
}

impl ScanParams {
    fn into_options(self) -> Result<ScanOptions, AppError> {
        Ok(ScanOptions {
            directory: required_scope(self.directory_path.as_deref())?,
            seed_tags: self.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
            is_protected: self.is_protected,
            recursive: self.recursive.unwrap_or(true),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScopeParams {
    directory_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScanDirResponse {
    count: usize,
    files: Vec<String>,
}

/// Dry run: list files in the directory that are not yet cataloged.
async fn scan_dir(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ScanParams>,
) -> Result<Json<ScanDirResponse>, AppError> {
    auth.require_authenticated()?;
    let options = params.into_options()?;
    let files = scanner::uncataloged_files(
        &state.db,
        &state.config,
        &options.directory,
        options.recursive,
    )
    .await?;
    Ok(Json(ScanDirResponse {
        count: files.len(),
        files,
    }))
}

async fn scan_media(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ScanParams>,
) -> Result<Json<ScanReport>, AppError> {
    auth.require_authenticated()?;
    let options = params.into_options()?;
    let report = scanner::scan_media(&state.db, &state.config, &options).await?;
    if report.inserted > 0 {
        state.cache.clear();
    }
    Ok(Json(report))
}

async fn generate_thumbnails(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ScopeParams>,
) -> Result<Json<MissingThumbnailsReport>, AppError> {
    auth.require_authenticated()?;
    let directory = optional_scope(params.directory_path.as_deref())?;
    let report = scanner::find_missing_thumbnails(&state.db, &state.config, &directory).await?;
    if report.generated > 0 {
        state.cache.clear();
    }
    Ok(Json(report))
}

async fn find_thumbnails(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ScopeParams>,
) -> Result<Json<ThumbnailCoverageReport>, AppError> {
    auth.require_authenticated()?;
    let directory = optional_scope(params.directory_path.as_deref())?;
    let report = scanner::missing_thumbnail_report(&state.db, &state.config, &directory).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct UpdateDatesParams {
    directory_path: Option<String>,
    recursive_check: Option<bool>,
}

async fn update_created_date(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<UpdateDatesParams>,
) -> Result<Json<CreatedDateReport>, AppError> {
    auth.require_authenticated()?;
    let directory = optional_scope(params.directory_path.as_deref())?;
    let recursive = params.recursive_check.unwrap_or(true);
    let report =
        scanner::update_created_dates(&state.db, &state.config, &directory, recursive).await?;
    if report.updated > 0 {
        state.cache.clear();
    }
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct OrphanParams {
    directory_path: Option<String>,
    #[serde(default)]
    remove: bool,
}

/// Report thumbnails whose originals are gone. Deleting them requires both
/// `remove=true` and an admin token; everyone else gets the report only.
async fn find_orphan_thumbnails(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<OrphanParams>,
) -> Result<Json<OrphanThumbnailsReport>, AppError> {
    auth.require_authenticated()?;
    let directory = optional_scope(params.directory_path.as_deref())?;
    let remove = params.remove && auth.is_admin();
    let report = scanner::find_orphan_thumbnails(&state.config, &directory, remove).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_is_normalized_relative_to_the_root() {
        assert_eq!(optional_scope(None).unwrap(), "");
        assert_eq!(optional_scope(Some(".")).unwrap(), "");
        assert_eq!(optional_scope(Some("./trips/")).unwrap(), "trips");
        assert_eq!(optional_scope(Some("trips/alps")).unwrap(), "trips/alps");
    }

    #[test]
    fn scope_cannot_escape_the_root() {
        assert!(matches!(
            optional_scope(Some("../outside")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            optional_scope(Some("trips/../../outside")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            optional_scope(Some("/etc")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn scans_require_a_directory() {
        assert!(matches!(
            required_scope(None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            required_scope(Some("  ")),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(required_scope(Some("trips")).unwrap(), "trips");
    }

    #[test]
    fn scan_params_default_to_a_recursive_unprotected_scan() {
        let options = ScanParams {
            directory_path: Some("trips".into()),
            tags: Some("holiday, Alps".into()),
            is_protected: false,
            recursive: None,
        }
        .into_options()
        .unwrap();
        assert_eq!(options.directory, "trips");
        assert_eq!(options.seed_tags, vec!["holiday", "alps"]);
        assert!(options.recursive);
        assert!(!options.is_protected);
    }
}
