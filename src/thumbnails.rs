//! Multi-resolution thumbnails stored next to their originals.
//!
//! Every thumbnail for `<dir>/<name>.<ext>` lives in `<dir>/thumbnails/`:
//! `thumb_<name>.jpg` (small), `thumb_<name>_md.jpg` and `thumb_<name>_lg.jpg`.
//! Scans skip `thumbnails` directories, so generated files are never
//! cataloged as media themselves.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::AppError;
use crate::models::media::FileType;
use crate::video;

const SM_MAX_DIM: u32 = 200;
const MD_MAX_DIM: u32 = 600;
const LG_MAX_DIM: u32 = 1024;

pub const THUMBNAIL_DIR: &str = "thumbnails";

/// The three on-disk thumbnail paths derived from an original file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSet {
    pub sm: PathBuf,
    pub md: PathBuf,
    pub lg: PathBuf,
}

impl ThumbnailSet {
    /// Paths for the given original. `None` when the path has no stem.
    pub fn for_media(file_path: &Path) -> Option<Self> {
        let stem = file_path.file_stem()?.to_str()?;
        let dir = file_path.parent()?.join(THUMBNAIL_DIR);
        Some(Self {
            sm: dir.join(format!("thumb_{stem}.jpg")),
            md: dir.join(format!("thumb_{stem}_md.jpg")),
            lg: dir.join(format!("thumb_{stem}_lg.jpg")),
        })
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.sm, &self.md, &self.lg]
    }

    pub fn exists(&self) -> bool {
        self.all().iter().all(|p| p.exists())
    }
}

/// Resize an image so its longest dimension is at most `max_dim`.
/// Returns the image unchanged if it's already within bounds.
fn resize_to_max(img: &DynamicImage, max_dim: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let longest = w.max(h);
    if longest <= max_dim {
        return img.clone();
    }
    img.resize(
        (w as f64 * max_dim as f64 / longest as f64) as u32,
        (h as f64 * max_dim as f64 / longest as f64) as u32,
        FilterType::Lanczos3,
    )
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, AppError> {
    let mut buf = Cursor::new(Vec::new());
    // JPEG can't carry alpha.
    DynamicImage::from(img.to_rgb8())
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| AppError::Internal(format!("Failed to encode JPEG: {e}")))?;
    Ok(buf.into_inner())
}

/// Decode raw image bytes and produce the three JPEG renditions.
pub fn generate(bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), AppError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::Internal(format!("Failed to detect image format: {e}")))?
        .decode()
        .map_err(|e| AppError::Internal(format!("Failed to decode image: {e}")))?;

    let sm = encode_jpeg(&resize_to_max(&img, SM_MAX_DIM))?;
    let md = encode_jpeg(&resize_to_max(&img, MD_MAX_DIM))?;
    let lg = encode_jpeg(&resize_to_max(&img, LG_MAX_DIM))?;
    Ok((sm, md, lg))
}

/// Generate and write the full thumbnail set for one original.
///
/// Photos are decoded from disk; videos contribute an extracted frame.
/// Music and documents have no thumbnails. Decode and encode run on a
/// blocking thread.
pub async fn generate_for_file(
    file_path: &Path,
    file_type: FileType,
) -> Result<Option<ThumbnailSet>, AppError> {
    let source = match file_type {
        FileType::Photo => tokio::fs::read(file_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read image: {e}")))?,
        FileType::Video => video::extract_frame(file_path).await?,
        FileType::Music | FileType::Document => return Ok(None),
    };

    let Some(set) = ThumbnailSet::for_media(file_path) else {
        return Ok(None);
    };

    let (sm, md, lg) =
        tokio::task::spawn_blocking(move || generate(&source))
            .await
            .map_err(|e| AppError::Internal(format!("Thumbnail task panicked: {e}")))??;

    if let Some(dir) = set.sm.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create thumbnail dir: {e}")))?;
    }
    for (path, bytes) in [(&set.sm, sm), (&set.md, md), (&set.lg, lg)] {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write thumbnail: {e}")))?;
    }

    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_paths_live_in_a_sibling_directory() {
        let set = ThumbnailSet::for_media(Path::new("media/trips/alps_001.jpg")).unwrap();
        assert_eq!(
            set.sm,
            Path::new("media/trips/thumbnails/thumb_alps_001.jpg")
        );
        assert_eq!(
            set.md,
            Path::new("media/trips/thumbnails/thumb_alps_001_md.jpg")
        );
        assert_eq!(
            set.lg,
            Path::new("media/trips/thumbnails/thumb_alps_001_lg.jpg")
        );
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let img = DynamicImage::new_rgb8(100, 50);
        let resized = resize_to_max(&img, 200);
        assert_eq!((resized.width(), resized.height()), (100, 50));
    }

    #[test]
    fn large_images_shrink_to_the_longest_dimension() {
        let img = DynamicImage::new_rgb8(2048, 1024);
        let resized = resize_to_max(&img, 1024);
        assert_eq!(resized.width(), 1024);
        assert_eq!(resized.height(), 512);
    }

    #[test]
    fn generate_produces_three_renditions() {
        let img = DynamicImage::new_rgb8(800, 600);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();

        let (sm, md, lg) = generate(&buf.into_inner()).unwrap();
        assert!(!sm.is_empty() && !md.is_empty() && !lg.is_empty());
    }
}
