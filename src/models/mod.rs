pub mod album;
pub mod media;
pub mod playlist;
pub mod tag;
