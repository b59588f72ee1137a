pub mod albums;
pub mod media;
pub mod playlists;
pub mod tags;
pub mod utils;

use axum::Router;

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/medias", media::router())
        .nest("/tags", tags::router())
        .nest("/playlists", playlists::router())
        .nest("/albums", albums::router())
        .nest("/utils", utils::router())
}
