//! Constructors for the Kodi methods the notifier is usually asked to call.
//!
//! The dispatcher treats payloads as opaque; these only save callers from
//! spelling out method names and parameter keys.

use serde_json::json;

use kodi_common::types::JsonRpcRequest;

pub const PING: &str = "JSONRPC.Ping";
pub const VIDEO_LIBRARY_SCAN: &str = "VideoLibrary.Scan";
pub const VIDEO_LIBRARY_CLEAN: &str = "VideoLibrary.Clean";
pub const VIDEO_LIBRARY_REFRESH_MOVIE: &str = "VideoLibrary.RefreshMovie";
pub const VIDEO_LIBRARY_REFRESH_TVSHOW: &str = "VideoLibrary.RefreshTVShow";
pub const GUI_SHOW_NOTIFICATION: &str = "GUI.ShowNotification";

/// Liveness probe, no params.
pub fn ping() -> JsonRpcRequest {
    JsonRpcRequest::new(PING)
}

/// Scan the whole video library, or a single source directory.
pub fn video_library_scan(directory: Option<&str>) -> JsonRpcRequest {
    match directory {
        Some(dir) => JsonRpcRequest::new(VIDEO_LIBRARY_SCAN)
            .with_params(json!({ "directory": dir, "showdialogs": false })),
        None => JsonRpcRequest::new(VIDEO_LIBRARY_SCAN),
    }
}

pub fn video_library_clean() -> JsonRpcRequest {
    JsonRpcRequest::new(VIDEO_LIBRARY_CLEAN).with_params(json!({ "showdialogs": false }))
}

/// Re-read a movie's metadata (e.g. after its NFO was rewritten).
pub fn refresh_movie(movie_id: u64) -> JsonRpcRequest {
    JsonRpcRequest::new(VIDEO_LIBRARY_REFRESH_MOVIE)
        .with_params(json!({ "movieid": movie_id, "ignorenfo": false }))
}

pub fn refresh_tv_show(tvshow_id: u64, refresh_episodes: bool) -> JsonRpcRequest {
    JsonRpcRequest::new(VIDEO_LIBRARY_REFRESH_TVSHOW).with_params(json!({
        "tvshowid": tvshow_id,
        "refreshepisodes": refresh_episodes,
        "ignorenfo": false,
    }))
}

/// Pop a toast in the Kodi UI.
pub fn show_notification(title: &str, message: &str) -> JsonRpcRequest {
    JsonRpcRequest::new(GUI_SHOW_NOTIFICATION)
        .with_params(json!({ "title": title, "message": message }))
}
