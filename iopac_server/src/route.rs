use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use axum::{
    extract::State,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::error;

pub static HEALTH_PATH: &str = "/health";
static CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

#[derive(Debug, Clone)]
struct CalendarFile {
    path: Arc<PathBuf>,
    disposition: Arc<str>,
}

/// Build the router serving the calendar file at `calendar_path`.
pub fn router(calendar_path: &str, calendar_file: impl Into<PathBuf>) -> Router {
    let path = calendar_file.into();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("iopac.ics"));
    let state = CalendarFile {
        path: Arc::new(path),
        disposition: Arc::from(format!("attachment; filename=\"{file_name}\"")),
    };
    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(calendar_path, get(handler))
        .with_state(state)
}

/// Handle calendar requests.
///
/// The file is read on every request. A refresh replaces it in one step, so a response carries
/// either the previous or the new calendar.
async fn handler(State(file): State<CalendarFile>) -> Result<Response, (StatusCode, String)> {
    match tokio::fs::read(file.path.as_path()).await {
        Ok(ics) => Ok((
            [
                (CONTENT_TYPE, CALENDAR_CONTENT_TYPE),
                (CONTENT_DISPOSITION, &*file.disposition),
            ],
            ics,
        )
            .into_response()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err((
            StatusCode::NOT_FOUND,
            String::from("calendar not available yet"),
        )),
        Err(err) => {
            error!("reading {}: {err}", file.path.display());
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
