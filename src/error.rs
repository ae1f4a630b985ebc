use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// Failure talking to the search backend. `Clone` so a single in-flight fetch
/// can hand the same error to every request waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("decoding response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("rendering template: {0}")]
    Template(#[from] askama::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Search(_) => StatusCode::BAD_GATEWAY,
            AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    title: String,
    message: String,
}

/// Error boundary for every page: anything a handler propagates ends up
/// here as a logged error and a rendered error page.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        let tmpl = ErrorTemplate {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.to_string(),
        };
        match tmpl.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("template error: {}", e);
                (status, self.to_string()).into_response()
            }
        }
    }
}
