use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use tc_database_postgres::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebError {
  #[error("Storage unavailable: {0}")]
  Repository(#[from] RepositoryError),

  #[error("Bad request: {0}")]
  BadRequest(String),
}

impl ResponseError for WebError {
  fn status_code(&self) -> StatusCode {
    match self {
      WebError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
      WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let message = match self {
      WebError::Repository(_) => "Failed to read cryptocurrency data".to_string(),
      WebError::BadRequest(reason) => reason.clone(),
    };
    HttpResponse::build(self.status_code()).json(json!({ "status": "error", "message": message }))
  }
}

pub type WebResult<T> = Result<T, WebError>;
