// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Error

pub type Result<T> = std::result::Result<T, Error>;

/// 유일성 제약 위반 대상 컬럼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
    Unknown,
}

/// 크레이트 공통 에러
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0:?}")]
    Conflict(UniqueField),

    #[error("password hash error: {0}")]
    PasswordHash(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// 사용자에게는 일반 메시지만 노출하고 상세 내용은 로그로 남긴다.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::NotFound(what) => {
                info!("{:<12} --> 리소스 없음: {}", "Error", what);
                (StatusCode::NOT_FOUND, "The page you requested does not exist.")
            }
            _ => {
                error!("{:<12} --> 요청 처리 실패: {}", "Error", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again later.",
                )
            }
        };

        (status, Html(crate::views::error_page(status, message))).into_response()
    }
}

// endregion: --- Error
