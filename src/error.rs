//! 코어 오류 타입 정의

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

/// 코어 오류 분류
#[derive(Debug, Error)]
pub enum CoreError {
    /// 대상 엔티티 없음
    #[error("{0} not found")]
    NotFound(&'static str),

    /// 현재 상태에서 허용되지 않는 연산
    #[error("{0}")]
    InvalidState(String),

    /// 정원 초과, 예약 겹침, 중복 녹화 등
    #[error("{0}")]
    Conflict(String),

    /// 호출자 권한 부족
    #[error("{0}")]
    PermissionDenied(String),

    /// 구역이 지정한 공간에 속하지 않음
    #[error("zone {zone_id} does not belong to space {space_id}")]
    InvalidZone { zone_id: Uuid, space_id: Uuid },
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// 클라이언트 전송용 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::PermissionDenied(_) => "PERMISSION_DENIED",
            CoreError::InvalidZone { .. } => "INVALID_ZONE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CoreError::InvalidZone { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
