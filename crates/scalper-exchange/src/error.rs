//! 거래소 연동 에러 타입.

use thiserror::Error;

/// 거래소 작업 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 거래소 API가 반환한 에러 (retCode 또는 HTTP 상태)
    #[error("API 에러 [{code}]: {message}")]
    Api { code: i64, message: String },

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("요청 타임아웃")]
    Timeout,

    /// 요청 한도 초과
    #[error("요청 한도 초과 ({retry_after_secs}초 후 재시도)")]
    RateLimited { retry_after_secs: u64 },

    /// 인증 실패
    #[error("인증 실패: {0}")]
    Auth(String),

    /// 웹소켓 에러
    #[error("웹소켓 에러: {0}")]
    WebSocket(String),

    /// 응답 파싱 에러
    #[error("응답 파싱 에러: {0}")]
    Parse(String),
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_)
                | ExchangeError::Timeout
                | ExchangeError::RateLimited { .. }
                | ExchangeError::WebSocket(_)
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout
        } else if err.is_connect() {
            ExchangeError::Network(format!("연결 실패: {}", err))
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ExchangeError::WebSocket(err.to_string())
    }
}
