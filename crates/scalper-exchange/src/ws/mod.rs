//! Bybit v5 웹소켓 스트림.
//!
//! 공개 호가창 스트림과 프라이빗 체결 스트림을 제공합니다. 두 스트림 모두
//! 지수 백오프 재연결 루프 안에서 실행되며 재연결할 때마다 인증/구독
//! 핸드셰이크를 다시 수행합니다. 연결이 살아 있는 동안 20초마다 JSON
//! keep-alive 핑을 보냅니다.

mod book;
mod execution;

pub use book::OrderBookStream;
pub use execution::ExecutionStream;

use serde::Serialize;
use std::time::Duration;

/// keep-alive 핑 주기.
pub(crate) const PING_INTERVAL: Duration = Duration::from_secs(20);
/// 재연결 초기 백오프.
pub(crate) const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// 재연결 최대 백오프.
pub(crate) const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// 다음 백오프 간격을 반환합니다.
pub(crate) fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// 토픽 구독 프레임.
#[derive(Debug, Serialize)]
pub(crate) struct SubscribeFrame {
    op: &'static str,
    args: Vec<String>,
}

impl SubscribeFrame {
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            op: "subscribe",
            args: topics,
        }
    }
}

/// keep-alive 핑 프레임.
#[derive(Debug, Serialize)]
pub(crate) struct PingFrame {
    req_id: &'static str,
    op: &'static str,
}

impl Default for PingFrame {
    fn default() -> Self {
        Self {
            req_id: "100001",
            op: "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_format() {
        let frame = SubscribeFrame::new(vec!["orderbook.1.BTCUSDT".to_string()]);
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"op":"subscribe","args":["orderbook.1.BTCUSDT"]}"#
        );
    }

    #[test]
    fn test_ping_frame_format() {
        assert_eq!(
            serde_json::to_string(&PingFrame::default()).unwrap(),
            r#"{"req_id":"100001","op":"ping"}"#
        );
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = INITIAL_BACKOFF;
        backoff = next_backoff(backoff);
        assert_eq!(backoff, Duration::from_secs(2));
        backoff = next_backoff(backoff);
        assert_eq!(backoff, Duration::from_secs(4));

        for _ in 0..10 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_BACKOFF);
    }
}
