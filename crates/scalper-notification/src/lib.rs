//! 트레이딩 알림 서비스.
//!
//! 이 crate는 다음을 제공합니다:
//! - 텔레그램 체결 메시지 전송기
//! - 데이터베이스 알림 채널을 구독해 체결 메시지를 중계하는 릴레이

pub mod error;
pub mod relay;
pub mod telegram;

pub use error::{NotificationError, NotificationResult};

// 주요 타입 재내보내기
pub use relay::{PnlTracker, TradePayload, TradeRelay};
pub use telegram::TelegramSender;
