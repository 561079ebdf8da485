//! 리스크 계산 모듈.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 포지션 스냅샷에서 레버리지 반영 손익률 계산
//! - 평균 진입가 기준 트레일링 스톱 가격 계산
//! - 손익 체크포인트 기반 트레일링 스톱 래칫
//!
//! # 예제
//!
//! ```rust,ignore
//! use scalper_risk::{pnl_percent, StopRatchet};
//!
//! let mut ratchet = StopRatchet::default();
//!
//! if let Some(pnl) = pnl_percent(&position) {
//!     for stop_percent in ratchet.advance(pnl) {
//!         // 거래소에 새 스톱 가격 전송
//!     }
//! }
//! ```

pub mod pnl;
pub mod trailing;

// 주요 타입 재내보내기
pub use pnl::{pnl_percent, trailing_stop_price};
pub use trailing::{RatchetParams, StopRatchet};
