//! 심볼별 트레이딩 에이전트와 supervisor.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 대기 → 진입 → 체결 대기 → 모니터링을 무한 반복하는 에이전트 상태 머신
//! - 손익률 구간별 청산 주문과 트레일링 스톱 관리
//! - 설정된 페어 전체의 스트림/에이전트를 기동하고 감독하는 Supervisor

pub mod agent;
pub mod supervisor;

// 주요 타입 재내보내기
pub use agent::TraderAgent;
pub use supervisor::Supervisor;
