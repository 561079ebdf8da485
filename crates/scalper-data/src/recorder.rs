//! 체결 스트림을 데이터베이스로 흘려보내는 레코더.

use crate::trades::TradeRepository;
use scalper_core::TradeRecord;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// 채널로 들어오는 체결 기록을 순서대로 저장합니다.
///
/// 저장 실패는 경고만 남기고 다음 기록으로 넘어갑니다.
pub struct TradeRecorder {
    repo: TradeRepository,
    rx: mpsc::Receiver<TradeRecord>,
}

impl TradeRecorder {
    pub fn new(repo: TradeRepository, rx: mpsc::Receiver<TradeRecord>) -> Self {
        Self { repo, rx }
    }

    /// 채널이 닫힐 때까지 체결 기록을 저장합니다.
    pub async fn run(mut self) {
        info!("체결 레코더 시작");

        while let Some(record) = self.rx.recv().await {
            if let Err(e) = self.repo.insert(&record).await {
                warn!(symbol = %record.symbol, error = %e, "체결 기록 저장 실패");
            }
        }

        info!("체결 레코더 종료");
    }
}
