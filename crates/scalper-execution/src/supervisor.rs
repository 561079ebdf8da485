//! 심볼별 에이전트와 웹소켓 스트림을 기동하는 슈퍼바이저.
//!
//! 계정 단위 사설 체결 스트림 하나와, 거래 대상 심볼마다
//! 호가 스트림 + 트레이딩 에이전트 한 쌍을 띄웁니다.

use crate::agent::TraderAgent;
use scalper_core::{PairConfig, TradeRecord};
use scalper_exchange::{BookSampler, BybitClient, BybitConfig, ExecutionStream, OrderBookStream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// 전체 트레이딩 프로세스의 최상위 조립 지점.
pub struct Supervisor {
    client: Arc<BybitClient>,
    config: BybitConfig,
    pairs: Vec<PairConfig>,
    poll_interval: Duration,
    fill_tx: mpsc::Sender<TradeRecord>,
}

impl Supervisor {
    pub fn new(
        client: Arc<BybitClient>,
        config: BybitConfig,
        pairs: Vec<PairConfig>,
        poll_interval: Duration,
        fill_tx: mpsc::Sender<TradeRecord>,
    ) -> Self {
        Self {
            client,
            config,
            pairs,
            poll_interval,
            fill_tx,
        }
    }

    /// 체결 스트림과 모든 에이전트를 기동하고 감독합니다.
    ///
    /// 에이전트는 정상 동작 중에는 반환하지 않으므로, 태스크 종료가
    /// 관측되면 장애로 보고 로그를 남깁니다.
    pub async fn run(self) {
        info!(pairs = self.pairs.len(), "슈퍼바이저 시작");

        // 체결 알림 스트림은 계정 단위이므로 하나만 기동한다
        let execution = ExecutionStream::new(self.config.clone(), self.fill_tx.clone());
        tokio::spawn(execution.run());

        let mut agents = Vec::new();
        for pair in &self.pairs {
            let (book, book_rx) =
                OrderBookStream::new(self.config.ws_public_url.clone(), pair.symbol.clone());
            tokio::spawn(book.run());

            let sampler = BookSampler::new(book_rx, self.poll_interval);
            let agent = TraderAgent::new(
                Arc::clone(&self.client),
                sampler,
                pair.symbol.clone(),
                pair.qty,
                self.poll_interval,
            );

            info!(symbol = %pair.symbol, qty = %pair.qty, "에이전트 기동");
            agents.push(tokio::spawn(agent.run()));
        }

        for handle in agents {
            if let Err(e) = handle.await {
                error!(error = %e, "에이전트 태스크 비정상 종료");
            }
        }
    }
}
