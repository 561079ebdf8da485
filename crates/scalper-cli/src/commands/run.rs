//! 트레이딩 봇 실행 명령.

use anyhow::{Context, Result};
use scalper_core::AppConfig;
use scalper_data::{Database, TradeRecorder, TradeRepository};
use scalper_exchange::{BybitClient, BybitConfig};
use scalper_execution::Supervisor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// 체결 기록 채널 용량.
const FILL_CHANNEL_CAPACITY: usize = 1000;

/// 설정을 조립해 트레이딩 봇을 기동합니다.
pub async fn run(config: AppConfig) -> Result<()> {
    let pairs = config
        .trading
        .parsed_pairs()
        .context("Invalid trading.pairs")?;
    if pairs.is_empty() {
        anyhow::bail!("No trading pairs configured (trading.pairs)");
    }

    let poll_interval = Duration::from_millis(config.trading.poll_interval_ms);

    // 설정 파일에 자격증명이 없으면 환경 변수를 사용
    let bybit_config = if config.exchange.api_key.is_empty() {
        BybitConfig::from_env().context(
            "Missing Bybit credentials (config [exchange] or BYBIT_API_KEY/BYBIT_API_SECRET)",
        )?
    } else {
        BybitConfig::from_settings(&config.exchange)
    };

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let (fill_tx, fill_rx) = mpsc::channel(FILL_CHANNEL_CAPACITY);
    let recorder = TradeRecorder::new(TradeRepository::new(db.clone()), fill_rx);
    tokio::spawn(recorder.run());

    info!(
        pairs = pairs.len(),
        poll_interval_ms = config.trading.poll_interval_ms,
        testnet = bybit_config.testnet,
        "트레이딩 봇 기동"
    );

    let client = Arc::new(BybitClient::new(bybit_config.clone()));
    let supervisor = Supervisor::new(client, bybit_config, pairs, poll_interval, fill_tx);
    supervisor.run().await;

    Ok(())
}
