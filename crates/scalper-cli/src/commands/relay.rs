//! 체결 알림 릴레이 실행 명령.

use anyhow::Result;
use scalper_core::AppConfig;
use scalper_data::Database;
use scalper_notification::{TelegramSender, TradeRelay};
use tracing::info;

/// 데이터베이스 알림 채널을 구독해 텔레그램으로 중계합니다.
pub async fn relay(config: AppConfig) -> Result<()> {
    // 설정 파일에 자격증명이 없으면 환경 변수를 사용
    let sender = if config.telegram.bot_token.is_empty() {
        TelegramSender::from_env().ok_or_else(|| {
            anyhow::anyhow!(
                "Missing Telegram credentials (config [telegram] or TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID)"
            )
        })?
    } else {
        TelegramSender::new(config.telegram.clone())
    };

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    info!("체결 알림 릴레이 기동");

    let relay = TradeRelay::connect(db.pool(), sender).await?;
    relay.run().await?;

    Ok(())
}
