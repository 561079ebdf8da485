//! 텔레그램 알림 전송.
//!
//! Telegram Bot API를 통해 체결 메시지를 전송합니다.

use crate::error::{NotificationError, NotificationResult};
use crate::relay::TradePayload;
use chrono::Utc;
use rust_decimal::Decimal;
use scalper_core::{Side, TelegramConfig};
use tracing::{debug, error, info, warn};

/// 텔레그램 알림 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 텔레그램 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self::new(TelegramConfig {
            enabled,
            bot_token,
            chat_id,
        }))
    }

    /// 전송기가 활성화되어 있는지 확인합니다.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    /// 체결 기록을 텔레그램 메시지로 포맷합니다.
    ///
    /// 페이로드에 없는 필드는 건너뛰고, 매도 손익이 주어지면
    /// 손익 줄을 덧붙입니다.
    pub fn format_trade(&self, trade: &TradePayload, pnl: Option<Decimal>) -> String {
        let (emoji, title) = match trade.side {
            Some(Side::Buy) => ("🟢", "매수 체결"),
            Some(Side::Sell) => ("🔴", "매도 체결"),
            None => ("📊", "체결"),
        };

        let mut lines = vec![
            format!("{emoji} <b>{title}</b>"),
            String::new(),
            format!("종목: <code>{}</code>", trade.token),
        ];

        if let Some(side) = trade.side {
            lines.push(format!("방향: {side}"));
        }
        if let Some(order_type) = trade.order_type {
            lines.push(format!("유형: {order_type}"));
        }
        if let Some(size) = trade.position_size {
            lines.push(format!("수량: {size}"));
        }
        if let Some(price) = trade.price {
            lines.push(format!("가격: {price}"));
        }
        if let Some(pnl) = pnl {
            let pnl_emoji = if pnl >= Decimal::ZERO { "💰" } else { "📉" };
            let pnl_sign = if pnl >= Decimal::ZERO { "+" } else { "" };
            lines.push(format!("손익: {pnl_emoji} <b>{pnl_sign}{pnl}</b>"));
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        format!("{}\n\n<i>🕐 {timestamp}</i>", lines.join("\n"))
    }

    /// 텔레그램에 메시지를 전송합니다.
    pub async fn send(&self, text: &str) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("텔레그램 알림이 비활성화되어 있어 건너뜀");
            return Ok(());
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );

        let params = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        debug!(chat_id = %self.config.chat_id, "텔레그램 메시지 전송");

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        if response.status().is_success() {
            info!("텔레그램 알림 전송 완료");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            // 요청 한도 제한 확인
            if status.as_u16() == 429 {
                warn!("텔레그램 요청 한도 제한");
                return Err(NotificationError::RateLimited(60));
            }

            error!("텔레그램 메시지 전송 실패: {} - {}", status, body);
            Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scalper_core::OrderType;

    fn sender() -> TelegramSender {
        TelegramSender::new(TelegramConfig {
            enabled: true,
            bot_token: "test_token".to_string(),
            chat_id: "123456".to_string(),
        })
    }

    fn buy_payload() -> TradePayload {
        TradePayload {
            token: "BTCUSDT".to_string(),
            order_id: Some("abc-123".to_string()),
            position_size: Some(dec!(1)),
            side: Some(Side::Buy),
            order_type: Some(OrderType::Limit),
            price: Some(dec!(50000.5)),
        }
    }

    #[test]
    fn test_format_buy_trade() {
        let message = sender().format_trade(&buy_payload(), None);

        assert!(message.contains("🟢"));
        assert!(message.contains("매수 체결"));
        assert!(message.contains("<code>BTCUSDT</code>"));
        assert!(message.contains("방향: Buy"));
        assert!(message.contains("유형: Limit"));
        assert!(message.contains("가격: 50000.5"));
        assert!(!message.contains("손익"));
    }

    #[test]
    fn test_format_sell_trade_with_pnl() {
        let mut trade = buy_payload();
        trade.side = Some(Side::Sell);

        let message = sender().format_trade(&trade, Some(dec!(12.5)));
        assert!(message.contains("🔴"));
        assert!(message.contains("매도 체결"));
        assert!(message.contains("손익: 💰 <b>+12.5</b>"));
    }

    #[test]
    fn test_format_loss_pnl() {
        let mut trade = buy_payload();
        trade.side = Some(Side::Sell);

        let message = sender().format_trade(&trade, Some(dec!(-3)));
        assert!(message.contains("손익: 📉 <b>-3</b>"));
    }

    #[test]
    fn test_format_skips_missing_fields() {
        let trade = TradePayload {
            token: "ETHUSDT".to_string(),
            order_id: None,
            position_size: None,
            side: None,
            order_type: None,
            price: None,
        };

        let message = sender().format_trade(&trade, None);
        assert!(message.contains("<code>ETHUSDT</code>"));
        assert!(!message.contains("방향"));
        assert!(!message.contains("수량"));
        assert!(!message.contains("가격"));
    }

    #[test]
    fn test_disabled_without_credentials() {
        let sender = TelegramSender::new(TelegramConfig {
            enabled: true,
            bot_token: String::new(),
            chat_id: String::new(),
        });
        assert!(!sender.is_enabled());
    }
}
