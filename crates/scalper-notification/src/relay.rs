//! 신규 체결 알림 릴레이.
//!
//! PostgreSQL `new_trade_channel` 채널을 구독하고, 새 체결 기록이
//! 삽입될 때마다 텔레그램 메시지를 전송합니다. 매도 체결에는 같은
//! 심볼의 직전 매수가 기준 실현 손익을 함께 표시합니다.

use crate::error::NotificationResult;
use crate::telegram::TelegramSender;
use rust_decimal::Decimal;
use scalper_core::{OrderType, Side};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// `trade_data` 트리거가 보내는 JSON 페이로드.
///
/// 알 수 없는 필드는 무시하고, NULL 컬럼은 `None`이 됩니다.
#[derive(Debug, Clone, Deserialize)]
pub struct TradePayload {
    pub token: String,
    pub order_id: Option<String>,
    pub position_size: Option<Decimal>,
    pub side: Option<Side>,
    pub order_type: Option<OrderType>,
    pub price: Option<Decimal>,
}

/// 심볼별 직전 매수가를 기억해 매도 손익을 계산합니다.
#[derive(Debug, Default)]
pub struct PnlTracker {
    last_buys: HashMap<String, Decimal>,
}

impl PnlTracker {
    /// 체결을 반영하고, 매도 체결이면 실현 손익을 반환합니다.
    ///
    /// 손익은 같은 심볼의 직전 매수가 기준입니다. 매수가를 모르는
    /// 매도, 가격이나 수량이 없는 체결은 `None`입니다.
    pub fn observe(&mut self, trade: &TradePayload) -> Option<Decimal> {
        match trade.side? {
            Side::Buy => {
                if let Some(price) = trade.price {
                    self.last_buys.insert(trade.token.clone(), price);
                    debug!(symbol = %trade.token, price = %price, "매수가 기억");
                }
                None
            }
            Side::Sell => {
                let buy_price = *self.last_buys.get(&trade.token)?;
                let price = trade.price?;
                let size = trade.position_size?;
                Some((price - buy_price) * size)
            }
        }
    }
}

/// 체결 알림 릴레이.
pub struct TradeRelay {
    listener: PgListener,
    sender: TelegramSender,
    pnl: PnlTracker,
}

impl TradeRelay {
    /// 풀에 연결된 릴레이를 생성하고 채널 구독을 시작합니다.
    pub async fn connect(pool: &PgPool, sender: TelegramSender) -> NotificationResult<Self> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen("new_trade_channel").await?;

        Ok(Self {
            listener,
            sender,
            pnl: PnlTracker::default(),
        })
    }

    /// 알림을 수신해 텔레그램으로 전달합니다.
    ///
    /// 페이로드 파싱 실패와 전송 실패는 경고만 남기고 다음 알림으로
    /// 넘어갑니다.
    pub async fn run(mut self) -> NotificationResult<()> {
        info!("체결 알림 릴레이 시작");

        loop {
            let notification = self.listener.recv().await?;

            let trade: TradePayload = match serde_json::from_str(notification.payload()) {
                Ok(trade) => trade,
                Err(e) => {
                    warn!(error = %e, payload = notification.payload(), "페이로드 파싱 실패");
                    continue;
                }
            };

            let pnl = self.pnl.observe(&trade);
            let message = self.sender.format_trade(&trade, pnl);

            if let Err(e) = self.sender.send(&message).await {
                warn!(symbol = %trade.token, error = %e, "텔레그램 전송 실패");
            }
        }
    }
}
