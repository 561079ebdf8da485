//! 프라이빗 체결 스트림.

use super::{next_backoff, PingFrame, SubscribeFrame, INITIAL_BACKOFF, PING_INTERVAL};
use crate::client::{hmac_sha256_hex, parse_opt_decimal, timestamp_ms, BybitConfig};
use crate::error::{ExchangeError, ExchangeResult};
use futures::{SinkExt, StreamExt};
use scalper_core::{OrderType, Side, TradeRecord};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{info, warn};

/// 인증 만료 여유 시간.
const AUTH_EXPIRY_MARGIN_MS: u64 = 10_000;

/// 전체 심볼의 체결 이벤트를 구독해 체결 기록 채널로 전달하는
/// 프라이빗 스트림. 프로세스당 하나만 실행됩니다.
pub struct ExecutionStream {
    config: BybitConfig,
    tx: mpsc::Sender<TradeRecord>,
}

impl ExecutionStream {
    /// 새 스트림을 생성합니다.
    pub fn new(config: BybitConfig, tx: mpsc::Sender<TradeRecord>) -> Self {
        Self { config, tx }
    }

    /// 재연결 루프를 실행합니다. 수신측이 사라지면 종료합니다.
    pub async fn run(self) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.run_session(&mut backoff).await {
                Ok(()) => {
                    info!("체결 스트림 종료");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, retry_in = ?backoff, "체결 스트림 끊김, 재연결");
                }
            }

            if self.tx.is_closed() {
                return;
            }

            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    }

    /// 한 세션을 실행합니다: 연결, 인증, 구독, 수신 루프.
    async fn run_session(&self, backoff: &mut Duration) -> ExchangeResult<()> {
        let (ws_stream, _) = connect_async(&self.config.ws_private_url).await?;
        let (mut write, mut read) = ws_stream.split();

        // 인증 후 구독
        let expires = timestamp_ms() + AUTH_EXPIRY_MARGIN_MS;
        write
            .send(Message::Text(auth_frame(&self.config, expires).into()))
            .await?;

        let subscribe =
            serde_json::to_string(&SubscribeFrame::new(vec!["execution.linear".to_string()]))?;
        write.send(Message::Text(subscribe.into())).await?;
        info!("체결 스트림 구독");

        *backoff = INITIAL_BACKOFF;

        let ping = serde_json::to_string(&PingFrame::default())?;
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await;

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    write.send(Message::Text(ping.clone().into())).await?;
                }
                message = read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(record) = parse_execution_message(&text) {
                                if self.tx.send(record).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            write.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(ExchangeError::WebSocket(
                                "연결이 종료되었습니다".to_string(),
                            ));
                        }
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }
}

/// 인증 프레임 JSON을 생성합니다.
///
/// 서명은 `GET/realtime{expires}` 문자열에 대한 HMAC-SHA256입니다.
fn auth_frame(config: &BybitConfig, expires_ms: u64) -> String {
    let signature = hmac_sha256_hex(
        config.api_secret.expose_secret(),
        &format!("GET/realtime{}", expires_ms),
    );

    serde_json::json!({
        "op": "auth",
        "args": [config.api_key, expires_ms, signature],
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct ExecutionMessage {
    topic: String,
    data: Vec<ExecutionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionDto {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    order_type: String,
    #[serde(default)]
    exec_qty: String,
    #[serde(default)]
    exec_price: String,
}

/// 체결 메시지를 체결 기록으로 변환합니다.
///
/// 한 메시지의 `data` 배치에서 마지막 체결만 사용합니다. 빈 문자열
/// 필드는 `None`으로 정규화됩니다.
fn parse_execution_message(text: &str) -> Option<TradeRecord> {
    let message: ExecutionMessage = serde_json::from_str(text).ok()?;
    if !message.topic.starts_with("execution") {
        return None;
    }

    let fill = message.data.into_iter().last()?;
    Some(TradeRecord {
        symbol: fill.symbol,
        order_id: none_if_empty(fill.order_id),
        side: Side::parse_wire(&fill.side),
        order_type: OrderType::parse_wire(&fill.order_type),
        position_size: parse_opt_decimal(&fill.exec_qty),
        price: parse_opt_decimal(&fill.exec_price),
    })
}

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
