//! 공개 호가창 스트림.

use super::{next_backoff, PingFrame, SubscribeFrame, INITIAL_BACKOFF, PING_INTERVAL};
use crate::error::{ExchangeError, ExchangeResult};
use futures::{SinkExt, StreamExt};
use scalper_core::{BookLevel, BookTop};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{info, warn};

/// 심볼 하나의 레벨 1 호가창을 구독해 최신 호가를 단일 슬롯 채널로
/// 발행하는 스트림.
///
/// 수신측은 항상 가장 최근에 발행된 호가만 봅니다. 느린 소비자가 있어도
/// 오래된 틱이 쌓이지 않습니다.
pub struct OrderBookStream {
    url: String,
    symbol: String,
    tx: watch::Sender<BookTop>,
}

impl OrderBookStream {
    /// 스트림과 수신 핸들을 생성합니다.
    pub fn new(url: impl Into<String>, symbol: impl Into<String>) -> (Self, watch::Receiver<BookTop>) {
        let (tx, rx) = watch::channel(BookTop::default());
        (
            Self {
                url: url.into(),
                symbol: symbol.into(),
                tx,
            },
            rx,
        )
    }

    /// 재연결 루프를 실행합니다. 수신측이 모두 사라지면 종료합니다.
    pub async fn run(self) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.run_session(&mut backoff).await {
                Ok(()) => {
                    info!(symbol = %self.symbol, "호가창 스트림 종료");
                    return;
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, retry_in = ?backoff, "호가창 스트림 끊김, 재연결");
                }
            }

            if self.tx.is_closed() {
                return;
            }

            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    }

    /// 한 세션을 실행합니다: 연결, 구독, 수신 루프.
    async fn run_session(&self, backoff: &mut Duration) -> ExchangeResult<()> {
        let (ws_stream, _) = connect_async(&self.url).await?;
        let (mut write, mut read) = ws_stream.split();

        let topic = format!("orderbook.1.{}", self.symbol);
        let subscribe = serde_json::to_string(&SubscribeFrame::new(vec![topic]))?;
        write.send(Message::Text(subscribe.into())).await?;
        info!(symbol = %self.symbol, "호가창 구독");

        // 연결 성공, 백오프 초기화
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
                            if let Some(top) = parse_book_message(&text) {
                                if self.tx.send(top).is_err() {
                                    // 수신측이 사라졌다
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

#[derive(Debug, Deserialize)]
struct BookMessage {
    topic: String,
    data: BookData,
}

#[derive(Debug, Deserialize)]
struct BookData {
    #[serde(rename = "b", default)]
    bids: Vec<[String; 2]>,
    #[serde(rename = "a", default)]
    asks: Vec<[String; 2]>,
}

/// 호가창 메시지를 최우선 호가로 변환합니다.
///
/// 호가창 외의 메시지(구독 응답, pong)는 `None`입니다. 한쪽 배열이 빈
/// 메시지는 해당 방향이 `None`인 호가가 됩니다.
fn parse_book_message(text: &str) -> Option<BookTop> {
    let message: BookMessage = serde_json::from_str(text).ok()?;
    if !message.topic.starts_with("orderbook.") {
        return None;
    }

    Some(BookTop {
        bid: parse_level(message.data.bids.first()),
        ask: parse_level(message.data.asks.first()),
    })
}

fn parse_level(level: Option<&[String; 2]>) -> Option<BookLevel> {
    let [price, size] = level?;
    Some(BookLevel {
        price: price.parse().ok()?,
        size: size.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_snapshot_message() {
        let text = r#"{"topic":"orderbook.1.BTCUSDT","type":"snapshot",
            "data":{"s":"BTCUSDT","b":[["99.5","3"]],"a":[["100","5"]],"u":1,"seq":1}}"#;

        let top = parse_book_message(text).unwrap();
        assert_eq!(
            top.bid,
            Some(BookLevel {
                price: dec!(99.5),
                size: dec!(3)
            })
        );
        assert_eq!(
            top.ask,
            Some(BookLevel {
                price: dec!(100),
                size: dec!(5)
            })
        );
    }

    #[test]
    fn test_parse_delta_with_empty_side() {
        // 델타 메시지는 변경 없는 방향을 빈 배열로 보낸다
        let text = r#"{"topic":"orderbook.1.BTCUSDT","type":"delta",
            "data":{"s":"BTCUSDT","b":[["99.6","2"]],"a":[],"u":2,"seq":2}}"#;

        let top = parse_book_message(text).unwrap();
        assert_eq!(top.bid.map(|l| l.price), Some(dec!(99.6)));
        assert_eq!(top.ask, None);
    }

    #[test]
    fn test_ignores_non_book_messages() {
        let ack = r#"{"success":true,"ret_msg":"subscribe","op":"subscribe","conn_id":"abc"}"#;
        assert!(parse_book_message(ack).is_none());

        let pong = r#"{"success":true,"ret_msg":"pong","op":"ping"}"#;
        assert!(parse_book_message(pong).is_none());

        let other_topic = r#"{"topic":"tickers.BTCUSDT","data":{"b":[],"a":[]}}"#;
        assert!(parse_book_message(other_topic).is_none());
    }
}
