//! 최우선 호가 샘플러.

use scalper_core::{BookLevel, BookSide, BookTop};
use std::time::Duration;
use tokio::sync::watch;

/// 단일 슬롯 버퍼에서 최신 최우선 호가를 샘플링합니다.
///
/// 요청한 방향의 호가가 아직 없으면(메시지가 오지 않았거나 최신 메시지의
/// 해당 배열이 비어 있으면) 폴링 간격만큼 대기한 뒤 최신 슬롯을 다시
/// 읽습니다. 호가가 나타날 때까지 반복하며 실패하지 않습니다.
#[derive(Debug, Clone)]
pub struct BookSampler {
    rx: watch::Receiver<BookTop>,
    delay: Duration,
}

impl BookSampler {
    /// 새 샘플러를 생성합니다.
    pub fn new(rx: watch::Receiver<BookTop>, delay: Duration) -> Self {
        Self { rx, delay }
    }

    /// 요청한 방향의 최우선 호가가 나타날 때까지 대기한 뒤 반환합니다.
    pub async fn best(&self, side: BookSide) -> BookLevel {
        loop {
            if let Some(level) = self.rx.borrow().level(side) {
                return level;
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: &str, size: &str) -> BookLevel {
        BookLevel {
            price: price.parse().unwrap(),
            size: size.parse().unwrap(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_available_level_immediately() {
        let (tx, rx) = watch::channel(BookTop::default());
        tx.send(BookTop {
            bid: Some(level("99.5", "3")),
            ask: Some(level("100", "5")),
        })
        .unwrap();

        let sampler = BookSampler::new(rx, Duration::from_millis(420));
        let best_ask = sampler.best(BookSide::Ask).await;

        assert_eq!(best_ask.price, dec!(100));
        assert_eq!(best_ask.size, dec!(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_past_empty_sides() {
        let (tx, rx) = watch::channel(BookTop::default());
        let sampler = BookSampler::new(rx, Duration::from_millis(420));

        // 빈 메시지와 유효한 메시지가 번갈아 도착하는 상황
        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(BookTop {
                bid: Some(level("99", "1")),
                ask: None,
            })
            .unwrap();

            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(BookTop {
                bid: Some(level("99", "1")),
                ask: Some(level("101", "2")),
            })
            .unwrap();
        });

        // 매도 호가는 두 번째 유효 메시지에서야 나타난다
        let best_ask = sampler.best(BookSide::Ask).await;
        assert_eq!(best_ask.price, dec!(101));

        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_sees_latest_slot() {
        let (tx, rx) = watch::channel(BookTop::default());
        let sampler = BookSampler::new(rx, Duration::from_millis(420));

        // 이전 틱은 최신 틱으로 덮어써진다
        tx.send(BookTop {
            bid: None,
            ask: Some(level("100", "5")),
        })
        .unwrap();
        tx.send(BookTop {
            bid: None,
            ask: Some(level("100.5", "4")),
        })
        .unwrap();

        let best_ask = sampler.best(BookSide::Ask).await;
        assert_eq!(best_ask.price, dec!(100.5));
    }
}
