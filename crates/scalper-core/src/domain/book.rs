//! 레벨 1 호가창 도메인 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 호가창 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    /// 최우선 매수 호가
    Bid,
    /// 최우선 매도 호가
    Ask,
}

/// 호가 한 단계 (가격, 수량).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// 최신 피드 메시지에서 파생된 최우선 호가.
///
/// 원본 메시지의 빈 가격 배열은 `None`으로 매핑됩니다.
/// 새 메시지가 도착할 때마다 이전 값은 대체됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BookTop {
    /// 최우선 매수 호가
    pub bid: Option<BookLevel>,
    /// 최우선 매도 호가
    pub ask: Option<BookLevel>,
}

impl BookTop {
    /// 요청한 방향의 최우선 호가를 반환합니다.
    pub fn level(&self, side: BookSide) -> Option<BookLevel> {
        match side {
            BookSide::Bid => self.bid,
            BookSide::Ask => self.ask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_level_selection() {
        let top = BookTop {
            bid: Some(BookLevel {
                price: dec!(99.5),
                size: dec!(3),
            }),
            ask: None,
        };

        assert_eq!(
            top.level(BookSide::Bid).map(|l| l.price),
            Some(dec!(99.5))
        );
        assert_eq!(top.level(BookSide::Ask), None);
    }

    #[test]
    fn test_default_is_empty() {
        let top = BookTop::default();
        assert_eq!(top.level(BookSide::Bid), None);
        assert_eq!(top.level(BookSide::Ask), None);
    }
}
