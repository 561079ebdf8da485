//! 체결 기록 도메인 타입.

use crate::domain::{OrderType, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 프라이빗 체결 스트림에서 평탄화된 체결 이벤트.
///
/// 거래소가 빈 문자열로 보내는 필드는 역직렬화 단계에서 `None`으로
/// 정규화된 뒤 이 타입으로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// 심볼
    pub symbol: String,
    /// 거래소 주문 ID
    pub order_id: Option<String>,
    /// 체결 방향
    pub side: Option<Side>,
    /// 주문 유형
    pub order_type: Option<OrderType>,
    /// 체결 수량
    pub position_size: Option<Decimal>,
    /// 체결 가격
    pub price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_serde_roundtrip() {
        let record = TradeRecord {
            symbol: "BTCUSDT".to_string(),
            order_id: Some("abc-123".to_string()),
            side: Some(Side::Buy),
            order_type: Some(OrderType::Limit),
            position_size: Some(dec!(1)),
            price: Some(dec!(50000.5)),
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_missing_fields_stay_none() {
        let record = TradeRecord {
            symbol: "ETHUSDT".to_string(),
            order_id: None,
            side: None,
            order_type: None,
            position_size: None,
            price: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.order_id, None);
        assert_eq!(parsed.price, None);
    }
}
