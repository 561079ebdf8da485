//! 주문 도메인 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 주문 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// 거래소 API 문자열을 파싱합니다. 알 수 없거나 빈 값은 `None`입니다.
    pub fn parse_wire(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(Side::Buy),
            "Sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// 지정가
    Limit,
    /// 시장가
    Market,
}

impl OrderType {
    /// 거래소 API 문자열을 파싱합니다. 알 수 없거나 빈 값은 `None`입니다.
    pub fn parse_wire(s: &str) -> Option<Self> {
        match s {
            "Limit" => Some(OrderType::Limit),
            "Market" => Some(OrderType::Market),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "Limit"),
            OrderType::Market => write!(f, "Market"),
        }
    }
}

/// 거래소에 제출된 주문.
///
/// 종결 상태(체결/취소)는 주문 자체가 아니라 포지션 폴링으로 간접 관찰됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 거래소 주문 ID
    pub id: String,
    /// 심볼 (예: BTCUSDT)
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 수량
    pub qty: Decimal,
    /// 지정가 (시장가 주문은 None)
    pub price: Option<Decimal>,
}

/// 주문 생성/정정/취소 응답.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    /// 거래소 주문 ID
    pub order_id: String,
}
