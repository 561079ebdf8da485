//! 포지션 도메인 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래소가 보고한 포지션 스냅샷.
///
/// 에이전트는 이 스냅샷을 보관하지 않습니다. 모든 판단은 거래소에서
/// 새로 조회한 현재 상태를 기준으로 합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// 심볼
    pub symbol: String,
    /// 포지션 수량 (0이면 무포지션)
    pub size: Decimal,
    /// 평균 진입가
    pub avg_price: Decimal,
    /// 미실현 손익
    pub unrealised_pnl: Decimal,
    /// 레버리지 배율
    pub leverage: Decimal,
    /// 포지션 명목 가치
    pub position_value: Decimal,
}

impl Position {
    /// 무포지션 여부.
    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(size: Decimal) -> Position {
        Position {
            symbol: "BTCUSDT".to_string(),
            size,
            avg_price: dec!(50000),
            unrealised_pnl: dec!(-40),
            leverage: dec!(10),
            position_value: dec!(5000),
        }
    }

    #[test]
    fn test_is_flat() {
        assert!(sample(dec!(0)).is_flat());
        assert!(!sample(dec!(0.5)).is_flat());
    }
}
