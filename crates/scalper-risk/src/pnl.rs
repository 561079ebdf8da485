//! 손익률 및 트레일링 스톱 가격 계산.
//!
//! 모든 함수는 순수 함수이며, 같은 입력에 대해 항상 같은 결과를 반환합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scalper_core::Position;

/// 레버리지를 반영한 미실현 손익률(%)을 계산합니다.
///
/// `(미실현 손익 / 포지션 가치) * 100 * 레버리지`
///
/// 포지션이 없거나(수량 0) 포지션 가치가 0이면 손익률이 정의되지 않으므로
/// `None`을 반환합니다.
pub fn pnl_percent(position: &Position) -> Option<Decimal> {
    if position.size.is_zero() || position.position_value.is_zero() {
        return None;
    }

    Some(position.unrealised_pnl / position.position_value * dec!(100) * position.leverage)
}

/// 평균 진입가와 누적 스톱 퍼센트로 트레일링 스톱 가격을 계산합니다.
///
/// `평균 진입가 * (1 + stop_percent)`
pub fn trailing_stop_price(avg_price: Decimal, stop_percent: Decimal) -> Decimal {
    avg_price * (Decimal::ONE + stop_percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(size: Decimal, unrealised_pnl: Decimal, value: Decimal, leverage: Decimal) -> Position {
        Position {
            symbol: "BTCUSDT".to_string(),
            size,
            avg_price: dec!(5000),
            unrealised_pnl,
            leverage,
            position_value: value,
        }
    }

    #[test]
    fn test_pnl_percent_with_leverage() {
        let pos = position(dec!(1), dec!(-40), dec!(5000), dec!(10));
        assert_eq!(pnl_percent(&pos), Some(dec!(-8.0)));
    }

    #[test]
    fn test_pnl_percent_positive() {
        let pos = position(dec!(2), dec!(25), dec!(5000), dec!(10));
        assert_eq!(pnl_percent(&pos), Some(dec!(5.0)));
    }

    #[test]
    fn test_pnl_percent_flat_position() {
        let pos = position(Decimal::ZERO, dec!(-40), dec!(5000), dec!(10));
        assert_eq!(pnl_percent(&pos), None);
    }

    #[test]
    fn test_pnl_percent_zero_position_value() {
        let pos = position(dec!(1), dec!(-40), Decimal::ZERO, dec!(10));
        assert_eq!(pnl_percent(&pos), None);
    }

    #[test]
    fn test_trailing_stop_price() {
        assert_eq!(trailing_stop_price(dec!(5000), dec!(0.0001)), dec!(5000.5));
        assert_eq!(trailing_stop_price(dec!(5000), dec!(0.0005)), dec!(5002.5));
        assert_eq!(trailing_stop_price(dec!(100), Decimal::ZERO), dec!(100));
    }
}
