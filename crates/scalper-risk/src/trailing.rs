//! 손익 체크포인트 기반 트레일링 스톱 래칫.
//!
//! 손익률이 상승 체크포인트를 넘을 때마다 누적 스톱 퍼센트를 올리고
//! 체크포인트를 전진시킵니다. 스톱 퍼센트는 내려가지 않습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 래칫 동작 파라미터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatchetParams {
    /// 미세 트랙 시작 체크포인트 (%)
    pub fine_start: Decimal,
    /// 미세 트랙 통과 시 스톱 퍼센트 증가폭
    pub fine_increment: Decimal,
    /// 굵은 트랙 시작 체크포인트 (%)
    pub coarse_start: Decimal,
    /// 굵은 트랙 통과 시 스톱 퍼센트 증가폭
    pub coarse_increment: Decimal,
    /// 체크포인트 통과 시 임계값 증가폭
    pub checkpoint_step: Decimal,
}

impl Default for RatchetParams {
    fn default() -> Self {
        Self {
            fine_start: dec!(0.5),
            fine_increment: dec!(0.0001),
            coarse_start: dec!(1.0),
            coarse_increment: dec!(0.0004),
            checkpoint_step: dec!(1.0),
        }
    }
}

/// 포지션 한 사이클 동안의 트레일링 스톱 래칫 상태.
///
/// 두 체크포인트 트랙이 하나의 누적 스톱 퍼센트를 공유합니다.
/// 미세 트랙은 0.5%에서 시작해 통과할 때마다 0.0001씩,
/// 굵은 트랙은 1.0%에서 시작해 통과할 때마다 0.0004씩 올립니다.
/// 같은 틱에 두 트랙이 모두 발동할 수 있습니다.
#[derive(Debug, Clone)]
pub struct StopRatchet {
    params: RatchetParams,
    stop_percent: Decimal,
    fine_checkpoint: Decimal,
    coarse_checkpoint: Decimal,
}

impl StopRatchet {
    /// 주어진 파라미터로 새 래칫을 생성합니다.
    pub fn new(params: RatchetParams) -> Self {
        let fine_checkpoint = params.fine_start;
        let coarse_checkpoint = params.coarse_start;

        Self {
            params,
            stop_percent: Decimal::ZERO,
            fine_checkpoint,
            coarse_checkpoint,
        }
    }

    /// 현재 누적 스톱 퍼센트.
    pub fn stop_percent(&self) -> Decimal {
        self.stop_percent
    }

    /// 손익률로 래칫을 전진시킵니다.
    ///
    /// 발동한 순서대로, 적용해야 할 스톱 퍼센트 값 목록을 반환합니다.
    /// 한 틱에 각 트랙은 최대 한 번 발동하며, 미세 트랙이 먼저입니다.
    pub fn advance(&mut self, pnl_percent: Decimal) -> Vec<Decimal> {
        let mut updates = Vec::new();

        if pnl_percent >= self.fine_checkpoint {
            self.stop_percent += self.params.fine_increment;
            self.fine_checkpoint += self.params.checkpoint_step;
            updates.push(self.stop_percent);
        }

        if pnl_percent >= self.coarse_checkpoint {
            self.stop_percent += self.params.coarse_increment;
            self.coarse_checkpoint += self.params.checkpoint_step;
            updates.push(self.stop_percent);
        }

        if !updates.is_empty() {
            tracing::debug!(
                pnl = %pnl_percent,
                stop_percent = %self.stop_percent,
                fine_checkpoint = %self.fine_checkpoint,
                coarse_checkpoint = %self.coarse_checkpoint,
                "트레일링 스톱 래칫 전진"
            );
        }

        updates
    }

    /// 새 포지션 사이클 시작 시 모든 카운터를 초기화합니다.
    pub fn reset(&mut self) {
        self.stop_percent = Decimal::ZERO;
        self.fine_checkpoint = self.params.fine_start;
        self.coarse_checkpoint = self.params.coarse_start;
    }
}

impl Default for StopRatchet {
    fn default() -> Self {
        Self::new(RatchetParams::default())
    }
}
