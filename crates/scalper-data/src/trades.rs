//! 체결 기록 repository.

use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scalper_core::TradeRecord;
use sqlx::FromRow;
use tracing::{debug, instrument};
use uuid::Uuid;

/// 체결 기록 데이터베이스 레코드.
///
/// `token` 컬럼이 심볼을 담습니다.
#[derive(Debug, Clone, FromRow)]
pub struct TradeRow {
    pub id: Uuid,
    pub token: String,
    pub order_id: Option<String>,
    pub position_size: Option<Decimal>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub price: Option<Decimal>,
    pub date_created: DateTime<Utc>,
}

/// 체결 기록 repository.
pub struct TradeRepository {
    db: Database,
}

impl TradeRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 체결 기록을 삽입하고 생성된 ID를 반환합니다.
    ///
    /// `date_created`는 데이터베이스가 채우며, 삽입 시 AFTER INSERT
    /// 트리거가 `new_trade_channel`로 알림을 보냅니다.
    #[instrument(skip(self, record), fields(symbol = %record.symbol))]
    pub async fn insert(&self, record: &TradeRecord) -> Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO trade_data (id, token, order_id, position_size, side, order_type, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&record.symbol)
        .bind(&record.order_id)
        .bind(record.position_size)
        .bind(record.side.map(|s| s.to_string()))
        .bind(record.order_type.map(|t| t.to_string()))
        .bind(record.price)
        .execute(self.db.pool())
        .await?;

        debug!(id = %id, "체결 기록 저장");
        Ok(id)
    }

    /// 최근 체결 기록을 조회합니다.
    pub async fn get_recent(&self, limit: i32) -> Result<Vec<TradeRow>> {
        sqlx::query_as("SELECT * FROM trade_data ORDER BY date_created DESC LIMIT $1")
            .bind(limit)
            .fetch_all(self.db.pool())
            .await
            .map_err(Into::into)
    }

    /// 심볼의 최근 체결 기록을 조회합니다.
    pub async fn get_by_symbol(&self, symbol: &str, limit: i32) -> Result<Vec<TradeRow>> {
        sqlx::query_as(
            "SELECT * FROM trade_data WHERE token = $1 ORDER BY date_created DESC LIMIT $2",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await
        .map_err(Into::into)
    }
}
