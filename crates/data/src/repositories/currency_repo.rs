//! Internal currency balances and their audit trail.

use async_trait::async_trait;
use lingo_xp_core::{InternalCurrencyRepository, ProgressionError};
use rust_decimal::Decimal;
use tracing::debug;

use crate::database::PgTx;

/// Repository for internal currency accrual.
///
/// The balance row is the only row locked explicitly (`FOR UPDATE`), which
/// serialises concurrent accruals for the same user.
#[derive(Debug, Clone, Default)]
pub struct PgInternalCurrencyRepository;

impl PgInternalCurrencyRepository {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InternalCurrencyRepository<PgTx> for PgInternalCurrencyRepository {
    async fn add_balance(
        &self,
        tx: &mut PgTx,
        event_type_id: i32,
        telegram_id: i64,
        amount: Decimal,
        description: &str,
    ) -> Result<Decimal, ProgressionError> {
        if amount <= Decimal::ZERO {
            return Err(ProgressionError::NonPositiveAmount(amount));
        }

        sqlx::query(
            r"
            INSERT INTO internal_currency_balances (telegram_id, balance)
            VALUES ($1, 0)
            ON CONFLICT (telegram_id) DO NOTHING
            ",
        )
        .bind(telegram_id)
        .execute(&mut **tx)
        .await?;

        let current: Decimal = sqlx::query_scalar(
            "SELECT balance FROM internal_currency_balances WHERE telegram_id = $1 FOR UPDATE",
        )
        .bind(telegram_id)
        .fetch_one(&mut **tx)
        .await?;

        let balance = current + amount;
        if balance < Decimal::ZERO {
            return Err(ProgressionError::NegativeBalance {
                telegram_id,
                balance,
            });
        }

        sqlx::query(
            r"
            INSERT INTO internal_currency_transactions
                (telegram_id, event_type_id, amount, balance_after, description)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(telegram_id)
        .bind(event_type_id)
        .bind(amount)
        .bind(balance)
        .bind(description)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r"
            UPDATE internal_currency_balances
            SET balance = $2, updated_at = now()
            WHERE telegram_id = $1
            ",
        )
        .bind(telegram_id)
        .bind(balance)
        .execute(&mut **tx)
        .await?;

        debug!(telegram_id, %amount, %balance, "Accrued internal currency");
        Ok(balance)
    }
}
