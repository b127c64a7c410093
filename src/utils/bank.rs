use crate::models::types::MAX_BALANCE;
use thiserror::Error;
use tokio_rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Error)]
pub enum BankError {
    #[error("Database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("Insufficient funds")]
    InsufficientFunds,
}

/// 存款結果；超過上限時把餘額夾在上限，不當成失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deposit {
    Credited { new_balance: u64 },
    Clamped { max_balance: u64 },
}

/// 伺服器域的虛擬貨幣帳本，存放在 SQLite
#[derive(Clone)]
pub struct Bank {
    conn: Connection,
}

impl Bank {
    pub async fn open(path: &str) -> Result<Self, BankError> {
        let conn = Connection::open(path).await?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, BankError> {
        let conn = Connection::open_in_memory().await?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<(), BankError> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS balances (
                    guild_id INTEGER NOT NULL,
                    user_id INTEGER NOT NULL,
                    balance INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (guild_id, user_id)
                )",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub async fn balance(&self, guild_id: u64, user_id: u64) -> Result<u64, BankError> {
        let amount = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT balance FROM balances WHERE guild_id = ?1 AND user_id = ?2",
                        params![guild_id as i64, user_id as i64],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                Ok(row.unwrap_or(0))
            })
            .await?;
        Ok(amount.max(0) as u64)
    }

    pub async fn can_spend(
        &self,
        guild_id: u64,
        user_id: u64,
        amount: u64,
    ) -> Result<bool, BankError> {
        Ok(self.balance(guild_id, user_id).await? >= amount)
    }

    /// 扣款；餘額不足時回傳 `InsufficientFunds`，不做部分扣款
    pub async fn withdraw(
        &self,
        guild_id: u64,
        user_id: u64,
        amount: u64,
    ) -> Result<(), BankError> {
        let ok = self
            .conn
            .call(move |conn| {
                let current = conn
                    .query_row(
                        "SELECT balance FROM balances WHERE guild_id = ?1 AND user_id = ?2",
                        params![guild_id as i64, user_id as i64],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?
                    .unwrap_or(0);
                if (current.max(0) as u64) < amount {
                    return Ok(false);
                }
                conn.execute(
                    "UPDATE balances SET balance = balance - ?3
                     WHERE guild_id = ?1 AND user_id = ?2",
                    params![guild_id as i64, user_id as i64, amount as i64],
                )?;
                Ok(true)
            })
            .await?;

        if ok { Ok(()) } else { Err(BankError::InsufficientFunds) }
    }

    /// 入帳；會把超出 `MAX_BALANCE` 的部分夾掉
    pub async fn deposit(
        &self,
        guild_id: u64,
        user_id: u64,
        amount: u64,
    ) -> Result<Deposit, BankError> {
        let outcome = self
            .conn
            .call(move |conn| {
                let current = conn
                    .query_row(
                        "SELECT balance FROM balances WHERE guild_id = ?1 AND user_id = ?2",
                        params![guild_id as i64, user_id as i64],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?
                    .unwrap_or(0)
                    .max(0) as u64;

                let raw = current.saturating_add(amount);
                let clamped = raw > MAX_BALANCE;
                let new_balance = raw.min(MAX_BALANCE);

                conn.execute(
                    "INSERT INTO balances (guild_id, user_id, balance) VALUES (?1, ?2, ?3)
                     ON CONFLICT (guild_id, user_id) DO UPDATE SET balance = ?3",
                    params![guild_id as i64, user_id as i64, new_balance as i64],
                )?;

                Ok(if clamped {
                    Deposit::Clamped {
                        max_balance: MAX_BALANCE,
                    }
                } else {
                    Deposit::Credited { new_balance }
                })
            })
            .await?;
        Ok(outcome)
    }

    pub async fn set_balance(
        &self,
        guild_id: u64,
        user_id: u64,
        amount: u64,
    ) -> Result<(), BankError> {
        let amount = amount.min(MAX_BALANCE);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO balances (guild_id, user_id, balance) VALUES (?1, ?2, ?3)
                     ON CONFLICT (guild_id, user_id) DO UPDATE SET balance = ?3",
                    params![guild_id as i64, user_id as i64, amount as i64],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// 硬核模式死亡用：餘額歸零
    pub async fn wipe(&self, guild_id: u64, user_id: u64) -> Result<(), BankError> {
        self.set_balance(guild_id, user_id, 0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deposit_and_withdraw() {
        let bank = Bank::in_memory().await.unwrap();
        bank.deposit(1, 10, 500).await.unwrap();
        assert_eq!(bank.balance(1, 10).await.unwrap(), 500);
        assert!(bank.can_spend(1, 10, 500).await.unwrap());
        assert!(!bank.can_spend(1, 10, 501).await.unwrap());

        bank.withdraw(1, 10, 200).await.unwrap();
        assert_eq!(bank.balance(1, 10).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_leaves_balance_untouched() {
        let bank = Bank::in_memory().await.unwrap();
        bank.deposit(1, 10, 100).await.unwrap();
        let err = bank.withdraw(1, 10, 101).await.unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds));
        assert_eq!(bank.balance(1, 10).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_deposit_clamps_at_ceiling() {
        let bank = Bank::in_memory().await.unwrap();
        bank.set_balance(1, 10, MAX_BALANCE - 5).await.unwrap();

        let outcome = bank.deposit(1, 10, 100).await.unwrap();
        assert_eq!(
            outcome,
            Deposit::Clamped {
                max_balance: MAX_BALANCE
            }
        );
        assert_eq!(bank.balance(1, 10).await.unwrap(), MAX_BALANCE);
    }

    #[tokio::test]
    async fn test_guilds_are_isolated() {
        let bank = Bank::in_memory().await.unwrap();
        bank.deposit(1, 10, 100).await.unwrap();
        assert_eq!(bank.balance(2, 10).await.unwrap(), 0);
    }
}
