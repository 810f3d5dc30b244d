//! # Database Module
//!
//! PostgreSQL persistence for accounts, bankrolls and bets through `sqlx`.
//! The tables belong to the REST layer; `init_database_schema` creates them
//! when missing so the bot can run against a fresh database.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::models::{Bet, ChatIdentity, NewBet, SettlementStatus};
use crate::storage_traits::{AccountStore, BetStore};

const BET_COLUMNS: &str = "a.id, a.banca_id, a.esporte, a.evento, a.torneio, a.pais, a.mercado, \
     a.tipo_aposta, a.valor_apostado, a.odd, a.bonus, a.data_evento, a.tipster, a.status, \
     a.casa_de_aposta, a.retorno_obtido, a.aposta, a.created_at, a.updated_at";

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<(), StoreError> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS usuarios (
            id TEXT PRIMARY KEY,
            nome TEXT NOT NULL DEFAULT '',
            telegram_user_id BIGINT UNIQUE,
            telegram_username TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bancas (
            id BIGSERIAL PRIMARY KEY,
            usuario_id TEXT NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            nome TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS apostas (
            id BIGSERIAL PRIMARY KEY,
            banca_id BIGINT NOT NULL REFERENCES bancas(id) ON DELETE CASCADE,
            esporte TEXT NOT NULL DEFAULT '',
            evento TEXT NOT NULL DEFAULT '',
            torneio TEXT NOT NULL DEFAULT '',
            pais TEXT NOT NULL DEFAULT 'Mundo',
            mercado TEXT NOT NULL DEFAULT '',
            tipo_aposta TEXT NOT NULL DEFAULT 'Simples',
            valor_apostado DOUBLE PRECISION NOT NULL DEFAULT 0,
            odd DOUBLE PRECISION NOT NULL DEFAULT 0,
            bonus DOUBLE PRECISION NOT NULL DEFAULT 0,
            data_evento TIMESTAMP NOT NULL,
            tipster TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'Pendente',
            casa_de_aposta TEXT NOT NULL DEFAULT '',
            retorno_obtido DOUBLE PRECISION,
            aposta TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS apostas_banca_idx ON apostas (banca_id)")
        .execute(pool)
        .await?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Create an account row (normally done by the REST layer)
pub async fn create_account(pool: &PgPool, account_id: &str, name: &str) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO usuarios (id, nome) VALUES ($1, $2)")
        .bind(account_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Create a bankroll for an account (normally done by the REST layer)
pub async fn create_bankroll(pool: &PgPool, account_id: &str, name: &str) -> Result<i64, StoreError> {
    let row = sqlx::query("INSERT INTO bancas (usuario_id, nome) VALUES ($1, $2) RETURNING id")
        .bind(account_id)
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get::<i64, _>("id")?)
}

fn bet_from_row(row: &PgRow) -> Result<Bet, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Bet {
        id: row.try_get("id")?,
        bankroll_id: row.try_get("banca_id")?,
        sport: row.try_get("esporte")?,
        event: row.try_get("evento")?,
        tournament: row.try_get("torneio")?,
        country: row.try_get("pais")?,
        market: row.try_get("mercado")?,
        bet_type: row.try_get("tipo_aposta")?,
        stake: row.try_get("valor_apostado")?,
        odds: row.try_get("odd")?,
        bonus: row.try_get("bonus")?,
        event_date: row.try_get("data_evento")?,
        tipster: row.try_get("tipster")?,
        status: SettlementStatus::from_label(&status).unwrap_or_default(),
        bookmaker: row.try_get("casa_de_aposta")?,
        obtained_return: row.try_get("retorno_obtido")?,
        selections: row.try_get("aposta")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn identity_from_row(row: &PgRow) -> Result<ChatIdentity, sqlx::Error> {
    Ok(ChatIdentity {
        chat_user_id: row.try_get("telegram_user_id")?,
        account_id: row.try_get("id")?,
        username: row.try_get("telegram_username")?,
    })
}

fn map_unique(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}

/// Postgres-backed implementation of the storage traits
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn account_exists(&self, account_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS present FROM usuarios WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn identity_by_chat_user(
        &self,
        chat_user_id: i64,
    ) -> Result<Option<ChatIdentity>, StoreError> {
        let row = sqlx::query(
            "SELECT id, telegram_user_id, telegram_username FROM usuarios WHERE telegram_user_id = $1",
        )
        .bind(chat_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(identity_from_row).transpose()?)
    }

    async fn identity_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<ChatIdentity>, StoreError> {
        let row = sqlx::query(
            "SELECT id, telegram_user_id, telegram_username FROM usuarios \
             WHERE id = $1 AND telegram_user_id IS NOT NULL",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(identity_from_row).transpose()?)
    }

    async fn bind_identity(&self, identity: &ChatIdentity) -> Result<(), StoreError> {
        debug!(account_id = %identity.account_id, chat_user_id = identity.chat_user_id, "Binding chat identity");
        let result = sqlx::query(
            "UPDATE usuarios SET telegram_user_id = $2, telegram_username = $3 \
             WHERE id = $1 AND (telegram_user_id IS NULL OR telegram_user_id = $2)",
        )
        .bind(&identity.account_id)
        .bind(identity.chat_user_id)
        .bind(&identity.username)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;

        if result.rows_affected() == 0 {
            if self.account_exists(&identity.account_id).await? {
                return Err(StoreError::AccountTaken(identity.account_id.clone()));
            }
            return Err(StoreError::Other(format!(
                "account {} disappeared while linking",
                identity.account_id
            )));
        }
        Ok(())
    }

    async fn unbind_chat_user(&self, chat_user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE usuarios SET telegram_user_id = NULL, telegram_username = NULL \
             WHERE telegram_user_id = $1",
        )
        .bind(chat_user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn default_bankroll(&self, account_id: &str) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query(
            "SELECT id FROM bancas WHERE usuario_id = $1 ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.try_get::<i64, _>("id")).transpose()?)
    }
}

#[async_trait]
impl BetStore for PgStore {
    async fn insert_bet(&self, bet: &NewBet) -> Result<Bet, StoreError> {
        let query = format!(
            "WITH a AS (
                INSERT INTO apostas (banca_id, esporte, evento, torneio, pais, mercado, tipo_aposta,
                    valor_apostado, odd, bonus, data_evento, tipster, status, casa_de_aposta,
                    retorno_obtido, aposta)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                RETURNING *
            ) SELECT {BET_COLUMNS} FROM a"
        );
        let row = sqlx::query(&query)
            .bind(bet.bankroll_id)
            .bind(&bet.sport)
            .bind(&bet.event)
            .bind(&bet.tournament)
            .bind(&bet.country)
            .bind(&bet.market)
            .bind(&bet.bet_type)
            .bind(bet.stake)
            .bind(bet.odds)
            .bind(bet.bonus)
            .bind(bet.event_date)
            .bind(&bet.tipster)
            .bind(bet.status.as_str())
            .bind(&bet.bookmaker)
            .bind(bet.obtained_return)
            .bind(&bet.selections)
            .fetch_one(&self.pool)
            .await?;

        let created = bet_from_row(&row)?;
        info!(bet_id = created.id, bankroll_id = created.bankroll_id, "Bet persisted");
        Ok(created)
    }

    async fn find_bet_with_owner(&self, bet_id: i64) -> Result<Option<(Bet, String)>, StoreError> {
        let query = format!(
            "SELECT {BET_COLUMNS}, b.usuario_id FROM apostas a \
             JOIN bancas b ON b.id = a.banca_id WHERE a.id = $1"
        );
        let row = sqlx::query(&query)
            .bind(bet_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let owner: String = row.try_get("usuario_id")?;
                Ok(Some((bet_from_row(&row)?, owner)))
            }
            None => Ok(None),
        }
    }

    async fn update_bet_status(
        &self,
        bet_id: i64,
        status: SettlementStatus,
        obtained_return: Option<f64>,
    ) -> Result<Option<Bet>, StoreError> {
        let query = format!(
            "WITH a AS (
                UPDATE apostas SET status = $2, retorno_obtido = $3, updated_at = NOW()
                WHERE id = $1 RETURNING *
            ) SELECT {BET_COLUMNS} FROM a"
        );
        let row = sqlx::query(&query)
            .bind(bet_id)
            .bind(status.as_str())
            .bind(obtained_return)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(bet_from_row).transpose()?)
    }

    async fn delete_bet(&self, bet_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM apostas WHERE id = $1")
            .bind(bet_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
