//! # Bet Lifecycle Manager
//!
//! Persists bets created from tickets, recomputes settlement returns on
//! status changes and enforces ownership on every read or write.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::errors::BetError;
use crate::models::{settlement_return, Bet, NewBet, SettlementStatus, WageringTicketDraft};
use crate::storage_traits::BetStore;
use crate::ticket::normalize::parse_iso_datetime;

#[derive(Clone)]
pub struct BetLifecycle {
    store: Arc<dyn BetStore>,
}

impl BetLifecycle {
    pub fn new(store: Arc<dyn BetStore>) -> Self {
        Self { store }
    }

    /// Persist a bet built from a normalized draft
    ///
    /// A draft without a usable event date is stamped with the current time.
    pub async fn create(
        &self,
        draft: &WageringTicketDraft,
        bankroll_id: i64,
    ) -> Result<Bet, BetError> {
        let event_date = parse_iso_datetime(&draft.event_date).unwrap_or_else(|| {
            debug!("Ticket has no event date, defaulting to now");
            Utc::now().naive_utc()
        });

        let new_bet = NewBet {
            bankroll_id,
            sport: draft.sport.clone(),
            event: draft.event.clone(),
            tournament: draft.tournament.clone(),
            country: draft.country.clone(),
            market: draft.market.clone(),
            bet_type: draft.bet_type.clone(),
            stake: draft.stake,
            odds: draft.odds,
            bonus: draft.bonus,
            event_date,
            tipster: draft.tipster.clone(),
            status: draft.status,
            bookmaker: draft.sportsbook.clone(),
            obtained_return: settlement_return(draft.status, draft.stake, draft.odds),
            selections: draft.selections.clone(),
        };

        Ok(self.store.insert_bet(&new_bet).await?)
    }

    /// Fetch a bet on behalf of an account
    ///
    /// A bet owned by another account is reported as `NotFound`.
    pub async fn get(&self, bet_id: i64, account_id: &str) -> Result<Bet, BetError> {
        match self.store.find_bet_with_owner(bet_id).await? {
            Some((bet, owner)) if owner == account_id => Ok(bet),
            Some(_) => {
                debug!(bet_id, account_id, "Bet belongs to another account");
                Err(BetError::NotFound(bet_id))
            }
            None => Err(BetError::NotFound(bet_id)),
        }
    }

    /// Fetch a bet without an ownership check (caller already authorized)
    pub async fn find(&self, bet_id: i64) -> Result<Bet, BetError> {
        self.store
            .find_bet_with_owner(bet_id)
            .await?
            .map(|(bet, _)| bet)
            .ok_or(BetError::NotFound(bet_id))
    }

    /// Change the settlement status and recompute the obtained return
    pub async fn update_status(
        &self,
        bet_id: i64,
        status: SettlementStatus,
        account_id: &str,
    ) -> Result<Bet, BetError> {
        let bet = self.get(bet_id, account_id).await?;
        let obtained_return = settlement_return(status, bet.stake, bet.odds);

        let updated = self
            .store
            .update_bet_status(bet_id, status, obtained_return)
            .await?
            .ok_or(BetError::NotFound(bet_id))?;

        info!(bet_id, status = %status, obtained_return = ?obtained_return, "Bet status updated");
        Ok(updated)
    }

    pub async fn delete(&self, bet_id: i64, account_id: &str) -> Result<(), BetError> {
        self.get(bet_id, account_id).await?;
        if !self.store.delete_bet(bet_id).await? {
            return Err(BetError::NotFound(bet_id));
        }
        info!(bet_id, "Bet deleted");
        Ok(())
    }
}
