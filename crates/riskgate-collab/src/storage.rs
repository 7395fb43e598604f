//! Storage collaborator: trades, accounts, peak values.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::NaiveDate;
use parking_lot::RwLock;

use riskgate_core::{AccountId, AccountState, Position, Price, TradeRecord};

use crate::error::{CollabError, CollabResult};
use crate::BoxFuture;

/// Storage contract for account, trade and position data.
///
/// Implementations must bound their own latency; the engine treats any
/// error (including timeouts) as fail-closed.
pub trait Storage: Send + Sync {
    /// Open positions for an account.
    fn find_active_trades<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<Vec<Position>>>;

    /// Number of trades the account opened on the given calendar day.
    fn count_daily_trades<'a>(
        &'a self,
        account: &'a AccountId,
        day: NaiveDate,
    ) -> BoxFuture<'a, CollabResult<u64>>;

    /// Closed trades for the account on the given calendar day.
    fn find_daily_trades<'a>(
        &'a self,
        account: &'a AccountId,
        day: NaiveDate,
    ) -> BoxFuture<'a, CollabResult<Vec<TradeRecord>>>;

    /// Current and peak portfolio value for the account.
    fn get_account<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<AccountState>>;

    /// Persist a new peak portfolio value.
    fn update_peak_value<'a>(
        &'a self,
        account: &'a AccountId,
        value: Price,
    ) -> BoxFuture<'a, CollabResult<()>>;
}

#[derive(Default)]
struct AccountData {
    positions: Vec<Position>,
    daily_trades: HashMap<NaiveDate, Vec<TradeRecord>>,
    daily_count: HashMap<NaiveDate, u64>,
    state: Option<AccountState>,
}

/// In-memory storage used for tests and local wiring.
///
/// Tracks a call counter so tests can assert that the fast-fail path
/// performs no storage access, and can be switched to a failing mode to
/// exercise fail-closed behavior.
#[derive(Default)]
pub struct InMemoryStorage {
    accounts: RwLock<HashMap<AccountId, AccountData>>,
    unavailable: AtomicBool,
    calls: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `CollabError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Total number of storage calls observed.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_account_state(&self, account: &AccountId, state: AccountState) {
        self.accounts
            .write()
            .entry(account.clone())
            .or_default()
            .state = Some(state);
    }

    pub fn add_position(&self, account: &AccountId, position: Position) {
        self.accounts
            .write()
            .entry(account.clone())
            .or_default()
            .positions
            .push(position);
    }

    pub fn add_daily_trade(&self, account: &AccountId, day: NaiveDate, trade: TradeRecord) {
        let mut accounts = self.accounts.write();
        let data = accounts.entry(account.clone()).or_default();
        data.daily_trades.entry(day).or_default().push(trade);
        *data.daily_count.entry(day).or_default() += 1;
    }

    pub fn set_daily_count(&self, account: &AccountId, day: NaiveDate, count: u64) {
        self.accounts
            .write()
            .entry(account.clone())
            .or_default()
            .daily_count
            .insert(day, count);
    }

    fn guard(&self) -> CollabResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollabError::Unavailable("storage offline".to_string()));
        }
        Ok(())
    }
}

impl Storage for InMemoryStorage {
    fn find_active_trades<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<Vec<Position>>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self
                .accounts
                .read()
                .get(account)
                .map(|d| d.positions.clone())
                .unwrap_or_default())
        })
    }

    fn count_daily_trades<'a>(
        &'a self,
        account: &'a AccountId,
        day: NaiveDate,
    ) -> BoxFuture<'a, CollabResult<u64>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self
                .accounts
                .read()
                .get(account)
                .and_then(|d| d.daily_count.get(&day).copied())
                .unwrap_or(0))
        })
    }

    fn find_daily_trades<'a>(
        &'a self,
        account: &'a AccountId,
        day: NaiveDate,
    ) -> BoxFuture<'a, CollabResult<Vec<TradeRecord>>> {
        Box::pin(async move {
            self.guard()?;
            Ok(self
                .accounts
                .read()
                .get(account)
                .and_then(|d| d.daily_trades.get(&day).cloned())
                .unwrap_or_default())
        })
    }

    fn get_account<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> BoxFuture<'a, CollabResult<AccountState>> {
        Box::pin(async move {
            self.guard()?;
            self.accounts
                .read()
                .get(account)
                .and_then(|d| d.state.clone())
                .ok_or_else(|| CollabError::NotFound(format!("account {}", account)))
        })
    }

    fn update_peak_value<'a>(
        &'a self,
        account: &'a AccountId,
        value: Price,
    ) -> BoxFuture<'a, CollabResult<()>> {
        Box::pin(async move {
            self.guard()?;
            let mut accounts = self.accounts.write();
            let data = accounts
                .get_mut(account)
                .ok_or_else(|| CollabError::NotFound(format!("account {}", account)))?;
            match data.state.as_mut() {
                Some(state) => {
                    state.peak_portfolio_value = value;
                    Ok(())
                }
                None => Err(CollabError::NotFound(format!("account {}", account))),
            }
        })
    }
}
