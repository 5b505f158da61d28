//! Account State Store
//!
//! Binds the single live [`AccountState`] to whoever is logged in.
//!
//! ```text
//!            login(A)                 login(B)
//!  Unbound ───────────▶ Bound(A) ───────────────▶ Bound(B)
//!     ▲                    │   flush A, load B        │
//!     └────── logout ──────┴──────────────────────────┘
//!          flush, reset to defaults (not saved)
//! ```
//!
//! Mutations apply to memory immediately and return. Persistence happens on a
//! background task per identity that waits for a quiet window, then writes
//! whatever snapshot is newest at that moment, so bursts of edits coalesce
//! into one save and a save never carries a stale state.

mod storage;

pub use storage::{storage_key, AccountStorage, JsonFileStorage, MemoryAccountStorage};

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::ledger::Ledger;
use crate::market::QuoteSource;
use crate::model::{AccountState, Execution, Quote, UserId, DEFAULT_STARTING_BALANCE};

/// Pause between save attempts after a storage failure
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Outstanding flush requests per identity
const FLUSH_QUEUE: usize = 8;

/// Store tuning
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub starting_balance: Decimal,
    pub save_debounce: Duration,
    pub save_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            save_debounce: Duration::from_millis(500),
            save_retries: 2,
        }
    }
}

impl From<&SimConfig> for StoreConfig {
    fn from(config: &SimConfig) -> Self {
        Self {
            starting_balance: config.starting_balance,
            save_debounce: config.save_debounce,
            save_retries: config.save_retries,
        }
    }
}

/// Latest revision of an identity's state known to be on storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistMarker {
    pub identity: UserId,
    pub revision: u64,
}

type Pending = (u64, AccountState);

pub struct AccountStore {
    storage: Arc<dyn AccountStorage>,
    config: StoreConfig,
    identity: Option<UserId>,
    state: AccountState,
    /// Mutation counter for the bound identity; 0 is the state as loaded
    revision: u64,
    saver: Option<SaveWorker>,
    snapshots: watch::Sender<AccountState>,
    persisted: Arc<watch::Sender<Option<PersistMarker>>>,
}

impl AccountStore {
    /// Unbound store holding default state
    pub fn new(storage: Arc<dyn AccountStorage>, config: StoreConfig) -> Self {
        let state = AccountState::new(config.starting_balance);
        let (snapshots, _) = watch::channel(state.clone());
        let (persisted, _) = watch::channel(None);
        Self {
            storage,
            config,
            identity: None,
            state,
            revision: 0,
            saver: None,
            snapshots,
            persisted: Arc::new(persisted),
        }
    }

    pub const fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    /// Read-only view of the live account
    pub const fn state(&self) -> &AccountState {
        &self.state
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Receive a fresh snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<AccountState> {
        self.snapshots.subscribe()
    }

    /// Watch the "last persisted" marker
    pub fn persisted(&self) -> watch::Receiver<Option<PersistMarker>> {
        self.persisted.subscribe()
    }

    /// True when storage holds the current in-memory revision
    pub fn is_persisted(&self) -> bool {
        let Some(identity) = &self.identity else {
            return false;
        };
        if self.revision == 0 {
            return true;
        }
        self.persisted
            .borrow()
            .as_ref()
            .is_some_and(|m| &m.identity == identity && m.revision >= self.revision)
    }

    /// React to the auth layer's current identity
    ///
    /// Unsaved changes of the previous identity are written before anything
    /// else happens. Re-announcing the bound identity is a no-op.
    pub async fn set_identity(&mut self, identity: Option<UserId>) {
        if identity == self.identity {
            return;
        }

        self.release().await;

        match identity {
            Some(id) => self.bind(id).await,
            None => {
                tracing::info!("logged out; account reset to defaults");
                self.state = AccountState::new(self.config.starting_balance);
                self.publish();
            }
        }
    }

    pub async fn login(&mut self, identity: UserId) {
        self.set_identity(Some(identity)).await;
    }

    pub async fn logout(&mut self) {
        self.set_identity(None).await;
    }

    async fn bind(&mut self, identity: UserId) {
        let key = storage_key(&identity);
        self.state = match self.storage.load(&key).await {
            Ok(Some(state)) => {
                tracing::info!(%identity, "loaded saved account");
                state
            }
            Ok(None) => {
                tracing::info!(%identity, "no saved account; starting fresh");
                AccountState::new(self.config.starting_balance)
            }
            Err(e) => {
                tracing::warn!(%identity, error = %e, "account load failed; starting fresh");
                AccountState::new(self.config.starting_balance)
            }
        };
        self.revision = 0;
        self.saver = Some(SaveWorker::spawn(
            self.storage.clone(),
            identity.clone(),
            self.state.clone(),
            Arc::clone(&self.persisted),
            &self.config,
        ));
        self.identity = Some(identity);
        self.publish();
    }

    /// Stop the previous identity's saver, flushing what it has not written
    async fn release(&mut self) {
        if let Some(saver) = self.saver.take() {
            saver.finish().await;
        }
        self.identity = None;
        self.revision = 0;
    }

    /// Write any unsaved change now and stop background saving
    pub async fn shutdown(mut self) {
        self.release().await;
    }

    /// Write the current state now instead of waiting for the quiet window
    ///
    /// The request goes through the identity's saver, so it never races a
    /// debounced write already in flight.
    pub async fn flush(&self) -> bool {
        let Some(saver) = &self.saver else {
            return false;
        };
        if self.is_persisted() {
            return true;
        }
        saver.flush().await
    }

    /// Buy at the quoted price
    pub fn buy(&mut self, quote: &Quote, quantity: u64) -> Result<Execution> {
        let execution = Ledger::buy(
            &mut self.state,
            &quote.symbol,
            &quote.company_name,
            quantity,
            quote.price,
        )?;
        self.commit();
        Ok(execution)
    }

    /// Sell at the quoted price
    pub fn sell(&mut self, quote: &Quote, quantity: u64) -> Result<Execution> {
        let execution = Ledger::sell(&mut self.state, &quote.symbol, quantity, quote.price)?;
        self.commit();
        Ok(execution)
    }

    /// Returns `false` (and saves nothing) when already tracked
    pub fn add_to_watchlist(&mut self, symbol: &str) -> bool {
        let added = self.state.watchlist.add(symbol);
        if added {
            self.commit();
        }
        added
    }

    /// Returns `false` (and saves nothing) when not tracked
    pub fn remove_from_watchlist(&mut self, symbol: &str) -> bool {
        let removed = self.state.watchlist.remove(symbol);
        if removed {
            self.commit();
        }
        removed
    }

    pub fn is_in_watchlist(&self, symbol: &str) -> bool {
        self.state.watchlist.contains(symbol)
    }

    pub fn set_balance(&mut self, balance: Decimal) -> Result<()> {
        if balance < Decimal::ZERO {
            return Err(SimError::InvalidBalance(balance));
        }
        self.state.balance = balance;
        self.commit();
        Ok(())
    }

    /// Back to the starting balance with no positions, history or watchlist
    pub fn reset_account(&mut self) {
        tracing::info!(identity = ?self.identity, "account reset");
        self.state = AccountState::new(self.config.starting_balance);
        self.commit();
    }

    /// Record the latest quotes as each position's last known price
    ///
    /// Observers are notified but nothing is saved: revaluation is not a
    /// mutation, and the new prices ride along with the next real one.
    pub fn refresh_prices<Q: QuoteSource + ?Sized>(&mut self, quotes: &Q) -> usize {
        let updated = Ledger::mark_to_market(&mut self.state, quotes);
        if updated > 0 {
            self.publish();
        }
        updated
    }

    fn commit(&mut self) {
        self.publish();
        if let Some(saver) = &self.saver {
            self.revision += 1;
            saver.schedule(self.revision, self.state.clone());
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}

/// Handle on the background writer for one identity
struct SaveWorker {
    pending: watch::Sender<Pending>,
    flushes: mpsc::Sender<oneshot::Sender<bool>>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SaveWorker {
    fn spawn(
        storage: Arc<dyn AccountStorage>,
        identity: UserId,
        initial: AccountState,
        persisted: Arc<watch::Sender<Option<PersistMarker>>>,
        config: &StoreConfig,
    ) -> Self {
        let (pending, pending_rx) = watch::channel((0, initial));
        let (flushes, flushes_rx) = mpsc::channel(FLUSH_QUEUE);
        let (stop, stop_rx) = oneshot::channel();
        let saver = Saver {
            storage,
            identity,
            pending: pending_rx,
            flushes: flushes_rx,
            persisted,
            debounce: config.save_debounce,
            retries: config.save_retries,
            saved: 0,
        };
        let handle = tokio::spawn(saver.run(stop_rx));
        Self { pending, flushes, stop, handle }
    }

    fn schedule(&self, revision: u64, state: AccountState) {
        self.pending.send_replace((revision, state));
    }

    /// Ask the writer to save the newest revision now and wait for the outcome
    async fn flush(&self) -> bool {
        let (reply, outcome) = oneshot::channel();
        if self.flushes.send(reply).await.is_err() {
            return false;
        }
        outcome.await.unwrap_or(false)
    }

    async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "save worker ended abnormally");
        }
    }
}

/// The only writer for one identity's storage key
struct Saver {
    storage: Arc<dyn AccountStorage>,
    identity: UserId,
    pending: watch::Receiver<Pending>,
    flushes: mpsc::Receiver<oneshot::Sender<bool>>,
    persisted: Arc<watch::Sender<Option<PersistMarker>>>,
    debounce: Duration,
    retries: u32,
    saved: u64,
}

impl Saver {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                changed = self.pending.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(reply) = self.flushes.recv() => {
                    let _ = reply.send(self.save_latest().await);
                    continue;
                }
                _ = &mut stop => break,
            }

            // Quiet window: later changes land in the channel and are picked up below
            let quiet = tokio::time::sleep(self.debounce);
            tokio::pin!(quiet);
            let stopped = loop {
                tokio::select! {
                    () = &mut quiet => break false,
                    Some(reply) = self.flushes.recv() => {
                        let _ = reply.send(self.save_latest().await);
                    }
                    _ = &mut stop => break true,
                }
            };
            if stopped {
                break;
            }

            self.save_latest().await;
        }

        self.save_latest().await;
    }

    /// Persist the newest revision unless it is already in storage
    async fn save_latest(&mut self) -> bool {
        let (revision, state) = self.pending.borrow_and_update().clone();
        if revision <= self.saved {
            return true;
        }

        let ok = persist(
            self.storage.as_ref(),
            &self.identity,
            revision,
            &state,
            self.retries,
            &self.persisted,
        )
        .await;
        if ok {
            self.saved = revision;
        }
        ok
    }
}

/// Save with retries; failures are logged and the save dropped
async fn persist(
    storage: &dyn AccountStorage,
    identity: &UserId,
    revision: u64,
    state: &AccountState,
    retries: u32,
    persisted: &watch::Sender<Option<PersistMarker>>,
) -> bool {
    let key = storage_key(identity);

    for attempt in 0..=retries {
        match storage.save(&key, state).await {
            Ok(()) => {
                tracing::debug!(%identity, revision, "account saved");
                persisted.send_modify(|marker| {
                    let newer = marker
                        .as_ref()
                        .is_none_or(|m| &m.identity != identity || m.revision < revision);
                    if newer {
                        *marker = Some(PersistMarker { identity: identity.clone(), revision });
                    }
                });
                return true;
            }
            Err(e) => {
                tracing::warn!(%identity, revision, attempt, error = %e, "account save failed");
                if attempt < retries {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }

    tracing::warn!(%identity, revision, "giving up on save");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogEntry;
    use rust_decimal_macros::dec;

    const APPLE: CatalogEntry = CatalogEntry {
        symbol: "AAPL",
        company_name: "Apple Inc.",
        sector: "Technology",
    };

    fn quote(price: Decimal) -> Quote {
        Quote::new(&APPLE, price, 1_000_000, 1_000_000_000)
    }

    fn store() -> (Arc<MemoryAccountStorage>, AccountStore) {
        let storage = Arc::new(MemoryAccountStorage::new());
        let store = AccountStore::new(storage.clone(), StoreConfig::default());
        (storage, store)
    }

    async fn saved(storage: &MemoryAccountStorage, user: &str) -> Option<AccountState> {
        storage.load(&storage_key(&UserId::new(user))).await.unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_save() {
        let (storage, mut store) = store();
        store.login(UserId::new("alice")).await;

        for symbol in ["AAPL", "MSFT", "TSLA", "KO", "V"] {
            assert!(store.add_to_watchlist(symbol));
        }
        assert!(!store.is_persisted());
        settle().await;

        assert_eq!(storage.save_count(), 1);
        assert!(store.is_persisted());
        let marker = store.persisted().borrow().clone().unwrap();
        assert_eq!(marker.revision, 5);
        assert_eq!(saved(&storage, "alice").await.unwrap().watchlist.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_carries_latest_state() {
        let (storage, mut store) = store();
        store.login(UserId::new("alice")).await;

        store.buy(&quote(dec!(100)), 1).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.buy(&quote(dec!(100)), 2).unwrap();
        settle().await;

        let on_disk = saved(&storage, "alice").await.unwrap();
        assert_eq!(on_disk, *store.state());
        assert_eq!(on_disk.position("AAPL").unwrap().quantity, 3);
        assert_eq!(storage.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_switch_round_trip() {
        let (storage, mut store) = store();

        store.login(UserId::new("alice")).await;
        store.set_balance(dec!(5000)).unwrap();

        // No quiet window: switching must flush alice first
        store.login(UserId::new("bob")).await;
        assert_eq!(store.state().balance, dec!(10000));
        assert_eq!(saved(&storage, "alice").await.unwrap().balance, dec!(5000));

        store.login(UserId::new("alice")).await;
        assert_eq!(store.state().balance, dec!(5000));
        assert_eq!(store.identity(), Some(&UserId::new("alice")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_flushes_then_resets() {
        let (storage, mut store) = store();
        store.login(UserId::new("carol")).await;
        store.buy(&quote(dec!(250)), 4).unwrap();

        store.logout().await;

        assert_eq!(*store.state(), AccountState::default());
        assert!(store.identity().is_none());
        assert!(!store.is_persisted());
        let on_disk = saved(&storage, "carol").await.unwrap();
        assert_eq!(on_disk.balance, dec!(9000));
        assert_eq!(on_disk.transactions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbound_changes_are_not_saved() {
        let (storage, mut store) = store();
        store.set_balance(dec!(1)).unwrap();
        store.add_to_watchlist("NVDA");
        settle().await;

        assert_eq!(storage.save_count(), 0);
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relogin_same_identity_is_noop() {
        let (_storage, mut store) = store();
        store.login(UserId::new("dave")).await;
        store.set_balance(dec!(42)).unwrap();
        store.login(UserId::new("dave")).await;
        assert_eq!(store.state().balance, dec!(42));
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_starts_fresh() {
        let (storage, mut store) = store();
        storage.put_raw(&storage_key(&UserId::new("erin")), "garbage");
        store.login(UserId::new("erin")).await;
        assert_eq!(*store.state(), AccountState::default());

        storage.set_unavailable(true);
        store.login(UserId::new("frank")).await;
        assert_eq!(store.state().balance, dec!(10000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_retried() {
        let (storage, mut store) = store();
        store.login(UserId::new("gina")).await;
        storage.fail_next_saves(2);

        store.set_balance(dec!(777)).unwrap();
        settle().await;

        assert!(store.is_persisted());
        assert_eq!(saved(&storage, "gina").await.unwrap().balance, dec!(777));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_dropped_after_retries() {
        let (storage, mut store) = store();
        store.login(UserId::new("hank")).await;
        storage.fail_next_saves(10);

        store.set_balance(dec!(1)).unwrap();
        settle().await;

        assert!(!store.is_persisted());
        assert!(store.persisted().borrow().is_none());
        assert_eq!(store.state().balance, dec!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_trade_changes_nothing() {
        let (storage, mut store) = store();
        store.login(UserId::new("ivy")).await;
        let before = store.state().clone();

        let err = store.sell(&quote(dec!(10)), 1).unwrap_err();
        assert!(matches!(err, SimError::NoPosition(_)));
        let err = store.buy(&quote(dec!(10_000.01)), 1).unwrap_err();
        assert!(matches!(err, SimError::InsufficientFunds { .. }));

        settle().await;
        assert_eq!(*store.state(), before);
        assert_eq!(store.revision(), 0);
        assert_eq!(storage.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observers_see_each_change() {
        let (_storage, mut store) = store();
        let mut rx = store.subscribe();
        store.login(UserId::new("jo")).await;
        let _ = rx.borrow_and_update();

        store.buy(&quote(dec!(50)), 2).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().balance, dec!(9900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_flush() {
        let (storage, mut store) = store();
        store.login(UserId::new("kim")).await;
        store.buy(&quote(dec!(10)), 10).unwrap();
        store.reset_account();

        assert!(store.flush().await);
        let on_disk = saved(&storage, "kim").await.unwrap();
        assert!(on_disk.transactions.is_empty());
        assert_eq!(on_disk.balance, dec!(10000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_refresh_is_not_saved() {
        let (storage, mut store) = store();
        store.login(UserId::new("lee")).await;
        store.buy(&quote(dec!(10)), 1).unwrap();
        settle().await;
        assert_eq!(storage.save_count(), 1);
        let revision = store.revision();

        let mut rx = store.subscribe();
        let _ = rx.borrow_and_update();

        assert_eq!(store.refresh_prices(&vec![quote(dec!(10))]), 0);
        assert!(!rx.has_changed().unwrap());

        assert_eq!(store.refresh_prices(&vec![quote(dec!(12))]), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.state().position("AAPL").unwrap().last_price, dec!(12));
        assert_eq!(store.refresh_prices(&Vec::<Quote>::new()), 0);

        settle().await;
        assert_eq!(storage.save_count(), 1);
        assert_eq!(store.revision(), revision);

        // The refreshed price is written with the next real change
        store.add_to_watchlist("AAPL");
        settle().await;
        let on_disk = saved(&storage, "lee").await.unwrap();
        assert_eq!(on_disk.position("AAPL").unwrap().last_price, dec!(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookalike_identities_stay_apart() {
        let (_storage, mut store) = store();

        store.login(UserId::new("bob@example.com")).await;
        store.set_balance(dec!(5000)).unwrap();

        store.login(UserId::new("bob_example_com")).await;
        assert_eq!(store.state().balance, dec!(10000));
        store.set_balance(dec!(7)).unwrap();

        store.login(UserId::new("bob@example.com")).await;
        assert_eq!(store.state().balance, dec!(5000));
        store.login(UserId::new("bob_example_com")).await;
        assert_eq!(store.state().balance, dec!(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_save_in_flight() {
        let (storage, mut store) = store();
        store.login(UserId::new("max")).await;
        storage.set_save_delay(Duration::from_secs(1));

        store.buy(&quote(dec!(10)), 1).unwrap();
        // Past the quiet window, so the first save is still running
        tokio::time::sleep(Duration::from_millis(600)).await;
        store.buy(&quote(dec!(10)), 2).unwrap();

        assert!(store.flush().await);
        assert_eq!(storage.peak_concurrent_saves(), 1);
        assert!(store.is_persisted());
        assert_eq!(store.persisted().borrow().as_ref().unwrap().revision, 2);
        assert_eq!(saved(&storage, "max").await.unwrap(), *store.state());

        settle().await;
        assert_eq!(storage.save_count(), 2);
        assert_eq!(saved(&storage, "max").await.unwrap(), *store.state());
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_balance_rejected() {
        let (_storage, mut store) = store();
        store.login(UserId::new("nia")).await;

        let err = store.set_balance(dec!(-0.01)).unwrap_err();
        assert!(matches!(err, SimError::InvalidBalance(_)));
        assert_eq!(store.state().balance, dec!(10000));
        assert_eq!(store.revision(), 0);
    }
}
