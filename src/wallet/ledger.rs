//! The credit ledger
//!
//! All balances and escrows live behind one lock. A mutation is first staged
//! as a list of `LedgerChange`s, handed to the store, and applied to memory
//! only after the store accepted it. A failed write therefore leaves both the
//! store and the in-memory book exactly as they were.

use super::error::LedgerError;
use super::types::{Credits, Escrow, EscrowClosure, EscrowId, Settlement, UserId};
use crate::config::WalletConfig;
use crate::errors::ArcadeResult;
use crate::storage::{LedgerChange, LedgerSnapshot, LedgerStore, MemoryLedgerStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// In-memory state guarded by the ledger lock
#[derive(Debug, Default)]
struct Book {
    state: LedgerSnapshot,
    /// Escrows that reached a terminal state during this process lifetime
    closed: HashMap<EscrowId, EscrowClosure>,
}

impl Book {
    fn balance(&self, user: UserId, default: Credits) -> Credits {
        self.state.wallets.get(&user).copied().unwrap_or(default)
    }

    /// Escrow lookup that tells "never existed" apart from "already closed"
    fn open_escrow(&self, id: &str) -> Result<&Escrow, LedgerError> {
        if let Some(escrow) = self.state.escrows.get(id) {
            return Ok(escrow);
        }
        match self.closed.get(id) {
            Some(&closure) => Err(LedgerError::EscrowClosed {
                id: id.to_string(),
                closure,
            }),
            None => Err(LedgerError::EscrowNotFound(id.to_string())),
        }
    }
}

/// Thread-safe wallet ledger over a pluggable store
pub struct Ledger {
    book: Mutex<Book>,
    store: Arc<dyn LedgerStore>,
    config: WalletConfig,
}

impl Ledger {
    /// Load the ledger from `store`
    pub fn open(config: WalletConfig, store: Arc<dyn LedgerStore>) -> ArcadeResult<Self> {
        let state = store.load()?;
        info!(
            store = %store.describe(),
            wallets = state.wallets.len(),
            escrows = state.escrows.len(),
            "Ledger loaded"
        );

        Ok(Self {
            book: Mutex::new(Book {
                state,
                closed: HashMap::new(),
            }),
            store,
            config,
        })
    }

    /// Ledger backed by process memory only
    pub fn in_memory(config: WalletConfig) -> Self {
        Self {
            book: Mutex::new(Book::default()),
            store: Arc::new(MemoryLedgerStore::new()),
            config,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.config.admin_ids.contains(&user)
    }

    fn lock(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist `changes`, then apply them to the book
    fn commit(&self, book: &mut Book, changes: Vec<LedgerChange>) -> Result<(), LedgerError> {
        if let Err(e) = self.store.commit(&changes) {
            warn!(store = %self.store.describe(), error = %e, "Ledger commit failed");
            return Err(LedgerError::Persistence(e));
        }
        book.state.apply(&changes);
        Ok(())
    }

    /// Current balance; unknown users read as the starting balance
    pub fn balance(&self, user: UserId) -> Credits {
        self.lock().balance(user, self.config.starting_balance)
    }

    pub fn deposit(&self, user: UserId, amount: Credits) -> Result<Credits, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.lock();
        let balance = book
            .balance(user, self.config.starting_balance)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { user })?;

        self.commit(&mut book, vec![LedgerChange::PutWallet { user, balance }])?;
        debug!(user, amount, balance, "Deposit");
        Ok(balance)
    }

    pub fn withdraw(&self, user: UserId, amount: Credits) -> Result<Credits, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.lock();
        let current = book.balance(user, self.config.starting_balance);
        if amount > current {
            return Err(LedgerError::InsufficientFunds {
                user,
                balance: current,
                required: amount,
            });
        }

        let balance = current - amount;
        self.commit(&mut book, vec![LedgerChange::PutWallet { user, balance }])?;
        debug!(user, amount, balance, "Withdrawal");
        Ok(balance)
    }

    /// Set the wallet back to the starting balance
    pub fn reset(&self, user: UserId) -> Result<Credits, LedgerError> {
        let balance = self.config.starting_balance;
        let mut book = self.lock();
        self.commit(&mut book, vec![LedgerChange::PutWallet { user, balance }])?;
        info!(user, balance, "Wallet reset");
        Ok(balance)
    }

    /// Withdraw the creator's stake into a new escrow
    pub fn open_escrow(
        &self,
        id: &str,
        creator: UserId,
        stake: Credits,
    ) -> Result<Escrow, LedgerError> {
        if stake == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.lock();
        if book.state.escrows.contains_key(id) {
            return Err(LedgerError::EscrowExists(id.to_string()));
        }

        let current = book.balance(creator, self.config.starting_balance);
        if stake > current {
            return Err(LedgerError::InsufficientFunds {
                user: creator,
                balance: current,
                required: stake,
            });
        }

        let escrow = Escrow::new(id.to_string(), creator, stake);
        self.commit(
            &mut book,
            vec![
                LedgerChange::PutWallet {
                    user: creator,
                    balance: current - stake,
                },
                LedgerChange::PutEscrow(escrow.clone()),
            ],
        )?;
        book.closed.remove(id);

        info!(escrow = %id, creator, stake, "Escrow opened");
        Ok(escrow)
    }

    /// Move `stake` from the user's wallet into an existing escrow
    pub fn join_escrow(
        &self,
        id: &str,
        user: UserId,
        stake: Credits,
    ) -> Result<Escrow, LedgerError> {
        let mut book = self.lock();
        let escrow = book.open_escrow(id)?;

        if escrow.is_participant(user) {
            return Err(LedgerError::AlreadyParticipant {
                id: id.to_string(),
                user,
            });
        }
        if stake != escrow.stake {
            return Err(LedgerError::StakeMismatch {
                id: id.to_string(),
                expected: escrow.stake,
                offered: stake,
            });
        }

        let current = book.balance(user, self.config.starting_balance);
        if stake > current {
            return Err(LedgerError::InsufficientFunds {
                user,
                balance: current,
                required: stake,
            });
        }

        let mut updated = escrow.clone();
        updated.participants.insert(user, stake);
        self.commit(
            &mut book,
            vec![
                LedgerChange::PutWallet {
                    user,
                    balance: current - stake,
                },
                LedgerChange::PutEscrow(updated.clone()),
            ],
        )?;

        info!(escrow = %id, user, stake, pot = updated.pot(), "Escrow joined");
        Ok(updated)
    }

    /// Creator-initiated cancellation; every participant gets their contribution back
    pub fn cancel_escrow(&self, id: &str, requester: UserId) -> Result<Settlement, LedgerError> {
        let mut book = self.lock();
        let escrow = book.open_escrow(id)?.clone();

        if escrow.creator_id != requester {
            return Err(LedgerError::NotCreator {
                id: id.to_string(),
                user: requester,
            });
        }
        if escrow.has_joiners() && !self.config.allow_cancel_after_join {
            return Err(LedgerError::EscrowLocked { id: id.to_string() });
        }

        let payouts = escrow.participants.iter().map(|(&u, &c)| (u, c)).collect();
        self.close(&mut book, escrow, payouts, EscrowClosure::Cancelled, None)
    }

    /// Pay the whole pot to `winner`, or refund everyone when there is none
    pub fn settle_escrow(
        &self,
        id: &str,
        winner: Option<UserId>,
    ) -> Result<Settlement, LedgerError> {
        let mut book = self.lock();
        let escrow = book.open_escrow(id)?.clone();

        match winner {
            Some(user) => {
                if !escrow.is_participant(user) {
                    return Err(LedgerError::NotParticipant {
                        id: id.to_string(),
                        user,
                    });
                }
                let payouts = vec![(user, escrow.pot())];
                self.close(&mut book, escrow, payouts, EscrowClosure::Settled, Some(user))
            }
            None => {
                let payouts = escrow.participants.iter().map(|(&u, &c)| (u, c)).collect();
                self.close(&mut book, escrow, payouts, EscrowClosure::Refunded, None)
            }
        }
    }

    /// Credit `payouts` and drop the escrow in a single commit
    fn close(
        &self,
        book: &mut Book,
        escrow: Escrow,
        payouts: Vec<(UserId, Credits)>,
        closure: EscrowClosure,
        winner: Option<UserId>,
    ) -> Result<Settlement, LedgerError> {
        let mut changes = Vec::with_capacity(payouts.len() + 1);
        for &(user, amount) in &payouts {
            let balance = book
                .balance(user, self.config.starting_balance)
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow { user })?;
            changes.push(LedgerChange::PutWallet { user, balance });
        }
        changes.push(LedgerChange::DeleteEscrow(escrow.id.clone()));

        self.commit(book, changes)?;
        book.closed.insert(escrow.id.clone(), closure);

        let settlement = Settlement {
            escrow_id: escrow.id.clone(),
            closure,
            pot: escrow.pot(),
            winner,
            payouts,
        };
        info!(
            escrow = %settlement.escrow_id,
            closure = %closure,
            pot = settlement.pot,
            winner = ?winner,
            "Escrow closed"
        );
        Ok(settlement)
    }

    fn require_admin(&self, admin: UserId) -> Result<(), LedgerError> {
        if self.is_admin(admin) {
            Ok(())
        } else {
            debug!(user = admin, "Admin command refused");
            Err(LedgerError::NotAdmin(admin))
        }
    }

    pub fn admin_set_balance(
        &self,
        admin: UserId,
        user: UserId,
        balance: Credits,
    ) -> Result<Credits, LedgerError> {
        self.require_admin(admin)?;
        let mut book = self.lock();
        self.commit(&mut book, vec![LedgerChange::PutWallet { user, balance }])?;
        info!(admin, user, balance, "Admin set balance");
        Ok(balance)
    }

    pub fn admin_add_balance(
        &self,
        admin: UserId,
        user: UserId,
        amount: Credits,
    ) -> Result<Credits, LedgerError> {
        self.require_admin(admin)?;
        let balance = self.deposit(user, amount)?;
        info!(user, amount, balance, "Admin added credits");
        Ok(balance)
    }

    /// Remove credits, clamping the balance at zero
    pub fn admin_remove_balance(
        &self,
        admin: UserId,
        user: UserId,
        amount: Credits,
    ) -> Result<Credits, LedgerError> {
        self.require_admin(admin)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.lock();
        let balance = book
            .balance(user, self.config.starting_balance)
            .saturating_sub(amount);
        self.commit(&mut book, vec![LedgerChange::PutWallet { user, balance }])?;
        info!(admin, user, amount, balance, "Admin removed credits");
        Ok(balance)
    }

    /// Every materialised wallet, ordered by user id
    pub fn admin_list_wallets(&self, admin: UserId) -> Result<Vec<(UserId, Credits)>, LedgerError> {
        self.require_admin(admin)?;
        Ok(self
            .lock()
            .state
            .wallets
            .iter()
            .map(|(&user, &balance)| (user, balance))
            .collect())
    }

    pub fn escrow(&self, id: &str) -> Option<Escrow> {
        self.lock().state.escrows.get(id).cloned()
    }

    pub fn open_escrows(&self) -> Vec<Escrow> {
        self.lock().state.escrows.values().cloned().collect()
    }

    /// Sum of all materialised wallet balances
    pub fn total_in_wallets(&self) -> u128 {
        self.lock().state.wallets.values().map(|&c| c as u128).sum()
    }

    /// Sum of all credits held by open escrows
    pub fn total_in_escrow(&self) -> u128 {
        self.lock()
            .state
            .escrows
            .values()
            .flat_map(|escrow| escrow.participants.values())
            .map(|&c| c as u128)
            .sum()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().state.clone()
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store.describe())
            .field("config", &self.config)
            .finish()
    }
}
