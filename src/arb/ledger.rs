//! Token balances held by every account, keyed by token address.
//!
//! The engine never stores custodied balances itself; it reads them back from
//! the ledger before and after every external call. The ledger also journals
//! the balance movements made under a checkpoint so that a failed engine call
//! can be reverted as a whole, including transfers performed by the venues it
//! called into.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use alloy::primitives::{Address, U256};
use eyre::{bail, eyre, Result};
use log::error;

/// Balances of one token, per holder
type Balances = HashMap<Address, U256>;

/// Balances of every token, per token address
type Book = HashMap<Address, Balances>;

/// Handle to an open journal frame.
///
/// Returned by [`TokenLedger::checkpoint`] and consumed by either
/// [`TokenLedger::rollback`] or [`TokenLedger::commit`]. A checkpoint only
/// covers the movements made by the thread that opened it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a checkpoint must be committed or rolled back"]
pub struct Checkpoint {
    /// Thread whose movements the frame records
    thread: ThreadId,
    /// Position of the frame in that thread's journal
    depth: usize,
}

/// An ERC-20 style balance book shared by the engine and the venues.
pub trait TokenLedger: Send + Sync {
    /// Balance of `token` held by `holder`
    ///
    /// # Errors
    /// * If the ledger cannot be read
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256>;

    /// Moves `amount` of `token` from `from` to `to`
    ///
    /// # Errors
    /// * If `from` holds less than `amount`
    fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()>;

    /// Opens a journal frame for the calling thread
    fn checkpoint(&self) -> Checkpoint;

    /// Undoes every movement the calling thread made since `checkpoint`,
    /// discarding any frame opened after it
    ///
    /// # Errors
    /// * If the checkpoint is no longer on the journal
    /// * If a movement can no longer be undone
    fn rollback(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Keeps the movements made since `checkpoint`. They stay journaled in the
    /// enclosing frame, if any.
    ///
    /// # Errors
    /// * If the checkpoint is no longer on the journal
    fn commit(&self, checkpoint: Checkpoint) -> Result<()>;
}

/// A checkpoint that rolls back when dropped unless it was committed.
///
/// Dropping happens on every exit path, including a panic unwinding out of a
/// venue.
#[must_use = "dropping a transaction rolls it back"]
pub struct LedgerTransaction<'a> {
    /// Ledger the checkpoint was taken on
    ledger: &'a dyn TokenLedger,
    /// `None` once committed or rolled back
    checkpoint: Option<Checkpoint>,
}

impl<'a> LedgerTransaction<'a> {
    /// Opens a transaction on `ledger`
    pub fn begin(ledger: &'a dyn TokenLedger) -> Self {
        Self {
            ledger,
            checkpoint: Some(ledger.checkpoint()),
        }
    }

    /// Keeps every movement made since the transaction began
    ///
    /// # Errors
    /// * If the checkpoint is no longer on the journal
    pub fn commit(mut self) -> Result<()> {
        let ledger = self.ledger;
        self.checkpoint
            .take()
            .map_or(Ok(()), |checkpoint| ledger.commit(checkpoint))
    }

    /// Undoes every movement made since the transaction began
    ///
    /// # Errors
    /// * If the checkpoint is no longer on the journal
    /// * If a movement can no longer be undone
    pub fn rollback(mut self) -> Result<()> {
        let ledger = self.ledger;
        self.checkpoint
            .take()
            .map_or(Ok(()), |checkpoint| ledger.rollback(checkpoint))
    }
}

impl Drop for LedgerTransaction<'_> {
    fn drop(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            if let Err(err) = self.ledger.rollback(checkpoint) {
                error!("Failed to roll back abandoned ledger transaction: {err}");
            }
        }
    }
}

/// One balance movement; `from` is `None` for a mint
#[derive(Debug, Clone, Copy)]
struct Movement {
    /// Token moved
    token: Address,
    /// Debited holder
    from: Option<Address>,
    /// Credited holder
    to: Address,
    /// Amount moved
    amount: U256,
}

/// In-process ledger backing simulations and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Current balances and the open journal frames
    state: Mutex<LedgerState>,
}

/// Mutable part of [`InMemoryLedger`]
#[derive(Debug, Default)]
struct LedgerState {
    /// Current balances
    book: Book,
    /// Open journal frames per thread, innermost last
    journals: HashMap<ThreadId, Vec<Vec<Movement>>>,
}

impl LedgerState {
    /// Adds `amount` to the balance of `holder`
    fn credit(&mut self, token: Address, holder: Address, amount: U256) -> Result<()> {
        let balance = self.book.entry(token).or_default().entry(holder).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| eyre!("balance of {holder} in {token} overflows"))?;
        Ok(())
    }

    /// Takes `amount` from the balance of `holder`
    fn debit(&mut self, token: Address, holder: Address, amount: U256) -> Result<()> {
        let balance = self.book.entry(token).or_default().entry(holder).or_default();
        let Some(remaining) = balance.checked_sub(amount) else {
            bail!("insufficient balance: {holder} holds {balance} of {token}, needs {amount}");
        };
        *balance = remaining;
        Ok(())
    }

    /// Applies `movement` atomically and journals it for the calling thread
    fn apply(&mut self, movement: Movement) -> Result<()> {
        let Movement {
            token,
            from,
            to,
            amount,
        } = movement;
        if let Some(from) = from {
            self.debit(token, from, amount)?;
        }
        if let Err(err) = self.credit(token, to, amount) {
            if let Some(from) = from {
                self.credit(token, from, amount)?;
            }
            return Err(err);
        }

        if let Some(frame) = self
            .journals
            .get_mut(&thread::current().id())
            .and_then(|frames| frames.last_mut())
        {
            frame.push(movement);
        }
        Ok(())
    }

    /// Reverses `movement` without journaling it
    fn revert(&mut self, movement: Movement) -> Result<()> {
        self.debit(movement.token, movement.to, movement.amount)?;
        if let Some(from) = movement.from {
            self.credit(movement.token, from, movement.amount)?;
        }
        Ok(())
    }

    /// Closes the frames opened at or after `checkpoint`, returning their
    /// movements oldest first
    fn unwind(&mut self, checkpoint: &Checkpoint) -> Result<Vec<Movement>> {
        if checkpoint.thread != thread::current().id() {
            bail!("ledger checkpoint belongs to another thread");
        }
        let Some(frames) = self
            .journals
            .get_mut(&checkpoint.thread)
            .filter(|frames| checkpoint.depth < frames.len())
        else {
            bail!("unknown ledger checkpoint {}", checkpoint.depth);
        };

        let movements = frames.drain(checkpoint.depth..).flatten().collect();
        if frames.is_empty() {
            self.journals.remove(&checkpoint.thread);
        }
        Ok(movements)
    }
}

impl InMemoryLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `amount` of `token` out of thin air and credits it to `to`
    ///
    /// # Errors
    /// * If the holder's balance would overflow
    pub fn mint(&self, token: Address, to: Address, amount: U256) -> Result<()> {
        self.lock().apply(Movement {
            token,
            from: None,
            to,
            amount,
        })
    }

    /// Total amount of `token` held across all accounts
    ///
    /// # Errors
    /// * If the ledger cannot be read
    pub fn total_supply(&self, token: Address) -> Result<U256> {
        Ok(self.lock().book.get(&token).map_or(U256::ZERO, |balances| {
            balances
                .values()
                .fold(U256::ZERO, |total, balance| total.saturating_add(*balance))
        }))
    }

    /// Locks the ledger state. Every update is applied whole, so a poisoned
    /// lock still guards a consistent book.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        Ok(self
            .lock()
            .book
            .get(&token)
            .and_then(|balances| balances.get(&holder))
            .copied()
            .unwrap_or_default())
    }

    fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        self.lock().apply(Movement {
            token,
            from: Some(from),
            to,
            amount,
        })
    }

    fn checkpoint(&self) -> Checkpoint {
        let thread = thread::current().id();
        let mut state = self.lock();
        let frames = state.journals.entry(thread).or_default();
        frames.push(Vec::new());
        Checkpoint {
            thread,
            depth: frames.len() - 1,
        }
    }

    fn rollback(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut state = self.lock();
        let movements = state.unwind(&checkpoint)?;

        let mut failure = None;
        for movement in movements.into_iter().rev() {
            if let Err(err) = state.revert(movement) {
                error!("Cannot undo {movement:?}: {err}");
                failure.get_or_insert(err);
            }
        }
        failure.map_or(Ok(()), Err)
    }

    fn commit(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut state = self.lock();
        let movements = state.unwind(&checkpoint)?;
        if let Some(parent) = state
            .journals
            .get_mut(&checkpoint.thread)
            .and_then(|frames| frames.last_mut())
        {
            parent.extend(movements);
        }
        Ok(())
    }
}
