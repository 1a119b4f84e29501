use super::Scope;

use std::{
    ops::Deref,
    sync::{Arc, Mutex, PoisonError},
};
use tether_core::{
    driver::{Cursor, Driver, Mode, Transaction},
    stmt::{Document, Key},
    Error, Result,
};

/// A storage transaction plus the engine's view of its lifecycle.
#[derive(Debug)]
pub(crate) struct Tx {
    inner: Box<dyn Transaction>,
    state: Mutex<State>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Committed,
    Aborted,
}

/// A transaction opened for one operation, or one threaded in by the
/// caller.
pub(crate) enum TxRef {
    Owned(Tx),
    Shared(Arc<Tx>),
}

impl Tx {
    pub(crate) async fn begin(driver: &dyn Driver, scope: &Scope, mode: Mode) -> Result<Tx> {
        let collections = scope.to_vec();
        let inner = driver
            .begin(&collections, mode)
            .await
            .map_err(|err| err.context(Error::unknown()))?;

        tracing::debug!(scope = ?collections, %mode, "transaction opened");

        Ok(Tx {
            inner,
            state: Mutex::new(State::Active),
        })
    }

    fn state(&self) -> State {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `Active` to `next`, failing if already finished.
    fn transition(&self, next: State) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            State::Active => {
                *state = next;
                Ok(())
            }
            State::Committed => Err(Error::transaction_inactive("already committed")),
            State::Aborted => Err(Error::transaction_inactive("already aborted")),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state() == State::Active
    }

    pub(crate) fn check_active(&self) -> Result<()> {
        match self.state() {
            State::Active => Ok(()),
            State::Committed => Err(Error::transaction_inactive("already committed")),
            State::Aborted => Err(Error::transaction_inactive("already aborted")),
        }
    }

    /// Check that an operation needing `scope` in `mode` can run here.
    pub(crate) fn covers(&self, scope: &Scope, mode: Mode) -> Result<()> {
        if !self.inner.mode().covers(mode) {
            return Err(Error::invalid_config(format!(
                "operation needs a {mode} transaction, but the transaction is {}",
                self.inner.mode()
            )));
        }

        let missing: Vec<_> = scope
            .iter()
            .filter(|name| !self.inner.scope().iter().any(|held| held == *name))
            .collect();

        if !missing.is_empty() {
            return Err(Error::invalid_config(format!(
                "operation touches {missing:?}, which the transaction was not opened over"
            )));
        }

        Ok(())
    }

    pub(crate) async fn add(&self, collection: &str, document: Document) -> Result<Key> {
        self.check_active()?;
        self.inner
            .add(collection, document)
            .await
            .map_err(|err| err.context(Error::add_failed(collection)))
    }

    pub(crate) async fn get(&self, collection: &str, key: &Key) -> Result<Option<Document>> {
        self.check_active()?;
        self.inner.get(collection, key).await
    }

    pub(crate) async fn put(&self, collection: &str, document: Document) -> Result<Key> {
        self.check_active()?;
        self.inner
            .put(collection, document)
            .await
            .map_err(|err| err.context(Error::update_failed(collection)))
    }

    pub(crate) async fn delete(&self, collection: &str, key: &Key) -> Result<()> {
        self.check_active()?;
        self.inner
            .delete(collection, key)
            .await
            .map_err(|err| err.context(Error::delete_failed(collection)))
    }

    pub(crate) async fn cursor(&self, collection: &str) -> Result<Box<dyn Cursor + '_>> {
        self.check_active()?;
        self.inner.cursor(collection).await
    }

    pub(crate) async fn commit(&self) -> Result<()> {
        self.transition(State::Committed)?;
        self.inner.commit().await?;
        tracing::debug!(scope = ?self.inner.scope(), "transaction committed");
        Ok(())
    }

    pub(crate) async fn abort(&self) -> Result<()> {
        self.transition(State::Aborted)?;
        self.inner.abort().await?;
        tracing::debug!(scope = ?self.inner.scope(), "transaction aborted");
        Ok(())
    }
}

impl TxRef {
    /// Settle an operation's outcome.
    ///
    /// Success commits an owned transaction and leaves a threaded one open.
    /// Failure aborts either kind. Errors outside the engine taxonomy are
    /// wrapped as unknown before they reach the caller.
    pub(crate) async fn finish<T>(self, res: Result<T>) -> Result<T> {
        let err = match res {
            Ok(value) => match &self {
                TxRef::Owned(tx) => match tx.commit().await {
                    Ok(()) => return Ok(value),
                    Err(err) => err,
                },
                TxRef::Shared(_) => return Ok(value),
            },
            Err(err) => err,
        };

        let err = if err.is_engine() {
            err
        } else {
            err.context(Error::unknown())
        };

        tracing::debug!(%err, "operation failed");

        if self.is_active() {
            if let Err(abort_err) = self.abort().await {
                tracing::debug!(%abort_err, "abort failed");
            }
        }

        Err(err)
    }
}

impl Deref for TxRef {
    type Target = Tx;

    fn deref(&self) -> &Tx {
        match self {
            TxRef::Owned(tx) => tx,
            TxRef::Shared(tx) => tx,
        }
    }
}
