//! Scoped transaction guard.

use crate::connection::Connection;
use crate::error::Result;
use crate::result_code::ResultCode;
use kvbridge_sys::Engine;
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// An open transaction on a [`Connection`].
///
/// Obtained from [`Connection::begin_transaction`]. The guard dereferences
/// to the connection, so reads and writes go through it unchanged; they
/// are held as pending changes until the guard finishes.
///
/// Dropping the guard without calling [`Transaction::commit`] or
/// [`Transaction::rollback`] commits. Use `rollback` to discard.
///
/// ```ignore
/// let mut txn = conn.begin_transaction()?;
/// txn.store("a", "1")?;
/// txn.store("b", "2")?;
/// txn.commit()?;
/// ```
#[must_use = "dropping a transaction commits it immediately"]
pub struct Transaction<'c, E: Engine> {
    conn: &'c mut Connection<E>,
    finished: bool,
}

impl<'c, E: Engine> Transaction<'c, E> {
    pub(crate) fn new(conn: &'c mut Connection<E>) -> Self {
        Self {
            conn,
            finished: false,
        }
    }

    /// Commits the transaction.
    ///
    /// On failure the pending changes are rolled back, except when the
    /// engine reports `Busy` or `NotImplemented`.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.commit()
    }

    /// Commits the transaction, reporting the engine code as data.
    pub fn try_commit(mut self) -> Result<ResultCode> {
        self.finished = true;
        self.conn.try_commit()
    }

    /// Discards the transaction's changes.
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback()
    }

    /// Discards the transaction's changes, reporting the engine code as data.
    pub fn try_rollback(mut self) -> Result<ResultCode> {
        self.finished = true;
        self.conn.try_rollback()
    }
}

impl<E: Engine> Deref for Transaction<'_, E> {
    type Target = Connection<E>;

    fn deref(&self) -> &Self::Target {
        self.conn
    }
}

impl<E: Engine> DerefMut for Transaction<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
    }
}

impl<E: Engine> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if self.finished || !self.conn.is_open() {
            return;
        }
        if let Err(err) = self.conn.commit() {
            warn!(path = %self.conn.path(), error = %err, "commit on transaction drop failed");
        }
    }
}

impl<E: Engine> std::fmt::Debug for Transaction<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("path", &self.conn.path())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvbridge_testkit::{Fault, Op, SimEngine};

    fn memory_conn() -> (SimEngine, Connection<SimEngine>) {
        let engine = SimEngine::new();
        let conn = Connection::open_in_memory(engine.clone()).unwrap();
        (engine, conn)
    }

    #[test]
    fn begin_disables_auto_commit() {
        let (engine, mut conn) = memory_conn();
        let mut txn = conn.begin_transaction().unwrap();
        assert!(!txn.auto_commit());
        txn.store("a", "1").unwrap();
        txn.store("b", "2").unwrap();
        assert_eq!(engine.calls().commits, 0);
        txn.commit().unwrap();
        assert!(conn.auto_commit());
        assert_eq!(engine.calls().commits, 1);
    }

    #[test]
    fn drop_commits() {
        let (engine, mut conn) = memory_conn();
        {
            let mut txn = conn.begin_transaction().unwrap();
            txn.store("a", "1").unwrap();
        }
        assert_eq!(engine.calls().commits, 1);
        assert!(conn.auto_commit());
        assert_eq!(conn.fetch("a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn rollback_discards() {
        let (engine, mut conn) = memory_conn();
        conn.store("a", "old").unwrap();

        let mut txn = conn.begin_transaction().unwrap();
        txn.store("a", "new").unwrap();
        txn.store("b", "1").unwrap();
        txn.rollback().unwrap();

        assert!(conn.auto_commit());
        assert_eq!(conn.fetch("a").unwrap(), Some(b"old".to_vec()));
        assert_eq!(conn.fetch("b").unwrap(), None);
        assert_eq!(engine.calls().rollbacks, 1);
    }

    #[test]
    fn try_commit_reports_busy() {
        let (engine, mut conn) = memory_conn();
        let mut txn = conn.begin_transaction().unwrap();
        txn.store("a", "1").unwrap();
        engine.inject(Fault::new(Op::Commit, ResultCode::Busy as i32));
        assert_eq!(txn.try_commit().unwrap(), ResultCode::Busy);
        assert_eq!(engine.calls().rollbacks, 0);
        assert!(conn.auto_commit());
    }

    #[test]
    fn failed_begin_yields_no_guard() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Begin, ResultCode::Busy as i32));
        let err = conn.begin_transaction().unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::Busy));
        assert!(conn.auto_commit());
    }

    #[test]
    fn failed_commit_on_drop_rolls_back() {
        let (engine, mut conn) = memory_conn();
        {
            let mut txn = conn.begin_transaction().unwrap();
            txn.store("a", "1").unwrap();
            engine.inject(Fault::new(Op::Commit, ResultCode::IoError as i32));
        }
        assert!(conn.auto_commit());
        assert_eq!(conn.fetch("a").unwrap(), None);
        assert_eq!(engine.calls().rollbacks, 1);
        assert_eq!(conn.stats().failed_commits, 1);
    }

    #[test]
    fn try_rollback_discards() {
        let (engine, mut conn) = memory_conn();
        let mut txn = conn.begin_transaction().unwrap();
        txn.store("a", "1").unwrap();
        assert_eq!(txn.try_rollback().unwrap(), ResultCode::Ok);
        assert!(conn.auto_commit());
        assert_eq!(conn.fetch("a").unwrap(), None);
        assert_eq!(engine.calls().commits, 0);
    }
}
