//! Connection handle: owns one native database handle.
//!
//! Every operation comes in two shapes built on one core:
//!
//! - `try_*` returns the engine's [`ResultCode`] as data. Its `Err` side
//!   carries local precondition failures (closed connection, empty key,
//!   malformed text), raised before any native call, and a fetch whose
//!   length query reports a negative length.
//! - the plain form turns any code other than `Ok` (and `NotFound` for reads
//!   and deletes) into [`Error::Engine`], enriched with the engine's log.
//!
//! Mutations funnel through the auto-commit step: while auto-commit is on, a
//! successful mutation is followed by a commit. A commit that fails with
//! `Busy` or `NotImplemented` leaves pending changes alone; any other commit
//! failure rolls them back before the failure is reported. The engine log is
//! read as soon as a call fails, so a later rollback cannot overwrite it.

use crate::buffer::{with_key_bytes, with_value_bytes, Datum};
use crate::config::Config;
use crate::diagnostics::{self, engine_error};
use crate::error::{Error, Result};
use crate::mode::OpenMode;
use crate::result_code::ResultCode;
use crate::stats::{ConnectionStats, StatsSnapshot};
use crate::transaction::Transaction;
use kvbridge_sys::constants::{CORRUPT, MEMORY_PATH, OK};
use kvbridge_sys::{Engine, KvInt64, RawDb};
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr::{self, NonNull};
use tracing::{debug, warn};

/// An open database connection.
///
/// The connection exclusively owns its native handle. Closing clears the
/// handle, so later calls fail with [`Error::Closed`] instead of touching
/// freed engine state. Dropping an open connection closes it.
pub struct Connection<E: Engine> {
    /// Engine the handle belongs to.
    engine: E,
    /// Native handle; `None` once closed.
    db: Option<NonNull<RawDb>>,
    /// Whether successful mutations are committed immediately.
    auto_commit: bool,
    /// Path the connection was opened with, for diagnostics.
    path: String,
    /// Operation counters.
    stats: ConnectionStats,
}

// SAFETY: the handle is owned exclusively by this value and is only reached
// through `&mut self` or `&self` methods of this type, so moving the
// connection to another thread moves sole access with it. The type is not
// `Sync`; sharing requires external locking and a thread-safe engine build.
unsafe impl<E: Engine + Send> Send for Connection<E> {}

impl<E: Engine> std::fmt::Debug for Connection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("open", &self.db.is_some())
            .field("auto_commit", &self.auto_commit)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Connection<E> {
    /// Opens a database at `path` with the given mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for an empty path, a non-UTF-8 path
    /// or one with an interior null byte, and [`Error::Engine`] when the
    /// engine refuses to open (typically `CantOpen` or `IoError`).
    pub fn open(engine: E, path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::open_with_config(engine, path, &Config::new().mode(mode))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(engine: E) -> Result<Self> {
        let mode = OpenMode::READ_WRITE | OpenMode::CREATE | OpenMode::IN_MEMORY;
        Self::open(engine, MEMORY_PATH, mode)
    }

    /// Opens a database with a full configuration.
    pub fn open_with_config(engine: E, path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path_to_cstring(path.as_ref())?;
        let mut raw: *mut RawDb = ptr::null_mut();
        // SAFETY: `raw` is a valid out pointer and `path` is null-terminated
        // and outlives the call.
        let rc = unsafe { engine.open(&mut raw, path.as_ptr(), config.mode.bits()) };

        if rc != OK {
            let log = NonNull::new(raw).and_then(|db| {
                let log = diagnostics::error_log(&engine, db);
                // SAFETY: the engine handed back a handle alongside the
                // failure; it is released here and never used again.
                unsafe { engine.close(db.as_ptr()) };
                log
            });
            return Err(engine_error(rc, log));
        }

        let db = NonNull::new(raw).ok_or_else(|| {
            Error::engine(
                ResultCode::CantOpen,
                rc,
                "engine reported success without a handle",
            )
        })?;

        let mut conn = Self {
            engine,
            db: Some(db),
            auto_commit: config.auto_commit,
            path: path.to_string_lossy().into_owned(),
            stats: ConnectionStats::new(),
        };

        if let Some(pages) = config.max_page_cache {
            conn.set_max_page_cache(pages)?;
        }

        debug!(path = %conn.path, mode = ?config.mode, "opened database");
        Ok(conn)
    }

    /// Returns true until [`Connection::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// Returns the path the connection was opened with.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the engine backing this connection.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns whether successful mutations are committed immediately.
    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Switches auto-commit on or off without touching the engine.
    ///
    /// Turning it off opens an implicit transaction that lasts until the
    /// next commit or rollback.
    pub fn set_auto_commit(&mut self, value: bool) {
        self.auto_commit = value;
    }

    /// Returns a snapshot of this connection's counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // === Fetch ===

    /// Fetches a record, reporting the engine code as data.
    ///
    /// The record is read in two calls: the first learns its length, the
    /// second copies exactly that many bytes. If the record changes in
    /// between, whatever the second call reports is returned.
    pub fn try_fetch<'k>(
        &mut self,
        key: impl Into<Datum<'k>>,
    ) -> Result<(ResultCode, Option<Vec<u8>>)> {
        let (status, data) = self.fetch_raw(key.into())?;
        Ok((status.code(), data))
    }

    /// Fetches a record. A missing record is `Ok(None)`.
    pub fn fetch<'k>(&mut self, key: impl Into<Datum<'k>>) -> Result<Option<Vec<u8>>> {
        let (status, data) = self.fetch_raw(key.into())?;
        match status.code() {
            ResultCode::Ok => Ok(data),
            ResultCode::NotFound => Ok(None),
            _ => Err(status.into_error()),
        }
    }

    /// Fetches a record and decodes it as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Besides engine failures, returns [`Error::InvalidUtf8`] when the
    /// stored bytes are not valid UTF-8.
    pub fn fetch_string<'k>(&mut self, key: impl Into<Datum<'k>>) -> Result<Option<String>> {
        match self.fetch(key)? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }

    // === Store / append ===

    /// Stores a record, reporting the engine code as data.
    pub fn try_store<'k, 'v>(
        &mut self,
        key: impl Into<Datum<'k>>,
        value: impl Into<Datum<'v>>,
    ) -> Result<ResultCode> {
        Ok(self.write_raw(key.into(), value.into(), WriteKind::Store)?.code())
    }

    /// Stores a record, replacing any previous value.
    pub fn store<'k, 'v>(
        &mut self,
        key: impl Into<Datum<'k>>,
        value: impl Into<Datum<'v>>,
    ) -> Result<()> {
        self.write_raw(key.into(), value.into(), WriteKind::Store)?
            .into_result()
    }

    /// Appends to a record, reporting the engine code as data.
    pub fn try_append<'k, 'v>(
        &mut self,
        key: impl Into<Datum<'k>>,
        value: impl Into<Datum<'v>>,
    ) -> Result<ResultCode> {
        Ok(self.write_raw(key.into(), value.into(), WriteKind::Append)?.code())
    }

    /// Appends to the end of a record, creating it when missing.
    pub fn append<'k, 'v>(
        &mut self,
        key: impl Into<Datum<'k>>,
        value: impl Into<Datum<'v>>,
    ) -> Result<()> {
        self.write_raw(key.into(), value.into(), WriteKind::Append)?
            .into_result()
    }

    // === Delete ===

    /// Deletes a record, reporting the engine code as data.
    pub fn try_delete<'k>(&mut self, key: impl Into<Datum<'k>>) -> Result<ResultCode> {
        Ok(self.delete_raw(key.into())?.code())
    }

    /// Deletes a record. Returns false when there was nothing to delete.
    pub fn delete<'k>(&mut self, key: impl Into<Datum<'k>>) -> Result<bool> {
        let status = self.delete_raw(key.into())?;
        match status.code() {
            ResultCode::Ok => Ok(true),
            ResultCode::NotFound => Ok(false),
            _ => Err(status.into_error()),
        }
    }

    // === Transactions ===

    /// Starts a transaction and returns a guard bound to this connection.
    ///
    /// Auto-commit is off until the guard is committed, rolled back or
    /// dropped. Dropping the guard without either commits. Starting a
    /// transaction while one is open does not nest; it only rebinds the flag.
    pub fn begin_transaction(&mut self) -> Result<Transaction<'_, E>> {
        self.begin_raw()?.into_result()?;
        Ok(Transaction::new(self))
    }

    /// Starts a transaction without a guard, reporting the engine code.
    pub fn try_begin(&mut self) -> Result<ResultCode> {
        Ok(self.begin_raw()?.code())
    }

    /// Commits pending changes and returns to auto-commit.
    ///
    /// A failed commit is rolled back unless it failed with `Busy` or
    /// `NotImplemented`.
    pub fn try_commit(&mut self) -> Result<ResultCode> {
        let db = self.handle()?;
        self.auto_commit = true;
        Ok(self.commit_step(db).code())
    }

    /// Commits pending changes and returns to auto-commit.
    pub fn commit(&mut self) -> Result<()> {
        let db = self.handle()?;
        self.auto_commit = true;
        self.commit_step(db).into_result()
    }

    /// Discards pending changes and returns to auto-commit.
    pub fn try_rollback(&mut self) -> Result<ResultCode> {
        Ok(self.rollback_raw()?.code())
    }

    /// Discards pending changes and returns to auto-commit.
    pub fn rollback(&mut self) -> Result<()> {
        self.rollback_raw()?.into_result()
    }

    // === Engine configuration ===

    /// Returns the engine's error log, if it holds any text.
    #[must_use]
    pub fn error_log(&self) -> Option<String> {
        self.db.and_then(|db| diagnostics::error_log(&self.engine, db))
    }

    /// Returns the name of the storage engine behind this connection.
    pub fn engine_name(&self) -> Result<Option<String>> {
        let db = self.handle()?;
        let mut name: *const c_char = ptr::null();
        // SAFETY: `db` is live and `name` is a valid out pointer.
        let rc = unsafe { self.engine.config_kv_name(db.as_ptr(), &mut name) };
        self.settle(db, rc).into_result()?;
        // SAFETY: the engine returns a null-terminated static name.
        Ok(unsafe { diagnostics::lossy_text(name, None) })
    }

    /// Limits the number of pages the engine keeps in its cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] without calling the engine when `pages`
    /// does not fit the engine's `int` parameter.
    pub fn set_max_page_cache(&mut self, pages: u32) -> Result<()> {
        let db = self.handle()?;
        let pages = Error::int_setting("page cache size", pages)?;
        // SAFETY: `db` is live; the verb takes one `int`.
        let rc = unsafe { self.engine.config_max_page_cache(db.as_ptr(), pages) };
        self.settle(db, rc).into_result()
    }

    /// Stops the engine from committing on its own when the handle closes.
    ///
    /// [`Connection::close`] still commits an outstanding transaction first.
    pub fn disable_engine_auto_commit(&mut self) -> Result<()> {
        let db = self.handle()?;
        // SAFETY: `db` is live; the verb takes no argument.
        let rc = unsafe { self.engine.config_disable_auto_commit(db.as_ptr()) };
        self.settle(db, rc).into_result()
    }

    // === Close ===

    /// Closes the connection. Calling it again is a no-op.
    ///
    /// An outstanding transaction is committed before the handle is
    /// released. The handle is released even if that commit fails; the
    /// commit failure is then returned.
    pub fn close(&mut self) -> Result<()> {
        let Some(db) = self.db else {
            return Ok(());
        };

        let mut outcome = Ok(());
        if !self.auto_commit {
            self.auto_commit = true;
            outcome = self.commit_step(db).into_result();
        }

        self.db = None;
        // SAFETY: `db` was live and has just been detached from `self`, so
        // no later call can reach it.
        let rc = unsafe { self.engine.close(db.as_ptr()) };
        debug!(path = %self.path, "closed database");

        if rc != OK {
            self.stats.record_error();
            if outcome.is_ok() {
                outcome = Err(engine_error(rc, None));
            }
        }
        outcome
    }

    // === Core ===

    fn handle(&self) -> Result<NonNull<RawDb>> {
        self.db.ok_or(Error::Closed)
    }

    /// Wraps a native code, counting a failure and capturing the engine log
    /// while it still describes that failure.
    fn settle(&self, db: NonNull<RawDb>, rc: c_int) -> Status {
        let code = ResultCode::from_raw(rc);
        if code.is_success() || code.is_absent() {
            return Status { rc, log: None };
        }
        self.stats.record_error();
        Status {
            rc,
            log: diagnostics::error_log(&self.engine, db),
        }
    }

    fn fetch_raw(&mut self, key: Datum<'_>) -> Result<(Status, Option<Vec<u8>>)> {
        let db = self.handle()?;
        let engine = &self.engine;

        let fetched: Result<(c_int, Option<Vec<u8>>)> = with_key_bytes(key, |key, key_len| {
            let mut len: KvInt64 = 0;
            // SAFETY: the key region is valid for this closure, `len` is a
            // valid out pointer and a null buffer asks for the length only.
            let rc = unsafe {
                engine.kv_fetch(db.as_ptr(), key.as_ptr(), key_len, ptr::null_mut(), &mut len)
            };
            if rc != OK {
                return Ok((rc, None));
            }

            let capacity = record_len(len)?;
            if capacity == 0 {
                return Ok((rc, Some(Vec::new())));
            }

            let mut buf = vec![0u8; capacity];
            let mut written = len;
            // SAFETY: `buf` is valid for `written` bytes and outlives the call.
            let rc = unsafe {
                engine.kv_fetch(
                    db.as_ptr(),
                    key.as_ptr(),
                    key_len,
                    buf.as_mut_ptr().cast(),
                    &mut written,
                )
            };
            if rc != OK {
                return Ok((rc, None));
            }
            buf.truncate(record_len(written)?.min(capacity));
            Ok((rc, Some(buf)))
        })?;
        let (rc, data) = fetched.inspect_err(|_| self.stats.record_error())?;

        match ResultCode::from_raw(rc) {
            ResultCode::Ok => self.stats.record_fetch(data.as_ref().map(Vec::len)),
            ResultCode::NotFound => self.stats.record_fetch(None),
            _ => {}
        }
        Ok((self.settle(db, rc), data))
    }

    fn write_raw(&mut self, key: Datum<'_>, value: Datum<'_>, kind: WriteKind) -> Result<Status> {
        let db = self.handle()?;
        let engine = &self.engine;

        let (rc, written) = with_key_bytes(key, |key, key_len| {
            with_value_bytes(value, |value, value_len| {
                // SAFETY: both regions are valid for this closure and the
                // engine does not retain them past the call.
                let rc = unsafe {
                    match kind {
                        WriteKind::Store => engine.kv_store(
                            db.as_ptr(),
                            key.as_ptr(),
                            key_len,
                            value.as_ptr(),
                            value_len,
                        ),
                        WriteKind::Append => engine.kv_append(
                            db.as_ptr(),
                            key.as_ptr(),
                            key_len,
                            value.as_ptr(),
                            value_len,
                        ),
                    }
                };
                (rc, value.len())
            })
        })??;

        if rc == OK {
            match kind {
                WriteKind::Store => self.stats.record_store(written),
                WriteKind::Append => self.stats.record_append(written),
            }
        }
        Ok(self.after_mutation(db, rc))
    }

    fn delete_raw(&mut self, key: Datum<'_>) -> Result<Status> {
        let db = self.handle()?;
        let engine = &self.engine;

        let rc = with_key_bytes(key, |key, key_len| {
            // SAFETY: the key region is valid for this closure.
            unsafe { engine.kv_delete(db.as_ptr(), key.as_ptr(), key_len) }
        })?;

        if rc == OK {
            self.stats.record_delete();
        }
        Ok(self.after_mutation(db, rc))
    }

    fn begin_raw(&mut self) -> Result<Status> {
        let db = self.handle()?;
        // SAFETY: `db` is live.
        let rc = unsafe { self.engine.begin(db.as_ptr()) };
        if rc == OK {
            if !self.auto_commit {
                debug!(path = %self.path, "transaction already open; rebinding");
            }
            self.auto_commit = false;
            self.stats.record_transaction_start();
            debug!(path = %self.path, "began transaction");
        }
        Ok(self.settle(db, rc))
    }

    fn rollback_raw(&mut self) -> Result<Status> {
        let db = self.handle()?;
        self.auto_commit = true;
        // SAFETY: `db` is live.
        let rc = unsafe { self.engine.rollback(db.as_ptr()) };
        self.stats.record_rollback();
        debug!(path = %self.path, code = %ResultCode::from_raw(rc), "rolled back");
        Ok(self.settle(db, rc))
    }

    /// Auto-commit step run after every mutation.
    ///
    /// Only a successful mutation is committed; a failed one is reported
    /// as-is, with nothing committed or rolled back.
    fn after_mutation(&mut self, db: NonNull<RawDb>, rc: c_int) -> Status {
        if rc == OK && self.auto_commit {
            self.commit_step(db)
        } else {
            self.settle(db, rc)
        }
    }

    /// Commits, rolling back on failure unless the engine could not even
    /// attempt the commit (`Busy`, `NotImplemented`).
    ///
    /// The returned status carries the commit's log, read before the
    /// rollback runs.
    fn commit_step(&mut self, db: NonNull<RawDb>) -> Status {
        // SAFETY: `db` is live.
        let rc = unsafe { self.engine.commit(db.as_ptr()) };
        let code = ResultCode::from_raw(rc);
        self.stats.record_commit(code.is_success());
        let status = self.settle(db, rc);
        if code.is_success() {
            return status;
        }

        if code.skips_rollback() {
            warn!(path = %self.path, %code, "commit failed; pending changes kept");
        } else {
            warn!(path = %self.path, %code, "commit failed; rolling back");
            // SAFETY: `db` is live.
            let rollback = unsafe { self.engine.rollback(db.as_ptr()) };
            self.stats.record_rollback();
            if rollback != OK {
                self.stats.record_error();
                warn!(
                    path = %self.path,
                    code = %ResultCode::from_raw(rollback),
                    "rollback after failed commit also failed"
                );
            }
        }
        status
    }
}

impl<E: Engine> Drop for Connection<E> {
    fn drop(&mut self) {
        if self.db.is_some() {
            if let Err(err) = self.close() {
                warn!(path = %self.path, error = %err, "failed to close database on drop");
            }
        }
    }
}

/// Native code of one call, with the engine log captured when it failed.
#[derive(Debug)]
struct Status {
    rc: c_int,
    log: Option<String>,
}

impl Status {
    fn code(&self) -> ResultCode {
        ResultCode::from_raw(self.rc)
    }

    fn into_result(self) -> Result<()> {
        if self.rc == OK {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> Error {
        engine_error(self.rc, self.log)
    }
}

/// Converts a length reported by the engine into a buffer size.
fn record_len(len: KvInt64) -> Result<usize> {
    usize::try_from(len).map_err(|_| {
        Error::engine(
            ResultCode::Corrupt,
            CORRUPT,
            format!("engine reported a negative record length ({len})"),
        )
    })
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    Store,
    Append,
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| Error::invalid_path("path is not valid UTF-8"))?;
    if text.is_empty() {
        return Err(Error::invalid_path("path is empty"));
    }
    CString::new(text).map_err(|_| Error::invalid_path("path contains a null byte"))
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
    fn path_validation() {
        assert!(matches!(
            path_to_cstring(Path::new("")),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            path_to_cstring(Path::new("a\0b")),
            Err(Error::InvalidPath { .. })
        ));
        assert_eq!(
            path_to_cstring(Path::new("data.db")).unwrap().as_bytes(),
            b"data.db"
        );
    }

    #[test]
    fn empty_path_fails_before_engine_call() {
        let engine = SimEngine::new();
        let err = Connection::open(engine.clone(), "", OpenMode::default()).unwrap_err();
        assert!(err.is_local());
        assert_eq!(engine.calls().opens, 0);
    }

    #[test]
    fn store_then_fetch() {
        let (_engine, mut conn) = memory_conn();
        conn.store("alpha", "one").unwrap();
        assert_eq!(conn.fetch("alpha").unwrap(), Some(b"one".to_vec()));
        assert_eq!(conn.fetch_string("alpha").unwrap().as_deref(), Some("one"));
    }

    #[test]
    fn try_shapes_report_codes() {
        let (_engine, mut conn) = memory_conn();
        assert_eq!(conn.try_fetch("missing").unwrap(), (ResultCode::NotFound, None));
        assert_eq!(conn.try_delete("missing").unwrap(), ResultCode::NotFound);
        assert_eq!(conn.try_store("k", "v").unwrap(), ResultCode::Ok);
        assert_eq!(
            conn.try_fetch("k").unwrap(),
            (ResultCode::Ok, Some(b"v".to_vec()))
        );
        assert_eq!(conn.try_delete("k").unwrap(), ResultCode::Ok);
    }

    #[test]
    fn delete_reports_presence() {
        let (_engine, mut conn) = memory_conn();
        assert!(!conn.delete("k").unwrap());
        conn.store("k", "v").unwrap();
        assert!(conn.delete("k").unwrap());
        assert_eq!(conn.fetch("k").unwrap(), None);
    }

    #[test]
    fn empty_value_is_distinct_from_absent() {
        let (_engine, mut conn) = memory_conn();
        conn.store("empty", "").unwrap();
        assert_eq!(conn.fetch("empty").unwrap(), Some(Vec::new()));
        assert_eq!(conn.fetch("other").unwrap(), None);
    }

    #[test]
    fn mutations_auto_commit() {
        let (engine, mut conn) = memory_conn();
        conn.store("a", "1").unwrap();
        conn.append("a", "2").unwrap();
        conn.delete("a").unwrap();
        assert_eq!(engine.calls().commits, 3);
    }

    #[test]
    fn failed_mutation_is_not_committed() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Store, ResultCode::Full as i32));
        let err = conn.store("a", "1").unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::Full));
        assert_eq!(engine.calls().commits, 0);
        assert_eq!(engine.calls().rollbacks, 0);
    }

    #[test]
    fn busy_commit_skips_rollback() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Commit, ResultCode::Busy as i32));
        assert_eq!(conn.try_store("a", "1").unwrap(), ResultCode::Busy);
        assert_eq!(engine.calls().rollbacks, 0);
        assert_eq!(conn.stats().failed_commits, 1);
    }

    #[test]
    fn not_implemented_commit_skips_rollback() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Commit, ResultCode::NotImplemented as i32));
        let err = conn.store("a", "1").unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::NotImplemented));
        assert_eq!(engine.calls().rollbacks, 0);
    }

    #[test]
    fn other_commit_failures_roll_back() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Commit, ResultCode::IoError as i32));
        let err = conn.store("a", "1").unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::IoError));
        assert_eq!(engine.calls().rollbacks, 1);
        assert_eq!(conn.fetch("a").unwrap(), None);
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let (engine, mut conn) = memory_conn();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(!conn.is_open());
        assert_eq!(engine.calls().closes, 1);
        assert!(matches!(conn.fetch("a"), Err(Error::Closed)));
        assert!(matches!(conn.store("a", "b"), Err(Error::Closed)));
        assert!(matches!(conn.try_delete("a"), Err(Error::Closed)));
        assert!(matches!(conn.begin_transaction(), Err(Error::Closed)));
        assert_eq!(conn.error_log(), None);
    }

    #[test]
    fn close_commits_outstanding_transaction() {
        let (engine, mut conn) = memory_conn();
        conn.set_auto_commit(false);
        conn.store("a", "1").unwrap();
        assert_eq!(engine.calls().commits, 0);
        conn.close().unwrap();
        assert_eq!(engine.calls().commits, 1);
    }

    #[test]
    fn drop_closes_handle() {
        let engine = SimEngine::new();
        {
            let _conn = Connection::open_in_memory(engine.clone()).unwrap();
        }
        assert_eq!(engine.calls().closes, 1);
    }

    #[test]
    fn engine_name_and_page_cache() {
        let engine = SimEngine::new();
        let config = Config::new()
            .mode(OpenMode::READ_WRITE | OpenMode::IN_MEMORY)
            .max_page_cache(64);
        let conn = Connection::open_with_config(engine.clone(), MEMORY_PATH, &config).unwrap();
        assert_eq!(conn.engine_name().unwrap().as_deref(), Some("mem"));
        assert_eq!(engine.max_page_cache(), Some(64));
    }

    #[test]
    fn stats_track_operations() {
        let (_engine, mut conn) = memory_conn();
        conn.store("a", "12345").unwrap();
        conn.fetch("a").unwrap();
        conn.fetch("b").unwrap();
        let stats = conn.stats();
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.bytes_written, 5);
        assert_eq!(stats.bytes_read, 5);
        assert_eq!(stats.commits, 1);
    }

    #[test]
    fn commit_log_survives_failed_rollback() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Commit, ResultCode::IoError as i32).with_log("commit broke"));
        engine.inject(Fault::new(Op::Rollback, ResultCode::Corrupt as i32).with_log("rollback broke"));

        let err = conn.store("a", "1").unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::IoError));
        assert_eq!(err.to_string(), "IOError: commit broke");
        assert_eq!(engine.calls().rollbacks, 1);
        assert_eq!(conn.stats().errors, 2);
    }

    #[test]
    fn explicit_commit_reports_commit_log_after_rollback() {
        let (engine, mut conn) = memory_conn();
        conn.set_auto_commit(false);
        conn.store("a", "1").unwrap();
        engine.inject(Fault::new(Op::Commit, ResultCode::Corrupt as i32).with_log("bad page"));
        engine.inject(Fault::new(Op::Rollback, ResultCode::IoError as i32));

        let err = conn.commit().unwrap_err();
        assert_eq!(err.to_string(), "Corrupt: bad page");
        assert!(conn.auto_commit());
    }

    #[test]
    fn close_failure_still_releases_handle() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Close, ResultCode::IoError as i32));

        let err = conn.close().unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::IoError));
        assert!(!conn.is_open());
        conn.close().unwrap();
        assert!(matches!(conn.fetch("a"), Err(Error::Closed)));
        assert_eq!(engine.calls().closes, 1);
        assert_eq!(conn.stats().errors, 1);
    }

    #[test]
    fn close_reports_failed_commit_of_outstanding_transaction() {
        let (engine, mut conn) = memory_conn();
        conn.set_auto_commit(false);
        conn.store("a", "1").unwrap();
        engine.inject(Fault::new(Op::Commit, ResultCode::IoError as i32).with_log("flush failed"));

        let err = conn.close().unwrap_err();
        assert_eq!(err.to_string(), "IOError: flush failed");
        assert!(!conn.is_open());
        let calls = engine.calls();
        assert_eq!(calls.rollbacks, 1);
        assert_eq!(calls.closes, 1);
    }

    #[test]
    fn try_begin_and_try_rollback() {
        let (engine, mut conn) = memory_conn();
        conn.store("a", "old").unwrap();

        assert_eq!(conn.try_begin().unwrap(), ResultCode::Ok);
        assert!(!conn.auto_commit());
        conn.store("a", "new").unwrap();
        assert_eq!(conn.try_rollback().unwrap(), ResultCode::Ok);
        assert!(conn.auto_commit());
        assert_eq!(conn.fetch("a").unwrap(), Some(b"old".to_vec()));

        engine.inject(Fault::new(Op::Begin, ResultCode::Busy as i32));
        assert_eq!(conn.try_begin().unwrap(), ResultCode::Busy);
        assert!(conn.auto_commit());

        conn.set_auto_commit(false);
        engine.inject(Fault::new(Op::Rollback, ResultCode::IoError as i32));
        assert_eq!(conn.try_rollback().unwrap(), ResultCode::IoError);
        assert!(conn.auto_commit());
    }

    #[test]
    fn open_failure_with_handle_reads_log_and_closes() {
        let engine = SimEngine::new();
        engine.inject(
            Fault::new(Op::Open, ResultCode::CantOpen as i32)
                .with_log("journal locked")
                .with_handle(),
        );

        let err = Connection::open_in_memory(engine.clone()).unwrap_err();
        assert_eq!(err.to_string(), "CantOpen: journal locked");
        assert_eq!(engine.calls().closes, 1);
    }

    #[test]
    fn negative_record_length_is_an_error() {
        let (engine, mut conn) = memory_conn();
        conn.store("k", "v").unwrap();

        engine.inject(Fault::new(Op::Fetch, OK).with_length(-1));
        let err = conn.fetch("k").unwrap_err();
        assert_eq!(err.code(), Some(ResultCode::Corrupt));
        assert!(!err.is_local());
        assert_eq!(engine.calls().fetches, 1);

        engine.inject(Fault::new(Op::Fetch, OK).with_length(-7));
        assert!(conn.try_fetch("k").is_err());
        assert_eq!(conn.stats().errors, 2);
    }

    #[test]
    fn try_shape_failures_are_counted() {
        let (engine, mut conn) = memory_conn();
        engine.inject(Fault::new(Op::Store, ResultCode::Full as i32));
        assert_eq!(conn.try_store("a", "1").unwrap(), ResultCode::Full);
        assert_eq!(conn.try_delete("missing").unwrap(), ResultCode::NotFound);
        assert_eq!(conn.try_fetch("missing").unwrap(), (ResultCode::NotFound, None));
        assert_eq!(conn.stats().errors, 1);
    }

    #[test]
    fn oversized_page_cache_is_rejected_locally() {
        let (engine, mut conn) = memory_conn();
        let err = conn.set_max_page_cache(u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfRange {
                setting: "page cache size",
                ..
            }
        ));
        assert_eq!(engine.max_page_cache(), None);
        assert_eq!(conn.stats().errors, 0);
    }
}
