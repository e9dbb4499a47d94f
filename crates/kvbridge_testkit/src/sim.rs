//! In-process reference engine.
//!
//! `SimEngine` implements the raw [`Engine`] ABI over an in-memory map with
//! optional file persistence. It follows the engine's observable contract:
//!
//! - writes accumulate in an implicit transaction until `commit` or `rollback`
//! - closing a handle commits unless commit-on-close was disabled
//! - fetch with a null buffer reports the record length only
//! - failures leave a message in the per-handle error log
//!
//! Faults can be queued to make a chosen call fail with a chosen code, and
//! every call is counted.

use crate::snapshot::{self, Records, SnapshotError};
use kvbridge_sys::constants::{
    BUSY, CANTOPEN, CORRUPT, INVALID, IOERR, MEMORY_PATH, NOTFOUND, OK, OPEN_CREATE,
    OPEN_EXCLUSIVE, OPEN_IN_MEMORY, OPEN_MMAP, OPEN_READONLY, READ_ONLY,
};
use kvbridge_sys::{Engine, KvInt64, RawDb};
use parking_lot::Mutex;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

/// Engine call that a [`Fault`] can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `open`
    Open,
    /// `close`
    Close,
    /// `kv_store`
    Store,
    /// `kv_append`
    Append,
    /// `kv_fetch`
    Fetch,
    /// `kv_delete`
    Delete,
    /// `begin`
    Begin,
    /// `commit`
    Commit,
    /// `rollback`
    Rollback,
}

/// A one-shot failure queued on a [`SimEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Targeted call.
    pub op: Op,
    /// Code returned instead of running the call.
    pub code: c_int,
    /// Text left in the error log, if any.
    pub log: Option<String>,
    /// Matching calls to let through before firing.
    pub skip: u32,
    /// `Open` only: hand back a live handle alongside the failure.
    pub handle: bool,
    /// `Fetch` only: length written to the caller's length slot.
    pub length: Option<KvInt64>,
}

impl Fault {
    /// Fails the next `op` call with `code`, leaving the error log empty.
    pub fn new(op: Op, code: c_int) -> Self {
        Self {
            op,
            code,
            log: None,
            skip: 0,
            handle: false,
            length: None,
        }
    }

    /// Also writes `log` to the error log when firing.
    #[must_use]
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    /// Leaves a handle in the open call's out pointer when firing.
    #[must_use]
    pub fn with_handle(mut self) -> Self {
        self.handle = true;
        self
    }

    /// Reports `len` through the fetch call's length slot when firing.
    #[must_use]
    pub fn with_length(mut self, len: KvInt64) -> Self {
        self.length = Some(len);
        self
    }

    /// Lets `calls` matching calls through before firing.
    #[must_use]
    pub fn after(mut self, calls: u32) -> Self {
        self.skip = calls;
        self
    }
}

/// Number of calls made to each engine entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    /// `open` calls.
    pub opens: u32,
    /// `close` calls.
    pub closes: u32,
    /// `kv_store` calls.
    pub stores: u32,
    /// `kv_append` calls.
    pub appends: u32,
    /// `kv_fetch` calls, length queries included.
    pub fetches: u32,
    /// `kv_delete` calls.
    pub deletes: u32,
    /// `begin` calls.
    pub begins: u32,
    /// `commit` calls, failed ones included.
    pub commits: u32,
    /// `rollback` calls.
    pub rollbacks: u32,
}

/// Process-wide settings received through the `lib_*` calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryState {
    /// Last threading mode selected.
    pub multi_threaded: Option<bool>,
    /// Last accepted page size.
    pub page_size: Option<u32>,
    /// `lib_init` calls.
    pub inits: u32,
    /// `lib_shutdown` calls.
    pub shutdowns: u32,
}

#[derive(Debug, Default)]
struct Shared {
    faults: Vec<Fault>,
    calls: CallCounts,
    library: LibraryState,
    max_page_cache: Option<u32>,
}

/// Reference engine implementing the raw ABI in process.
///
/// Clones share fault queue, counters and library state, so a test can keep
/// one clone for inspection while a connection owns another.
#[derive(Debug, Clone, Default)]
pub struct SimEngine {
    shared: Arc<Mutex<Shared>>,
}

/// State behind one handle.
struct SimDb {
    /// Backing file; `None` for in-memory databases.
    path: Option<PathBuf>,
    read_only: bool,
    committed: Records,
    /// Current view: committed records plus pending changes.
    working: Records,
    commit_on_close: bool,
    err_log: CString,
}

impl SimDb {
    fn new(path: Option<PathBuf>, read_only: bool, committed: Records) -> Self {
        Self {
            path,
            read_only,
            working: committed.clone(),
            committed,
            commit_on_close: true,
            err_log: CString::default(),
        }
    }

    fn is_dirty(&self) -> bool {
        self.working != self.committed
    }

    fn set_log(&mut self, message: &str) {
        self.err_log = CString::new(message.replace('\0', " ")).unwrap_or_default();
    }

    fn clear_log(&mut self) {
        self.err_log = CString::default();
    }

    fn fail(&mut self, code: c_int, message: &str) -> c_int {
        self.set_log(message);
        code
    }

    fn persist(&mut self) -> c_int {
        if let Some(path) = &self.path {
            if let Err(err) = snapshot::save(path, &self.working) {
                let message = format!("Cannot write database snapshot: {err}");
                return self.fail(IOERR, &message);
            }
        }
        self.committed = self.working.clone();
        OK
    }
}

/// Reborrows a handle produced by [`SimEngine::open`].
///
/// # Safety
///
/// `db` must be a live handle from this engine with no other live borrow.
unsafe fn sim_db<'a>(db: *mut RawDb) -> &'a mut SimDb {
    &mut *db.cast::<SimDb>()
}

/// Copies a key out of a raw region.
///
/// # Safety
///
/// `ptr` must be valid for `len` bytes when `len` is positive.
unsafe fn raw_bytes(ptr: *const c_void, len: KvInt64) -> Option<Vec<u8>> {
    let len = usize::try_from(len).ok()?;
    if len == 0 {
        return Some(Vec::new());
    }
    if ptr.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec())
}

impl SimEngine {
    /// Creates an engine with no queued faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot fault. Faults fire in the order they were queued.
    pub fn inject(&self, fault: Fault) {
        self.shared.lock().faults.push(fault);
    }

    /// Returns the call counters.
    pub fn calls(&self) -> CallCounts {
        self.shared.lock().calls
    }

    /// Returns the settings received through the `lib_*` calls.
    pub fn library(&self) -> LibraryState {
        self.shared.lock().library.clone()
    }

    /// Returns the last page cache limit set on any handle.
    pub fn max_page_cache(&self) -> Option<u32> {
        self.shared.lock().max_page_cache
    }

    /// Counts a call to `op` and returns the fault it triggers, if any.
    fn enter(&self, op: Op) -> Option<Fault> {
        let mut shared = self.shared.lock();
        let calls = &mut shared.calls;
        match op {
            Op::Open => calls.opens += 1,
            Op::Close => calls.closes += 1,
            Op::Store => calls.stores += 1,
            Op::Append => calls.appends += 1,
            Op::Fetch => calls.fetches += 1,
            Op::Delete => calls.deletes += 1,
            Op::Begin => calls.begins += 1,
            Op::Commit => calls.commits += 1,
            Op::Rollback => calls.rollbacks += 1,
        }

        let index = shared.faults.iter().position(|fault| fault.op == op)?;
        let fault = &mut shared.faults[index];
        if fault.skip > 0 {
            fault.skip -= 1;
            return None;
        }
        let fault = shared.faults.remove(index);
        trace!(?op, code = fault.code, "injected fault");
        Some(fault)
    }

    /// Runs a fault against a handle: logs its text and returns its code.
    fn fire(db: &mut SimDb, fault: Fault) -> c_int {
        match fault.log {
            Some(log) => db.set_log(&log),
            None => db.clear_log(),
        }
        fault.code
    }

    unsafe fn write(
        &self,
        op: Op,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int {
        let fault = self.enter(op);
        let db = sim_db(db);
        db.clear_log();
        if let Some(fault) = fault {
            return Self::fire(db, fault);
        }
        if db.read_only {
            return db.fail(READ_ONLY, "Read-only database");
        }

        let Some(key) = raw_bytes(key, KvInt64::from(key_len)).filter(|k| !k.is_empty()) else {
            return db.fail(INVALID, "Empty key");
        };
        let Some(data) = raw_bytes(data, data_len) else {
            return db.fail(INVALID, "Invalid data buffer");
        };

        match op {
            Op::Append => db.working.entry(key).or_default().extend_from_slice(&data),
            _ => {
                db.working.insert(key, data);
            }
        }
        OK
    }
}

impl Engine for SimEngine {
    unsafe fn open(&self, out_db: *mut *mut RawDb, path: *const c_char, mode: c_uint) -> c_int {
        *out_db = std::ptr::null_mut();
        if let Some(fault) = self.enter(Op::Open) {
            if fault.handle {
                let mut db = SimDb::new(None, false, Records::new());
                let code = Self::fire(&mut db, fault);
                *out_db = Box::into_raw(Box::new(db)).cast::<RawDb>();
                return code;
            }
            return fault.code;
        }
        if path.is_null() {
            return INVALID;
        }
        let path = CStr::from_ptr(path).to_string_lossy().into_owned();
        let in_memory = mode & OPEN_IN_MEMORY != 0 || path == MEMORY_PATH;
        let read_only = mode & (OPEN_READONLY | OPEN_MMAP) != 0;

        let (path, committed) = if in_memory {
            (None, Records::new())
        } else {
            let path = PathBuf::from(path);
            let records = match snapshot::load(&path) {
                Ok(_) if mode & OPEN_EXCLUSIVE != 0 => return CANTOPEN,
                Ok(records) => records,
                Err(SnapshotError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                    if read_only || mode & OPEN_CREATE == 0 {
                        return CANTOPEN;
                    }
                    Records::new()
                }
                Err(SnapshotError::Io(_)) => return IOERR,
                Err(_) => return CORRUPT,
            };
            (Some(path), records)
        };

        let db = Box::new(SimDb::new(path, read_only, committed));
        *out_db = Box::into_raw(db).cast::<RawDb>();
        OK
    }

    unsafe fn close(&self, db: *mut RawDb) -> c_int {
        let fault = self.enter(Op::Close);
        let mut db = Box::from_raw(db.cast::<SimDb>());
        if let Some(fault) = fault {
            return fault.code;
        }
        if db.commit_on_close && db.is_dirty() {
            return db.persist();
        }
        OK
    }

    unsafe fn kv_store(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int {
        self.write(Op::Store, db, key, key_len, data, data_len)
    }

    unsafe fn kv_append(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int {
        self.write(Op::Append, db, key, key_len, data, data_len)
    }

    unsafe fn kv_fetch(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        buf: *mut c_void,
        buf_len: *mut KvInt64,
    ) -> c_int {
        let fault = self.enter(Op::Fetch);
        let db = sim_db(db);
        if let Some(fault) = fault {
            if let Some(len) = fault.length {
                *buf_len = len;
            }
            return Self::fire(db, fault);
        }
        let Some(key) = raw_bytes(key, KvInt64::from(key_len)) else {
            return db.fail(INVALID, "Invalid key buffer");
        };
        let Some(value) = db.working.get(&key) else {
            return NOTFOUND;
        };

        let available = KvInt64::try_from(value.len()).unwrap_or(KvInt64::MAX);
        if buf.is_null() {
            *buf_len = available;
            return OK;
        }
        let n = usize::try_from((*buf_len).min(available)).unwrap_or(0);
        std::ptr::copy_nonoverlapping(value.as_ptr(), buf.cast::<u8>(), n);
        *buf_len = KvInt64::try_from(n).unwrap_or(0);
        OK
    }

    unsafe fn kv_delete(&self, db: *mut RawDb, key: *const c_void, key_len: c_int) -> c_int {
        let fault = self.enter(Op::Delete);
        let db = sim_db(db);
        db.clear_log();
        if let Some(fault) = fault {
            return Self::fire(db, fault);
        }
        if db.read_only {
            return db.fail(READ_ONLY, "Read-only database");
        }
        let Some(key) = raw_bytes(key, KvInt64::from(key_len)) else {
            return db.fail(INVALID, "Invalid key buffer");
        };
        match db.working.remove(&key) {
            Some(_) => OK,
            None => NOTFOUND,
        }
    }

    unsafe fn begin(&self, db: *mut RawDb) -> c_int {
        let fault = self.enter(Op::Begin);
        let db = sim_db(db);
        db.clear_log();
        if let Some(fault) = fault {
            return Self::fire(db, fault);
        }
        if db.read_only {
            return db.fail(READ_ONLY, "Read-only database");
        }
        OK
    }

    unsafe fn commit(&self, db: *mut RawDb) -> c_int {
        let fault = self.enter(Op::Commit);
        let db = sim_db(db);
        if let Some(fault) = fault {
            return Self::fire(db, fault);
        }
        if !db.is_dirty() {
            return OK;
        }
        db.persist()
    }

    unsafe fn rollback(&self, db: *mut RawDb) -> c_int {
        let fault = self.enter(Op::Rollback);
        let db = sim_db(db);
        if let Some(fault) = fault {
            return Self::fire(db, fault);
        }
        db.working = db.committed.clone();
        OK
    }

    unsafe fn config_err_log(
        &self,
        db: *mut RawDb,
        out_log: *mut *const c_char,
        out_len: *mut c_int,
    ) -> c_int {
        let db = sim_db(db);
        *out_log = db.err_log.as_ptr();
        *out_len = c_int::try_from(db.err_log.as_bytes().len()).unwrap_or(c_int::MAX);
        OK
    }

    unsafe fn config_max_page_cache(&self, db: *mut RawDb, max_pages: c_int) -> c_int {
        let db = sim_db(db);
        match u32::try_from(max_pages) {
            Ok(pages) => {
                self.shared.lock().max_page_cache = Some(pages);
                OK
            }
            Err(_) => db.fail(INVALID, "Invalid page cache size"),
        }
    }

    unsafe fn config_disable_auto_commit(&self, db: *mut RawDb) -> c_int {
        sim_db(db).commit_on_close = false;
        OK
    }

    unsafe fn config_kv_name(&self, db: *mut RawDb, out_name: *mut *const c_char) -> c_int {
        let name = if sim_db(db).path.is_some() {
            c"hash"
        } else {
            c"mem"
        };
        *out_name = name.as_ptr();
        OK
    }

    fn lib_config_thread_level(&self, multi_threaded: bool) -> c_int {
        let mut shared = self.shared.lock();
        if shared.library.inits > shared.library.shutdowns {
            return BUSY;
        }
        shared.library.multi_threaded = Some(multi_threaded);
        OK
    }

    fn lib_config_page_size(&self, page_size: c_int) -> c_int {
        let valid = u32::try_from(page_size)
            .ok()
            .filter(|size| size.is_power_of_two() && (512..=65536).contains(size));
        let Some(size) = valid else {
            return INVALID;
        };
        self.shared.lock().library.page_size = Some(size);
        OK
    }

    fn lib_init(&self) -> c_int {
        self.shared.lock().library.inits += 1;
        OK
    }

    fn lib_shutdown(&self) -> c_int {
        self.shared.lock().library.shutdowns += 1;
        OK
    }

    fn lib_is_threadsafe(&self) -> c_int {
        1
    }

    fn lib_version(&self) -> *const c_char {
        c"1.1.9".as_ptr()
    }

    fn lib_signature(&self) -> *const c_char {
        c"unqlite/1.1.9".as_ptr()
    }

    fn lib_ident(&self) -> *const c_char {
        c"unqlite:sim-reference-engine".as_ptr()
    }

    fn lib_copyright(&self) -> *const c_char {
        c"reference engine for tests".as_ptr()
    }
}
