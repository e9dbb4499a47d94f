//! The engine trait: one method per native primitive.

use crate::types::{KvInt64, RawDb};
use std::os::raw::{c_char, c_int, c_uint, c_void};

/// A native key-value engine reachable through the C ABI.
///
/// Every method maps one-to-one onto an engine entry point and keeps its
/// raw signature: pointers, `int` key lengths, 64-bit data lengths and
/// integer result codes. The variadic `config` entry points are split into
/// one typed method per verb that this workspace uses.
///
/// # Implementors
///
/// - `NativeEngine` (feature `native`) - the system library
/// - `kvbridge_testkit::SimEngine` - an in-process reference engine
///
/// # Safety contract
///
/// Callers pass pointers that are valid for the duration of the call only.
/// Implementations must not retain key or data pointers after returning.
/// Strings returned through out-pointers stay valid until the next call on
/// the same handle, or for the process lifetime for the `lib_*` strings.
pub trait Engine {
    /// Opens a database and writes the new handle to `out_db`.
    ///
    /// # Safety
    ///
    /// - `out_db` must be valid for writes
    /// - `path` must be a valid null-terminated string
    unsafe fn open(&self, out_db: *mut *mut RawDb, path: *const c_char, mode: c_uint) -> c_int;

    /// Closes a database, committing what the engine still holds.
    ///
    /// # Safety
    ///
    /// `db` must be a live handle from [`Engine::open`]; it is invalid afterwards.
    unsafe fn close(&self, db: *mut RawDb) -> c_int;

    /// Stores a record, overwriting any previous value.
    ///
    /// # Safety
    ///
    /// - `db` must be a live handle
    /// - `key` must be valid for `key_len` bytes
    /// - `data` must be valid for `data_len` bytes
    unsafe fn kv_store(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int;

    /// Appends to a record, creating it if missing.
    ///
    /// # Safety
    ///
    /// Same requirements as [`Engine::kv_store`].
    unsafe fn kv_append(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int;

    /// Fetches a record.
    ///
    /// With a null `buf`, only the record length is written to `buf_len`.
    /// Otherwise at most `*buf_len` bytes are copied into `buf` and `buf_len`
    /// receives the number of bytes written.
    ///
    /// # Safety
    ///
    /// - `db` must be a live handle
    /// - `key` must be valid for `key_len` bytes
    /// - `buf_len` must be valid for reads and writes
    /// - `buf` must be null or valid for `*buf_len` bytes of writes
    unsafe fn kv_fetch(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        buf: *mut c_void,
        buf_len: *mut KvInt64,
    ) -> c_int;

    /// Deletes a record.
    ///
    /// # Safety
    ///
    /// - `db` must be a live handle
    /// - `key` must be valid for `key_len` bytes
    unsafe fn kv_delete(&self, db: *mut RawDb, key: *const c_void, key_len: c_int) -> c_int;

    /// Starts a write transaction.
    ///
    /// # Safety
    ///
    /// `db` must be a live handle.
    unsafe fn begin(&self, db: *mut RawDb) -> c_int;

    /// Commits pending changes.
    ///
    /// # Safety
    ///
    /// `db` must be a live handle.
    unsafe fn commit(&self, db: *mut RawDb) -> c_int;

    /// Discards pending changes.
    ///
    /// # Safety
    ///
    /// `db` must be a live handle.
    unsafe fn rollback(&self, db: *mut RawDb) -> c_int;

    /// Reads the database error log (`CONFIG_ERR_LOG`).
    ///
    /// # Safety
    ///
    /// - `db` must be a live handle
    /// - `out_log` and `out_len` must be valid for writes
    unsafe fn config_err_log(
        &self,
        db: *mut RawDb,
        out_log: *mut *const c_char,
        out_len: *mut c_int,
    ) -> c_int;

    /// Sets the maximum number of cached pages (`CONFIG_MAX_PAGE_CACHE`).
    ///
    /// # Safety
    ///
    /// `db` must be a live handle.
    unsafe fn config_max_page_cache(&self, db: *mut RawDb, max_pages: c_int) -> c_int;

    /// Disables the engine's commit-on-close (`CONFIG_DISABLE_AUTO_COMMIT`).
    ///
    /// # Safety
    ///
    /// `db` must be a live handle.
    unsafe fn config_disable_auto_commit(&self, db: *mut RawDb) -> c_int;

    /// Reads the storage engine name (`CONFIG_GET_KV_NAME`).
    ///
    /// # Safety
    ///
    /// - `db` must be a live handle
    /// - `out_name` must be valid for writes
    unsafe fn config_kv_name(&self, db: *mut RawDb, out_name: *mut *const c_char) -> c_int;

    /// Selects single- or multi-threaded operation, process-wide.
    fn lib_config_thread_level(&self, multi_threaded: bool) -> c_int;

    /// Sets the default page size, process-wide.
    fn lib_config_page_size(&self, page_size: c_int) -> c_int;

    /// Initializes the library.
    fn lib_init(&self) -> c_int;

    /// Releases all library resources.
    fn lib_shutdown(&self) -> c_int;

    /// Returns non-zero if the library was built thread-safe.
    fn lib_is_threadsafe(&self) -> c_int;

    /// Returns the library version string.
    fn lib_version(&self) -> *const c_char;

    /// Returns the library signature string.
    fn lib_signature(&self) -> *const c_char;

    /// Returns the storage engine identification string.
    fn lib_ident(&self) -> *const c_char;

    /// Returns the copyright notice.
    fn lib_copyright(&self) -> *const c_char;
}
