//! Bindings to the system `unqlite` library.

use crate::constants::{
    CONFIG_DISABLE_AUTO_COMMIT, CONFIG_ERR_LOG, CONFIG_GET_KV_NAME, CONFIG_MAX_PAGE_CACHE,
    LIB_CONFIG_PAGE_SIZE, LIB_CONFIG_THREAD_LEVEL_MULTI, LIB_CONFIG_THREAD_LEVEL_SINGLE,
};
use crate::engine::Engine;
use crate::types::{KvInt64, RawDb};
use std::os::raw::{c_char, c_int, c_uint, c_void};

extern "C" {
    fn unqlite_open(pp_db: *mut *mut RawDb, filename: *const c_char, mode: c_uint) -> c_int;
    fn unqlite_close(db: *mut RawDb) -> c_int;
    fn unqlite_config(db: *mut RawDb, op: c_int, ...) -> c_int;

    fn unqlite_kv_store(
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int;
    fn unqlite_kv_append(
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int;
    fn unqlite_kv_fetch(
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        buf: *mut c_void,
        buf_len: *mut KvInt64,
    ) -> c_int;
    fn unqlite_kv_delete(db: *mut RawDb, key: *const c_void, key_len: c_int) -> c_int;

    fn unqlite_begin(db: *mut RawDb) -> c_int;
    fn unqlite_commit(db: *mut RawDb) -> c_int;
    fn unqlite_rollback(db: *mut RawDb) -> c_int;

    fn unqlite_lib_config(op: c_int, ...) -> c_int;
    fn unqlite_lib_init() -> c_int;
    fn unqlite_lib_shutdown() -> c_int;
    fn unqlite_lib_is_threadsafe() -> c_int;
    fn unqlite_lib_version() -> *const c_char;
    fn unqlite_lib_signature() -> *const c_char;
    fn unqlite_lib_ident() -> *const c_char;
    fn unqlite_lib_copyright() -> *const c_char;
}

/// The system engine, linked through the `native` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl Engine for NativeEngine {
    unsafe fn open(&self, out_db: *mut *mut RawDb, path: *const c_char, mode: c_uint) -> c_int {
        unqlite_open(out_db, path, mode)
    }

    unsafe fn close(&self, db: *mut RawDb) -> c_int {
        unqlite_close(db)
    }

    unsafe fn kv_store(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int {
        unqlite_kv_store(db, key, key_len, data, data_len)
    }

    unsafe fn kv_append(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        data: *const c_void,
        data_len: KvInt64,
    ) -> c_int {
        unqlite_kv_append(db, key, key_len, data, data_len)
    }

    unsafe fn kv_fetch(
        &self,
        db: *mut RawDb,
        key: *const c_void,
        key_len: c_int,
        buf: *mut c_void,
        buf_len: *mut KvInt64,
    ) -> c_int {
        unqlite_kv_fetch(db, key, key_len, buf, buf_len)
    }

    unsafe fn kv_delete(&self, db: *mut RawDb, key: *const c_void, key_len: c_int) -> c_int {
        unqlite_kv_delete(db, key, key_len)
    }

    unsafe fn begin(&self, db: *mut RawDb) -> c_int {
        unqlite_begin(db)
    }

    unsafe fn commit(&self, db: *mut RawDb) -> c_int {
        unqlite_commit(db)
    }

    unsafe fn rollback(&self, db: *mut RawDb) -> c_int {
        unqlite_rollback(db)
    }

    unsafe fn config_err_log(
        &self,
        db: *mut RawDb,
        out_log: *mut *const c_char,
        out_len: *mut c_int,
    ) -> c_int {
        unqlite_config(db, CONFIG_ERR_LOG, out_log, out_len)
    }

    unsafe fn config_max_page_cache(&self, db: *mut RawDb, max_pages: c_int) -> c_int {
        unqlite_config(db, CONFIG_MAX_PAGE_CACHE, max_pages)
    }

    unsafe fn config_disable_auto_commit(&self, db: *mut RawDb) -> c_int {
        unqlite_config(db, CONFIG_DISABLE_AUTO_COMMIT)
    }

    unsafe fn config_kv_name(&self, db: *mut RawDb, out_name: *mut *const c_char) -> c_int {
        unqlite_config(db, CONFIG_GET_KV_NAME, out_name)
    }

    fn lib_config_thread_level(&self, multi_threaded: bool) -> c_int {
        let op = if multi_threaded {
            LIB_CONFIG_THREAD_LEVEL_MULTI
        } else {
            LIB_CONFIG_THREAD_LEVEL_SINGLE
        };
        // SAFETY: the thread level verbs take no further arguments.
        unsafe { unqlite_lib_config(op) }
    }

    fn lib_config_page_size(&self, page_size: c_int) -> c_int {
        // SAFETY: the page size verb takes exactly one `int`.
        unsafe { unqlite_lib_config(LIB_CONFIG_PAGE_SIZE, page_size) }
    }

    fn lib_init(&self) -> c_int {
        // SAFETY: no arguments; the library guards against double init.
        unsafe { unqlite_lib_init() }
    }

    fn lib_shutdown(&self) -> c_int {
        // SAFETY: no arguments.
        unsafe { unqlite_lib_shutdown() }
    }

    fn lib_is_threadsafe(&self) -> c_int {
        // SAFETY: pure query.
        unsafe { unqlite_lib_is_threadsafe() }
    }

    fn lib_version(&self) -> *const c_char {
        // SAFETY: returns a pointer to a static string.
        unsafe { unqlite_lib_version() }
    }

    fn lib_signature(&self) -> *const c_char {
        // SAFETY: returns a pointer to a static string.
        unsafe { unqlite_lib_signature() }
    }

    fn lib_ident(&self) -> *const c_char {
        // SAFETY: returns a pointer to a static string.
        unsafe { unqlite_lib_ident() }
    }

    fn lib_copyright(&self) -> *const c_char {
        // SAFETY: returns a pointer to a static string.
        unsafe { unqlite_lib_copyright() }
    }
}
