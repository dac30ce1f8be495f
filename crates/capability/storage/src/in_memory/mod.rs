//! 内存存储实现模块
//!
//! 仅用于测试，语义与 Postgres 实现保持一致。
//!
//! 包含以下实现：
//! - DeviceServiceStore / DeviceProfileStore / DeviceStore / ProvisionWatcherStore
//! - EventStore / ReadingStore: InMemoryTelemetryStore
//! - KvStore: InMemoryKvStore

pub mod document;
pub mod keeper;
pub mod metadata;
pub mod telemetry;

pub use document::{DocumentTable, json_contains};
pub use keeper::*;
pub use metadata::*;
pub use telemetry::*;

use crate::error::StorageError;
use crate::postgres::document::ensure_page;
use crate::sql;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poison| poison.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poison| poison.into_inner())
}

/// 按 `offset`/`limit`（`-1` 不限制）截取，偏移越界返回 EntityDoesNotExist。
fn page<T>(items: Vec<T>, offset: i64, limit: i64, kind: &str) -> Result<Vec<T>, StorageError> {
    let (offset, limit) = sql::normalize_pagination(offset, limit);
    let items = items
        .into_iter()
        .skip(offset as usize)
        .take(limit.map_or(usize::MAX, |limit| limit as usize))
        .collect();
    ensure_page(items, offset, kind)
}
