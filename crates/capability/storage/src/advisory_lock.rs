//! Postgres 咨询锁
//!
//! 以服务标识的 FNV-1a 32 位哈希作为锁键，提供互斥锁与共享锁两组原语。
//! 会话级咨询锁绑定在获取它的连接上，因此加锁期间独占一个池连接，
//! 最后一把锁释放后连接归还连接池。
//!
//! `lock` / `lock_shared` 不等待：锁被其它会话持有时返回 `Ok(false)`。

use crate::error::StorageError;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row};
use tokio::sync::Mutex;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a 32 位哈希。
pub fn fnv1a_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// 服务标识对应的锁键（32 位哈希扩展到 i64）。
pub fn lock_key(service_key: &str) -> i64 {
    i64::from(fnv1a_32(service_key.as_bytes()))
}

#[derive(Default)]
struct LockState {
    conn: Option<PoolConnection<Postgres>>,
    exclusive: u32,
    shared: u32,
}

impl LockState {
    fn release_if_idle(&mut self) {
        if self.exclusive == 0 && self.shared == 0 {
            self.conn = None;
        }
    }
}

pub struct AdvisoryLock {
    pool: PgPool,
    service_key: String,
    key: i64,
    state: Mutex<LockState>,
}

impl AdvisoryLock {
    pub fn new(pool: PgPool, service_key: impl Into<String>) -> Self {
        let service_key = service_key.into();
        let key = lock_key(&service_key);
        Self {
            pool,
            service_key,
            key,
            state: Mutex::new(LockState::default()),
        }
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn service_key(&self) -> &str {
        &self.service_key
    }

    /// 尝试获取互斥锁。
    pub async fn lock(&self) -> Result<bool, StorageError> {
        self.acquire("SELECT pg_try_advisory_lock($1)", false).await
    }

    /// 尝试获取共享锁。
    pub async fn lock_shared(&self) -> Result<bool, StorageError> {
        self.acquire("SELECT pg_try_advisory_lock_shared($1)", true)
            .await
    }

    /// 释放互斥锁；本会话未持有时返回 `Ok(false)`。
    pub async fn unlock(&self) -> Result<bool, StorageError> {
        self.release("SELECT pg_advisory_unlock($1)", false).await
    }

    pub async fn unlock_shared(&self) -> Result<bool, StorageError> {
        self.release("SELECT pg_advisory_unlock_shared($1)", true)
            .await
    }

    async fn acquire(&self, statement: &str, shared: bool) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        if state.conn.is_none() {
            state.conn = Some(self.pool.acquire().await?);
        }
        let result = match state.conn.as_mut() {
            Some(conn) => query_bool(conn, statement, self.key).await,
            None => Err(StorageError::database("connection unavailable")),
        };
        match result {
            Ok(true) => {
                if shared {
                    state.shared += 1;
                } else {
                    state.exclusive += 1;
                }
                Ok(true)
            }
            Ok(false) => {
                state.release_if_idle();
                Ok(false)
            }
            Err(err) => {
                state.release_if_idle();
                Err(err.context(format!("advisory lock for {}", self.service_key)))
            }
        }
    }

    async fn release(&self, statement: &str, shared: bool) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        let held = if shared { state.shared } else { state.exclusive };
        if held == 0 {
            return Ok(false);
        }
        let result = match state.conn.as_mut() {
            Some(conn) => query_bool(conn, statement, self.key).await,
            None => Ok(false),
        };
        let released = result
            .map_err(|err| err.context(format!("advisory unlock for {}", self.service_key)))?;
        if released {
            if shared {
                state.shared -= 1;
            } else {
                state.exclusive -= 1;
            }
        }
        state.release_if_idle();
        Ok(released)
    }
}

async fn query_bool(
    conn: &mut PoolConnection<Postgres>,
    statement: &str,
    key: i64,
) -> Result<bool, StorageError> {
    let row = sqlx::query(statement)
        .bind(key)
        .fetch_one(&mut **conn)
        .await?;
    let value: bool = row.try_get(0)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn lock_key_is_non_negative() {
        assert!(lock_key("core-data") >= 0);
        assert_ne!(lock_key("core-data"), lock_key("core-metadata"));
    }
}
