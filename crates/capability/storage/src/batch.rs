//! 批量操作的逐项结果

use crate::error::StorageError;

/// 单项结果：输入键 + 该项的执行结果。
#[derive(Debug)]
pub struct ItemOutcome<T> {
    pub key: String,
    pub result: Result<T, StorageError>,
}

/// 批量操作结果，按输入顺序每项一条。
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub items: Vec<ItemOutcome<T>>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, result: Result<T, StorageError>) {
        self.items.push(ItemOutcome {
            key: key.into(),
            result,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 所有项均成功（空批次视为成功）。
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|item| item.result.is_ok())
    }

    /// 所有项均失败（空批次不算失败）。
    pub fn all_failed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.result.is_err())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StorageError)> {
        self.items.iter().filter_map(|item| match &item.result {
            Err(err) => Some((item.key.as_str(), err)),
            Ok(_) => None,
        })
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().filter_map(|item| match &item.result {
            Ok(value) => Some((item.key.as_str(), value)),
            Err(_) => None,
        })
    }
}
