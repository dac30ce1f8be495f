//! 设备层级树
//!
//! 从给定父设备名开始逐层向下取子设备，结果顺序为：本层全部设备，随后依次是每个设备的子树。
//! `levels <= 0` 表示不限层数。先取完整结果集得到总数，再按 offset/limit 截取。

use crate::error::StorageError;
use domain::Device;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

type SubtreeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Device>, StorageError>> + Send + 'a>>;

/// 按父设备名取一层子设备（可叠加标签过滤）。
#[async_trait::async_trait]
pub trait DeviceLevels: Send + Sync {
    async fn child_devices(
        &self,
        parent: &str,
        labels: &[String],
    ) -> Result<Vec<Device>, StorageError>;
}

/// 查询设备树，返回 `(总数, 当前页)`。
pub async fn device_tree<S: DeviceLevels + ?Sized>(
    source: &S,
    parent: &str,
    levels: i64,
    offset: i64,
    limit: i64,
    labels: &[String],
) -> Result<(u64, Vec<Device>), StorageError> {
    let levels = if levels <= 0 {
        usize::MAX
    } else {
        levels as usize
    };
    let mut visited = HashSet::from([parent.to_string()]);
    let devices = subtree(source, parent.to_string(), levels, labels, &mut visited).await?;
    Ok(page_tree(devices, offset, limit))
}

fn subtree<'a, S: DeviceLevels + ?Sized>(
    source: &'a S,
    parent: String,
    levels: usize,
    labels: &'a [String],
    visited: &'a mut HashSet<String>,
) -> SubtreeFuture<'a> {
    Box::pin(async move {
        if levels == 0 {
            return Ok(Vec::new());
        }
        let mut devices = source.child_devices(&parent, labels).await?;
        if levels == 1 {
            return Ok(devices);
        }
        let mut below = Vec::new();
        for device in &devices {
            // 自身为父或成环
            if !visited.insert(device.name.clone()) {
                return Err(StorageError::database(format!(
                    "device {} is its own ancestor, stopping tree query",
                    device.name
                )));
            }
            below.extend(subtree(source, device.name.clone(), levels - 1, labels, visited).await?);
        }
        devices.extend(below);
        Ok(devices)
    })
}

/// offset 超出结果集时返回空页（不报错）；limit 不大于 0 表示不限制。
pub fn page_tree(devices: Vec<Device>, offset: i64, limit: i64) -> (u64, Vec<Device>) {
    let total = devices.len();
    let offset = offset.max(0) as usize;
    if offset >= total {
        return (total as u64, Vec::new());
    }
    let mut count = total - offset;
    if limit > 0 && (limit as usize) < count {
        count = limit as usize;
    }
    let page = devices.into_iter().skip(offset).take(count).collect();
    (total as u64, page)
}
