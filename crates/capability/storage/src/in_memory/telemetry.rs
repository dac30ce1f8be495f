//! 事件与读数的内存存储实现
//!
//! 与 Postgres 实现相同的可见性规则：
//! - 设备信息行与事件都带逻辑删除标记，被标记的事件及其读数不再可见
//! - 物理删除由后台 `DeletionJob` 完成，随后清理已标记且不再被引用的设备信息行

use super::{page, read_lock, write_lock};
use crate::deletion::{DeletionJob, DeletionSummary};
use crate::device_info::{DeviceInfo, DeviceInfoCache, DeviceInfoStore};
use crate::error::StorageError;
use crate::models::AggregateFilter;
use crate::numeric::{
    aggregate_value_type, decode_aggregate, decode_numeric, encode_numeric, parse_numeric,
    value_type_from_tag,
};
use crate::postgres::telemetry::{now_nanos, parse_id, parse_or_generate};
use crate::sql;
use crate::traits::{EventStore, ReadingStore};
use bigdecimal::BigDecimal;
use domain::{AggregateFunc, Event, Reading, ReadingValue};
use edge_telemetry::SharedLogger;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct InfoRow {
    info: DeviceInfo,
    mark_deleted: bool,
}

#[derive(Debug)]
struct StoredEvent {
    event: Event,
    info_id: i32,
    reading_info_ids: Vec<i32>,
    mark_deleted: bool,
}

impl StoredEvent {
    fn referenced_infos(&self) -> impl Iterator<Item = i32> + '_ {
        std::iter::once(self.info_id).chain(self.reading_info_ids.iter().copied())
    }
}

#[derive(Debug, Default)]
struct TelemetryState {
    device_infos: HashMap<i32, InfoRow>,
    next_info_id: i32,
    events: Vec<StoredEvent>,
}

/// 简单读数声明为数值类型时按数值解析，数值统一规范到声明类型。
fn normalize_reading(reading: &mut Reading) -> Result<(), StorageError> {
    let value = match &reading.value {
        ReadingValue::Simple(text) if reading.value_type.is_numeric() => {
            Some(parse_numeric(reading.value_type, text)?)
        }
        ReadingValue::Numeric(value) => Some(*value),
        _ => None,
    };
    if let Some(value) = value {
        let encoded = encode_numeric(reading.value_type, value)?;
        reading.value = ReadingValue::Numeric(decode_numeric(reading.value_type, &encoded)?);
    }
    Ok(())
}

/// 物理删除被标记且命中 `doomed` 的事件，再清理孤立的已标记设备信息行。
fn purge(
    state: &RwLock<TelemetryState>,
    cache: &DeviceInfoCache,
    mut candidates: Vec<i32>,
    doomed: impl Fn(&StoredEvent) -> bool,
) -> DeletionSummary {
    let mut summary = DeletionSummary::default();
    let mut state = write_lock(state);
    state.events.retain(|stored| {
        if !(stored.mark_deleted && doomed(stored)) {
            return true;
        }
        summary.events += 1;
        summary.readings += stored.event.readings.len() as u64;
        candidates.extend(stored.referenced_infos());
        false
    });

    let referenced: HashSet<i32> = state
        .events
        .iter()
        .flat_map(StoredEvent::referenced_infos)
        .collect();
    let orphans: Vec<i32> = state
        .device_infos
        .iter()
        .filter(|(id, row)| {
            row.mark_deleted && candidates.contains(*id) && !referenced.contains(*id)
        })
        .map(|(id, _)| *id)
        .collect();
    for id in &orphans {
        state.device_infos.remove(id);
    }
    drop(state);

    cache.remove_ids(&orphans);
    summary.device_infos = orphans.len() as u64;
    summary
}

fn in_range(origin: i64, start: i64, end: i64) -> bool {
    origin >= start && origin <= end
}

/// 事件与读数内存存储
#[derive(Clone)]
pub struct InMemoryTelemetryStore {
    state: Arc<RwLock<TelemetryState>>,
    cache: Arc<DeviceInfoCache>,
    logger: SharedLogger,
}

impl InMemoryTelemetryStore {
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            state: Arc::new(RwLock::new(TelemetryState::default())),
            cache: Arc::new(DeviceInfoCache::new()),
            logger,
        }
    }

    pub fn cache(&self) -> &Arc<DeviceInfoCache> {
        &self.cache
    }

    /// 设备信息行数（含已标记删除的）。
    pub fn device_info_count(&self) -> usize {
        read_lock(&self.state).device_infos.len()
    }

    /// 可见事件，按 origin 倒序。
    fn live_events(&self, predicate: impl Fn(&Event) -> bool) -> Vec<Event> {
        let state = read_lock(&self.state);
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|stored| !stored.mark_deleted && predicate(&stored.event))
            .map(|stored| stored.event.clone())
            .collect();
        events.sort_by(|a, b| b.origin.cmp(&a.origin));
        events
    }

    /// 可见读数，按 origin 倒序。
    fn live_readings(&self, predicate: impl Fn(&Reading) -> bool) -> Vec<Reading> {
        let state = read_lock(&self.state);
        let mut readings: Vec<Reading> = state
            .events
            .iter()
            .filter(|stored| !stored.mark_deleted)
            .flat_map(|stored| stored.event.readings.iter())
            .filter(|reading| predicate(reading))
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.origin.cmp(&a.origin));
        readings
    }

    fn soft_delete_device_infos(
        &self,
        matches: impl Fn(&DeviceInfo) -> bool,
        description: String,
    ) -> DeletionJob {
        let ids: Vec<i32> = {
            let mut state = write_lock(&self.state);
            let ids: Vec<i32> = state
                .device_infos
                .iter_mut()
                .filter(|(_, row)| !row.mark_deleted && matches(&row.info))
                .map(|(id, row)| {
                    row.mark_deleted = true;
                    *id
                })
                .collect();
            for stored in state.events.iter_mut() {
                if ids.contains(&stored.info_id) {
                    stored.mark_deleted = true;
                }
            }
            ids
        };
        self.cache.remove_ids(&ids);

        let state = self.state.clone();
        let cache = self.cache.clone();
        DeletionJob::spawn(self.logger.clone(), description, async move {
            let doomed = ids.clone();
            Ok(purge(&state, &cache, ids, |stored| {
                doomed.contains(&stored.info_id)
            }))
        })
    }
}

#[async_trait::async_trait]
impl DeviceInfoStore for InMemoryTelemetryStore {
    async fn find_device_info_id(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        read_lock(&self.state)
            .device_infos
            .iter()
            .find(|(_, row)| !row.mark_deleted && row.info == *info)
            .map(|(id, _)| *id)
            .ok_or_else(|| {
                StorageError::not_found(format!(
                    "device info for device {} resource {} does not exist",
                    info.device_name, info.resource_name
                ))
            })
    }

    async fn insert_device_info(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        let mut state = write_lock(&self.state);
        if let Some((id, _)) = state
            .device_infos
            .iter()
            .find(|(_, row)| !row.mark_deleted && row.info == *info)
        {
            return Ok(*id);
        }
        state.next_info_id += 1;
        let id = state.next_info_id;
        state.device_infos.insert(
            id,
            InfoRow {
                info: info.clone(),
                mark_deleted: false,
            },
        );
        Ok(id)
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryTelemetryStore {
    async fn add_event(&self, mut event: Event) -> Result<Event, StorageError> {
        parse_or_generate(&mut event.id, "event")?;
        for reading in event.readings.iter_mut() {
            parse_or_generate(&mut reading.id, "reading")?;
            normalize_reading(reading)?;
        }

        let info_id = self
            .cache
            .resolve(self, &DeviceInfo::for_event(&event))
            .await?;
        let mut reading_info_ids = Vec::with_capacity(event.readings.len());
        for reading in &event.readings {
            let info = DeviceInfo::for_reading(&event, reading);
            reading_info_ids.push(self.cache.resolve(self, &info).await?);
        }

        let mut state = write_lock(&self.state);
        if state.events.iter().any(|stored| stored.event.id == event.id) {
            return Err(StorageError::duplicate(format!(
                "event id {} already exists",
                event.id
            )));
        }
        state.events.push(StoredEvent {
            event: event.clone(),
            info_id,
            reading_info_ids,
            mark_deleted: false,
        });
        Ok(event)
    }

    async fn event_by_id(&self, id: &str) -> Result<Event, StorageError> {
        parse_id(id, "event")?;
        self.live_events(|event| event.id == id)
            .pop()
            .ok_or_else(|| StorageError::not_found(format!("event with id {id} does not exist")))
    }

    async fn all_events(&self, offset: i64, limit: i64) -> Result<Vec<Event>, StorageError> {
        page(self.live_events(|_| true), offset, limit, "event")
    }

    async fn events_by_device_name(
        &self,
        device_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        let events = self.live_events(|event| event.device_name == device_name);
        page(events, offset, limit, "event")
    }

    async fn events_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        sql::validate_time_range(start, end)?;
        let events = self.live_events(|event| in_range(event.origin, start, end));
        page(events, offset, limit, "event")
    }

    async fn event_total_count(&self) -> Result<u64, StorageError> {
        Ok(self.live_events(|_| true).len() as u64)
    }

    async fn event_count_by_device_name(&self, device_name: &str) -> Result<u64, StorageError> {
        Ok(self
            .live_events(|event| event.device_name == device_name)
            .len() as u64)
    }

    async fn event_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        Ok(self
            .live_events(|event| in_range(event.origin, start, end))
            .len() as u64)
    }

    async fn delete_event_by_id(&self, id: &str) -> Result<(), StorageError> {
        parse_id(id, "event")?;
        let mut state = write_lock(&self.state);
        let before = state.events.len();
        state.events.retain(|stored| stored.event.id != id);
        if state.events.len() == before {
            return Err(StorageError::not_found(format!(
                "event with id {id} does not exist"
            )));
        }
        Ok(())
    }

    async fn delete_events_by_device_name(
        &self,
        device_name: &str,
    ) -> Result<DeletionJob, StorageError> {
        Ok(self.soft_delete_device_infos(
            |info| info.device_name == device_name,
            format!("delete events of device {device_name}"),
        ))
    }

    async fn delete_events_by_device_name_and_source(
        &self,
        device_name: &str,
        source_name: &str,
    ) -> Result<DeletionJob, StorageError> {
        Ok(self.soft_delete_device_infos(
            |info| info.device_name == device_name && info.source_name == source_name,
            format!("delete events of device {device_name} source {source_name}"),
        ))
    }

    async fn delete_events_by_age(&self, age: i64) -> Result<DeletionJob, StorageError> {
        let expire = now_nanos().saturating_sub(age);
        let ids: Vec<String> = {
            let mut state = write_lock(&self.state);
            state
                .events
                .iter_mut()
                .filter(|stored| !stored.mark_deleted && stored.event.origin < expire)
                .map(|stored| {
                    stored.mark_deleted = true;
                    stored.event.id.clone()
                })
                .collect()
        };

        let state = self.state.clone();
        let cache = self.cache.clone();
        Ok(DeletionJob::spawn(
            self.logger.clone(),
            format!("delete events older than {age}ns"),
            async move {
                Ok(purge(&state, &cache, Vec::new(), |stored| {
                    ids.contains(&stored.event.id)
                }))
            },
        ))
    }
}

#[async_trait::async_trait]
impl ReadingStore for InMemoryTelemetryStore {
    async fn all_readings(&self, offset: i64, limit: i64) -> Result<Vec<Reading>, StorageError> {
        page(self.live_readings(|_| true), offset, limit, "reading")
    }

    async fn readings_by_resource_name(
        &self,
        resource_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let readings = self.live_readings(|reading| reading.resource_name == resource_name);
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_device_name(
        &self,
        device_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let readings = self.live_readings(|reading| reading.device_name == device_name);
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_device_name_and_resource_name(
        &self,
        device_name: &str,
        resource_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let readings = self.live_readings(|reading| {
            reading.device_name == device_name && reading.resource_name == resource_name
        });
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        sql::validate_time_range(start, end)?;
        let readings = self.live_readings(|reading| in_range(reading.origin, start, end));
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_device_name_and_time_range(
        &self,
        device_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        sql::validate_time_range(start, end)?;
        let readings = self.live_readings(|reading| {
            reading.device_name == device_name && in_range(reading.origin, start, end)
        });
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_resource_name_and_time_range(
        &self,
        resource_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        sql::validate_time_range(start, end)?;
        let readings = self.live_readings(|reading| {
            reading.resource_name == resource_name && in_range(reading.origin, start, end)
        });
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_device_name_and_resource_name_and_time_range(
        &self,
        device_name: &str,
        resource_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        sql::validate_time_range(start, end)?;
        let readings = self.live_readings(|reading| {
            reading.device_name == device_name
                && reading.resource_name == resource_name
                && in_range(reading.origin, start, end)
        });
        page(readings, offset, limit, "reading")
    }

    async fn readings_by_device_name_and_resource_names_and_time_range(
        &self,
        device_name: &str,
        resource_names: &[String],
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        sql::validate_time_range(start, end)?;
        let readings = self.live_readings(|reading| {
            reading.device_name == device_name
                && resource_names.contains(&reading.resource_name)
                && in_range(reading.origin, start, end)
        });
        page(readings, offset, limit, "reading")
    }

    async fn latest_reading_by_offset(&self, offset: u32) -> Result<Reading, StorageError> {
        self.live_readings(|_| true)
            .into_iter()
            .nth(offset as usize)
            .ok_or_else(|| StorageError::not_found(format!("no reading found at offset {offset}")))
    }

    async fn reading_total_count(&self) -> Result<u64, StorageError> {
        Ok(self.live_readings(|_| true).len() as u64)
    }

    async fn reading_count_by_device_name(&self, device_name: &str) -> Result<u64, StorageError> {
        Ok(self
            .live_readings(|reading| reading.device_name == device_name)
            .len() as u64)
    }

    async fn reading_count_by_resource_name(
        &self,
        resource_name: &str,
    ) -> Result<u64, StorageError> {
        Ok(self
            .live_readings(|reading| reading.resource_name == resource_name)
            .len() as u64)
    }

    async fn reading_count_by_device_name_and_resource_name(
        &self,
        device_name: &str,
        resource_name: &str,
    ) -> Result<u64, StorageError> {
        Ok(self
            .live_readings(|reading| {
                reading.device_name == device_name && reading.resource_name == resource_name
            })
            .len() as u64)
    }

    async fn reading_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        Ok(self
            .live_readings(|reading| in_range(reading.origin, start, end))
            .len() as u64)
    }

    async fn reading_count_by_device_name_and_time_range(
        &self,
        device_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        Ok(self
            .live_readings(|reading| {
                reading.device_name == device_name && in_range(reading.origin, start, end)
            })
            .len() as u64)
    }

    async fn reading_count_by_resource_name_and_time_range(
        &self,
        resource_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        Ok(self
            .live_readings(|reading| {
                reading.resource_name == resource_name && in_range(reading.origin, start, end)
            })
            .len() as u64)
    }

    async fn reading_count_by_device_name_and_resource_name_and_time_range(
        &self,
        device_name: &str,
        resource_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        Ok(self
            .live_readings(|reading| {
                reading.device_name == device_name
                    && reading.resource_name == resource_name
                    && in_range(reading.origin, start, end)
            })
            .len() as u64)
    }

    async fn reading_count_by_device_name_and_resource_names_and_time_range(
        &self,
        device_name: &str,
        resource_names: &[String],
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        Ok(self
            .live_readings(|reading| {
                reading.device_name == device_name
                    && resource_names.contains(&reading.resource_name)
                    && in_range(reading.origin, start, end)
            })
            .len() as u64)
    }

    async fn readings_aggregate(
        &self,
        func: AggregateFunc,
        filter: &AggregateFilter,
    ) -> Result<Vec<Reading>, StorageError> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            sql::validate_time_range(start, end)?;
        }
        let readings = self.live_readings(|reading| {
            matches!(reading.value, ReadingValue::Numeric(_))
                && filter
                    .device_name
                    .as_ref()
                    .is_none_or(|name| *name == reading.device_name)
                && filter
                    .resource_name
                    .as_ref()
                    .is_none_or(|name| *name == reading.resource_name)
                && filter.start.is_none_or(|start| reading.origin >= start)
                && filter.end.is_none_or(|end| reading.origin <= end)
        });

        // (设备, 资源, 描述文件, 值类型, 单位) → (数值, 最大 origin)
        let mut groups: BTreeMap<(String, String, String, &'static str, String), (Vec<BigDecimal>, i64)> =
            BTreeMap::new();
        for reading in readings {
            let ReadingValue::Numeric(value) = reading.value else {
                continue;
            };
            let encoded = encode_numeric(reading.value_type, value)?;
            let entry = groups
                .entry((
                    reading.device_name,
                    reading.resource_name,
                    reading.profile_name,
                    reading.value_type.as_str(),
                    reading.units,
                ))
                .or_insert_with(|| (Vec::new(), i64::MIN));
            entry.0.push(encoded);
            entry.1 = entry.1.max(reading.origin);
        }

        let mut results = Vec::with_capacity(groups.len());
        for ((device_name, resource_name, profile_name, value_type, units), (values, origin)) in
            groups
        {
            let value_type = value_type_from_tag(value_type)?;
            let count = BigDecimal::from(values.len() as u64);
            let sum = || {
                values
                    .iter()
                    .fold(BigDecimal::from(0), |total, value| total + value)
            };
            let aggregate = match func {
                AggregateFunc::Count => count,
                AggregateFunc::Sum => sum(),
                AggregateFunc::Avg => sum() / count,
                AggregateFunc::Min => values.iter().min().cloned().unwrap_or_default(),
                AggregateFunc::Max => values.iter().max().cloned().unwrap_or_default(),
            };
            let mut reading = Reading::numeric(
                device_name,
                profile_name,
                resource_name,
                aggregate_value_type(func, value_type)?,
                decode_aggregate(func, value_type, &aggregate)?,
                origin,
            );
            reading.units = units;
            results.push(reading);
        }
        Ok(results)
    }
}
