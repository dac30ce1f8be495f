//! Postgres 遥测存储实现：事件与读数
//!
//! 写入路径：
//! 1. 逐条读数分类（二进制 / 对象 / 简单 / 数值）并编码，无法表示的数值直接失败
//! 2. 通过设备信息缓存解析事件与各读数的代理键
//! 3. 单事务：插入事件行，读数经 `COPY ... FROM STDIN` 批量写入
//!
//! 查询一律走 `live_event` / `live_reading` 视图，逻辑删除的数据不可见。
//!
//! 按设备/数据源/时间删除分两阶段：调用内同步打上 `mark_deleted`，
//! 随后由后台任务物理删除读数、事件与孤立的设备信息行。

use super::document::ensure_page;
use crate::copy::{CsvEncoder, CsvField, copy_statement};
use crate::deletion::{DeletionJob, DeletionSummary};
use crate::device_info::{DeviceInfo, DeviceInfoCache, DeviceInfoStore};
use crate::error::StorageError;
use crate::models::AggregateFilter;
use crate::numeric::{
    aggregate_value_type, decode_aggregate, decode_numeric, encode_numeric, parse_numeric,
    value_type_from_tag,
};
use crate::sql;
use crate::traits::{EventStore, ReadingStore};
use bigdecimal::BigDecimal;
use domain::{AggregateFunc, Event, Reading, ReadingValue, Tags};
use edge_telemetry::SharedLogger;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const DEVICE_INFO_TABLE: &str = "core_data.device_info";
pub const EVENT_TABLE: &str = "core_data.event";
pub const READING_TABLE: &str = "core_data.reading";
pub const LIVE_EVENT_VIEW: &str = "core_data.live_event";
pub const LIVE_READING_VIEW: &str = "core_data.live_reading";

const ORIGIN_COL: &str = "origin";
const DEVICE_NAME_COL: &str = "devicename";
const SOURCE_NAME_COL: &str = "sourcename";
const RESOURCE_NAME_COL: &str = "resourcename";

const DEVICE_INFO_COLS: [&str; 8] = [
    "devicename",
    "profilename",
    "sourcename",
    "resourcename",
    "valuetype",
    "units",
    "mediatype",
    "tags",
];

const EVENT_INSERT_COLS: [&str; 3] = ["id", "device_info_id", "origin"];

const EVENT_FIELDS: [&str; 6] = [
    "id",
    "origin",
    "devicename",
    "profilename",
    "sourcename",
    "tags",
];

const READING_FIELDS: [&str; 14] = [
    "id",
    "event_id",
    "origin",
    "value",
    "numeric_value",
    "binaryvalue",
    "objectvalue",
    "devicename",
    "profilename",
    "resourcename",
    "valuetype",
    "units",
    "mediatype",
    "tags",
];

const READING_COPY_COLS: [&str; 8] = [
    "id",
    "event_id",
    "device_info_id",
    "origin",
    "value",
    "numeric_value",
    "binaryvalue",
    "objectvalue",
];

/// 位置参数。
#[derive(Debug, Clone, Copy)]
enum Param<'a> {
    Text(&'a str),
    Int(i64),
    Limit(Option<i64>),
    Texts(&'a [String]),
}

fn bind_all<'q>(statement: &'q str, params: &[Param<'q>]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(statement);
    for param in params {
        query = match *param {
            Param::Text(value) => query.bind(value),
            Param::Int(value) => query.bind(value),
            Param::Limit(value) => query.bind(value),
            Param::Texts(value) => query.bind(value),
        };
    }
    query
}

/// 编码后的一条读数，等待写入。
struct EncodedReading {
    id: Uuid,
    origin: i64,
    info: DeviceInfo,
    text: Option<String>,
    numeric: Option<BigDecimal>,
    binary: Option<Vec<u8>>,
    object: Option<Value>,
}

pub(crate) fn parse_or_generate(id: &mut String, kind: &str) -> Result<Uuid, StorageError> {
    if id.is_empty() {
        let generated = Uuid::new_v4();
        *id = generated.to_string();
        return Ok(generated);
    }
    Uuid::parse_str(id).map_err(|err| {
        StorageError::invalid(format!("invalid {kind} id {id}")).with_source(err)
    })
}

pub(crate) fn parse_id(id: &str, kind: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(id).map_err(|err| {
        StorageError::invalid(format!("invalid {kind} id {id}")).with_source(err)
    })
}

fn encode_reading(id: Uuid, event: &Event, reading: &Reading) -> Result<EncodedReading, StorageError> {
    let mut encoded = EncodedReading {
        id,
        origin: reading.origin,
        info: DeviceInfo::for_reading(event, reading),
        text: None,
        numeric: None,
        binary: None,
        object: None,
    };
    match &reading.value {
        ReadingValue::Null => {}
        ReadingValue::Simple(text) if reading.value_type.is_numeric() => {
            let value = parse_numeric(reading.value_type, text)?;
            encoded.numeric = Some(encode_numeric(reading.value_type, value)?);
        }
        ReadingValue::Simple(text) => encoded.text = Some(text.clone()),
        ReadingValue::Numeric(value) => {
            encoded.numeric = Some(encode_numeric(reading.value_type, *value)?);
        }
        ReadingValue::Binary { data, .. } => encoded.binary = Some(data.clone()),
        ReadingValue::Object(value) => encoded.object = Some(value.clone()),
    }
    Ok(encoded)
}

fn decode_event(row: &PgRow) -> Result<Event, StorageError> {
    let id: Uuid = row.try_get("id")?;
    let tags: Json<Tags> = row.try_get("tags")?;
    Ok(Event {
        id: id.to_string(),
        device_name: row.try_get("devicename")?,
        profile_name: row.try_get("profilename")?,
        source_name: row.try_get("sourcename")?,
        origin: row.try_get(ORIGIN_COL)?,
        tags: tags.0,
        readings: Vec::new(),
    })
}

/// 解码读数行，同时返回所属事件 id。
fn decode_reading(row: &PgRow) -> Result<(Uuid, Reading), StorageError> {
    let id: Uuid = row.try_get("id")?;
    let event_id: Uuid = row.try_get("event_id")?;
    let value_type_tag: String = row.try_get("valuetype")?;
    let value_type = value_type_from_tag(&value_type_tag)?;
    let media_type: String = row.try_get("mediatype")?;
    let binary: Option<Vec<u8>> = row.try_get("binaryvalue")?;
    let object: Option<Value> = row.try_get("objectvalue")?;
    let numeric: Option<BigDecimal> = row.try_get("numeric_value")?;
    let text: Option<String> = row.try_get("value")?;

    let value = if let Some(data) = binary {
        ReadingValue::Binary { media_type, data }
    } else if let Some(object) = object {
        ReadingValue::Object(object)
    } else if let Some(numeric) = numeric {
        ReadingValue::Numeric(decode_numeric(value_type, &numeric)?)
    } else if let Some(text) = text {
        ReadingValue::Simple(text)
    } else {
        ReadingValue::Null
    };

    let tags: Json<Tags> = row.try_get("tags")?;
    Ok((
        event_id,
        Reading {
            id: id.to_string(),
            origin: row.try_get(ORIGIN_COL)?,
            device_name: row.try_get("devicename")?,
            resource_name: row.try_get("resourcename")?,
            profile_name: row.try_get("profilename")?,
            value_type,
            units: row.try_get("units")?,
            tags: tags.0,
            value,
        },
    ))
}

/// 物理删除的范围。
enum PurgeScope {
    /// 已逻辑删除的设备信息行及其全部事件
    DeviceInfos(Vec<i32>),
    /// 已逻辑删除的事件
    Events(Vec<Uuid>),
}

/// 物理删除读数 → 事件 → 已逻辑删除且不再被引用的设备信息行。
async fn purge(
    pool: PgPool,
    cache: Arc<DeviceInfoCache>,
    scope: PurgeScope,
) -> Result<DeletionSummary, StorageError> {
    let mut tx = pool.begin().await?;
    let (mut candidates, reading_rows, event_rows) = match scope {
        PurgeScope::DeviceInfos(ids) => {
            let readings = sqlx::query(&format!(
                "DELETE FROM {READING_TABLE} WHERE event_id IN \
                 (SELECT id FROM {EVENT_TABLE} WHERE device_info_id = ANY ($1)) \
                 RETURNING device_info_id"
            ))
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
            let events = sqlx::query(&format!(
                "DELETE FROM {EVENT_TABLE} WHERE device_info_id = ANY ($1) RETURNING device_info_id"
            ))
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
            (ids, readings, events)
        }
        PurgeScope::Events(ids) => {
            let readings = sqlx::query(&format!(
                "DELETE FROM {READING_TABLE} WHERE event_id = ANY ($1) RETURNING device_info_id"
            ))
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
            let events = sqlx::query(&format!(
                "DELETE FROM {EVENT_TABLE} WHERE id = ANY ($1) RETURNING device_info_id"
            ))
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
            (Vec::new(), readings, events)
        }
    };
    for row in reading_rows.iter().chain(event_rows.iter()) {
        candidates.push(row.try_get("device_info_id")?);
    }
    candidates.sort_unstable();
    candidates.dedup();

    let orphans: Vec<i32> = sqlx::query(&format!(
        "DELETE FROM {DEVICE_INFO_TABLE} d WHERE d.id = ANY ($1) AND d.mark_deleted \
         AND NOT EXISTS (SELECT 1 FROM {EVENT_TABLE} e WHERE e.device_info_id = d.id) \
         AND NOT EXISTS (SELECT 1 FROM {READING_TABLE} r WHERE r.device_info_id = d.id) \
         RETURNING d.id"
    ))
    .bind(&candidates)
    .fetch_all(&mut *tx)
    .await?
    .iter()
    .map(|row| row.try_get::<i32, _>("id"))
    .collect::<Result<_, _>>()?;
    tx.commit().await?;

    cache.remove_ids(&orphans);
    Ok(DeletionSummary {
        readings: reading_rows.len() as u64,
        events: event_rows.len() as u64,
        device_infos: orphans.len() as u64,
    })
}

pub(crate) fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

/// 事件与读数存储。
///
/// 同一进程内的多个实例应共享一个 `DeviceInfoCache`。
#[derive(Clone)]
pub struct PgTelemetryStore {
    pub pool: PgPool,
    cache: Arc<DeviceInfoCache>,
    logger: SharedLogger,
}

impl PgTelemetryStore {
    pub fn new(pool: PgPool, logger: SharedLogger) -> Self {
        Self::with_cache(pool, Arc::new(DeviceInfoCache::new()), logger)
    }

    pub fn with_cache(pool: PgPool, cache: Arc<DeviceInfoCache>, logger: SharedLogger) -> Self {
        Self {
            pool,
            cache,
            logger,
        }
    }

    pub fn cache(&self) -> &Arc<DeviceInfoCache> {
        &self.cache
    }

    async fn resolve(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        self.cache.resolve(self, info).await
    }

    async fn attach_readings(&self, mut events: Vec<Event>) -> Result<Vec<Event>, StorageError> {
        if events.is_empty() {
            return Ok(events);
        }
        let ids = events
            .iter()
            .map(|event| parse_id(&event.id, "event"))
            .collect::<Result<Vec<_>, _>>()?;
        let statement = format!(
            "SELECT {} FROM {LIVE_READING_VIEW} WHERE event_id = ANY ($1) ORDER BY {ORIGIN_COL}",
            READING_FIELDS.join(", ")
        );
        let rows = sqlx::query(&statement)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        let mut grouped: HashMap<Uuid, Vec<Reading>> = HashMap::new();
        for row in &rows {
            let (event_id, reading) = decode_reading(row)?;
            grouped.entry(event_id).or_default().push(reading);
        }
        for (event, id) in events.iter_mut().zip(ids) {
            event.readings = grouped.remove(&id).unwrap_or_default();
        }
        Ok(events)
    }

    async fn paged_events(
        &self,
        statement: String,
        mut params: Vec<Param<'_>>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        let (offset, limit) = sql::normalize_pagination(offset, limit);
        params.push(Param::Int(offset));
        params.push(Param::Limit(limit));
        let rows = bind_all(&statement, &params).fetch_all(&self.pool).await?;
        let events = rows.iter().map(decode_event).collect::<Result<Vec<_>, _>>()?;
        let events = ensure_page(events, offset, "event")?;
        self.attach_readings(events).await
    }

    async fn paged_readings(
        &self,
        statement: String,
        mut params: Vec<Param<'_>>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let (offset, limit) = sql::normalize_pagination(offset, limit);
        params.push(Param::Int(offset));
        params.push(Param::Limit(limit));
        let rows = bind_all(&statement, &params).fetch_all(&self.pool).await?;
        let readings = rows
            .iter()
            .map(|row| decode_reading(row).map(|(_, reading)| reading))
            .collect::<Result<Vec<_>, _>>()?;
        ensure_page(readings, offset, "reading")
    }

    async fn count(&self, statement: String, params: &[Param<'_>]) -> Result<u64, StorageError> {
        let count: i64 = bind_all(&statement, params)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count.max(0) as u64)
    }

    /// 逻辑删除匹配的设备信息行及其事件，驱逐缓存后启动物理删除。
    async fn soft_delete_device_infos(
        &self,
        columns: &[&str],
        values: &[&str],
        description: String,
    ) -> Result<DeletionJob, StorageError> {
        let statement = format!(
            "UPDATE {DEVICE_INFO_TABLE} SET mark_deleted = TRUE \
             WHERE {} AND NOT mark_deleted RETURNING id",
            sql::equality_condition(columns, 1)
        );
        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&statement);
        for value in values {
            query = query.bind(*value);
        }
        let ids: Vec<i32> = query
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get::<i32, _>("id"))
            .collect::<Result<_, _>>()?;
        sqlx::query(&format!(
            "UPDATE {EVENT_TABLE} SET mark_deleted = TRUE WHERE device_info_id = ANY ($1)"
        ))
        .bind(&ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        self.cache.remove_ids(&ids);

        Ok(DeletionJob::spawn(
            self.logger.clone(),
            description,
            purge(
                self.pool.clone(),
                self.cache.clone(),
                PurgeScope::DeviceInfos(ids),
            ),
        ))
    }
}

#[async_trait::async_trait]
impl DeviceInfoStore for PgTelemetryStore {
    async fn find_device_info_id(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        let statement = format!(
            "SELECT id FROM {DEVICE_INFO_TABLE} WHERE {} AND NOT mark_deleted LIMIT 1",
            sql::equality_condition(&DEVICE_INFO_COLS, 1)
        );
        let tags = serde_json::to_value(&info.tags)?;
        let row = sqlx::query(&statement)
            .bind(&info.device_name)
            .bind(&info.profile_name)
            .bind(&info.source_name)
            .bind(&info.resource_name)
            .bind(&info.value_type)
            .bind(&info.units)
            .bind(&info.media_type)
            .bind(&tags)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("id")?),
            None => Err(StorageError::not_found(format!(
                "device info for device {} resource {} does not exist",
                info.device_name, info.resource_name
            ))),
        }
    }

    async fn insert_device_info(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        let statement = format!(
            "{} RETURNING id",
            sql::insert_or_ignore(DEVICE_INFO_TABLE, &DEVICE_INFO_COLS)
        );
        let tags = serde_json::to_value(&info.tags)?;
        let row = sqlx::query(&statement)
            .bind(&info.device_name)
            .bind(&info.profile_name)
            .bind(&info.source_name)
            .bind(&info.resource_name)
            .bind(&info.value_type)
            .bind(&info.units)
            .bind(&info.media_type)
            .bind(&tags)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("id")?),
            // 并发写入者已插入同一元组
            None => self.find_device_info_id(info).await,
        }
    }
}

#[async_trait::async_trait]
impl EventStore for PgTelemetryStore {
    async fn add_event(&self, mut event: Event) -> Result<Event, StorageError> {
        let event_id = parse_or_generate(&mut event.id, "event")?;
        let mut reading_ids = Vec::with_capacity(event.readings.len());
        for reading in event.readings.iter_mut() {
            reading_ids.push(parse_or_generate(&mut reading.id, "reading")?);
        }
        let encoded = event
            .readings
            .iter()
            .zip(reading_ids)
            .map(|(reading, id)| encode_reading(id, &event, reading))
            .collect::<Result<Vec<_>, _>>()?;

        let event_info_id = self.resolve(&DeviceInfo::for_event(&event)).await?;
        let mut info_ids = Vec::with_capacity(encoded.len());
        for reading in &encoded {
            info_ids.push(self.resolve(&reading.info).await?);
        }

        let mut csv = CsvEncoder::new();
        let event_key = event_id.to_string();
        for (reading, info_id) in encoded.iter().zip(&info_ids) {
            let id = reading.id.to_string();
            csv.push_row(&[
                CsvField::Text(&id),
                CsvField::Text(&event_key),
                CsvField::Int(i64::from(*info_id)),
                CsvField::Int(reading.origin),
                reading.text.as_deref().map_or(CsvField::Null, CsvField::Text),
                reading.numeric.as_ref().map_or(CsvField::Null, CsvField::Numeric),
                reading.binary.as_deref().map_or(CsvField::Null, CsvField::Bytes),
                reading.object.as_ref().map_or(CsvField::Null, CsvField::Json),
            ]);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql::insert(EVENT_TABLE, &EVENT_INSERT_COLS))
            .bind(event_id)
            .bind(event_info_id)
            .bind(event.origin)
            .execute(&mut *tx)
            .await?;
        if !csv.is_empty() {
            let mut copy = tx
                .copy_in_raw(&copy_statement(READING_TABLE, &READING_COPY_COLS))
                .await?;
            let sent = copy.send(csv.into_bytes()).await.map(|_| ());
            match sent {
                Ok(()) => {
                    copy.finish().await?;
                }
                Err(err) => {
                    copy.abort(err.to_string()).await?;
                    return Err(StorageError::from(err).context("failed to copy readings"));
                }
            }
        }
        tx.commit().await?;
        Ok(event)
    }

    async fn event_by_id(&self, id: &str) -> Result<Event, StorageError> {
        let event_id = parse_id(id, "event")?;
        let row = sqlx::query(&sql::select_where(LIVE_EVENT_VIEW, &EVENT_FIELDS, &["id"]))
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Err(StorageError::not_found(format!(
                "event with id {id} does not exist"
            )));
        };
        let mut events = self.attach_readings(vec![decode_event(&row)?]).await?;
        events
            .pop()
            .ok_or_else(|| StorageError::not_found(format!("event with id {id} does not exist")))
    }

    async fn all_events(&self, offset: i64, limit: i64) -> Result<Vec<Event>, StorageError> {
        let statement =
            sql::select_where_paginated(LIVE_EVENT_VIEW, &EVENT_FIELDS, ORIGIN_COL, &[]);
        self.paged_events(statement, Vec::new(), offset, limit)
            .await
    }

    async fn events_by_device_name(
        &self,
        device_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        let statement = sql::select_where_paginated(
            LIVE_EVENT_VIEW,
            &EVENT_FIELDS,
            ORIGIN_COL,
            &[DEVICE_NAME_COL],
        );
        self.paged_events(statement, vec![Param::Text(device_name)], offset, limit)
            .await
    }

    async fn events_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        sql::validate_time_range(start, end)?;
        let statement = sql::select_by_time_range_paginated(
            LIVE_EVENT_VIEW,
            &EVENT_FIELDS,
            ORIGIN_COL,
            ORIGIN_COL,
            &[],
            &[],
        );
        self.paged_events(
            statement,
            vec![Param::Int(start), Param::Int(end)],
            offset,
            limit,
        )
        .await
    }

    async fn event_total_count(&self) -> Result<u64, StorageError> {
        self.count(sql::count(LIVE_EVENT_VIEW), &[]).await
    }

    async fn event_count_by_device_name(&self, device_name: &str) -> Result<u64, StorageError> {
        self.count(
            sql::count_where(LIVE_EVENT_VIEW, &[DEVICE_NAME_COL]),
            &[Param::Text(device_name)],
        )
        .await
    }

    async fn event_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        self.count(
            sql::count_by_time_range_cols(LIVE_EVENT_VIEW, ORIGIN_COL, &[], &[]),
            &[Param::Int(start), Param::Int(end)],
        )
        .await
    }

    async fn delete_event_by_id(&self, id: &str) -> Result<(), StorageError> {
        let event_id = parse_id(id, "event")?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql::delete_by_col(READING_TABLE, "event_id"))
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(&sql::delete_by_id(EVENT_TABLE))
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!(
                "event with id {id} does not exist"
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_events_by_device_name(
        &self,
        device_name: &str,
    ) -> Result<DeletionJob, StorageError> {
        self.soft_delete_device_infos(
            &[DEVICE_NAME_COL],
            &[device_name],
            format!("delete events of device {device_name}"),
        )
        .await
    }

    async fn delete_events_by_device_name_and_source(
        &self,
        device_name: &str,
        source_name: &str,
    ) -> Result<DeletionJob, StorageError> {
        self.soft_delete_device_infos(
            &[DEVICE_NAME_COL, SOURCE_NAME_COL],
            &[device_name, source_name],
            format!("delete events of device {device_name} source {source_name}"),
        )
        .await
    }

    async fn delete_events_by_age(&self, age: i64) -> Result<DeletionJob, StorageError> {
        let expire = now_nanos().saturating_sub(age);
        let ids: Vec<Uuid> = sqlx::query(&format!(
            "UPDATE {EVENT_TABLE} SET mark_deleted = TRUE \
             WHERE {ORIGIN_COL} < $1 AND NOT mark_deleted RETURNING id"
        ))
        .bind(expire)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| row.try_get::<Uuid, _>("id"))
        .collect::<Result<_, _>>()?;

        Ok(DeletionJob::spawn(
            self.logger.clone(),
            format!("delete events older than {age}ns"),
            purge(self.pool.clone(), self.cache.clone(), PurgeScope::Events(ids)),
        ))
    }
}

#[async_trait::async_trait]
impl ReadingStore for PgTelemetryStore {
    async fn all_readings(&self, offset: i64, limit: i64) -> Result<Vec<Reading>, StorageError> {
        let statement =
            sql::select_where_paginated(LIVE_READING_VIEW, &READING_FIELDS, ORIGIN_COL, &[]);
        self.paged_readings(statement, Vec::new(), offset, limit)
            .await
    }

    async fn readings_by_resource_name(
        &self,
        resource_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let statement = sql::select_where_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            &[RESOURCE_NAME_COL],
        );
        self.paged_readings(statement, vec![Param::Text(resource_name)], offset, limit)
            .await
    }

    async fn readings_by_device_name(
        &self,
        device_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let statement = sql::select_where_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            &[DEVICE_NAME_COL],
        );
        self.paged_readings(statement, vec![Param::Text(device_name)], offset, limit)
            .await
    }

    async fn readings_by_device_name_and_resource_name(
        &self,
        device_name: &str,
        resource_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        let statement = sql::select_where_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            &[DEVICE_NAME_COL, RESOURCE_NAME_COL],
        );
        self.paged_readings(
            statement,
            vec![Param::Text(device_name), Param::Text(resource_name)],
            offset,
            limit,
        )
        .await
    }

    async fn readings_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reading>, StorageError> {
        sql::validate_time_range(start, end)?;
        let statement = sql::select_by_time_range_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            ORIGIN_COL,
            &[],
            &[],
        );
        self.paged_readings(
            statement,
            vec![Param::Int(start), Param::Int(end)],
            offset,
            limit,
        )
        .await
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
        let statement = sql::select_by_time_range_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            ORIGIN_COL,
            &[],
            &[DEVICE_NAME_COL],
        );
        self.paged_readings(
            statement,
            vec![Param::Int(start), Param::Int(end), Param::Text(device_name)],
            offset,
            limit,
        )
        .await
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
        let statement = sql::select_by_time_range_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            ORIGIN_COL,
            &[],
            &[RESOURCE_NAME_COL],
        );
        self.paged_readings(
            statement,
            vec![Param::Int(start), Param::Int(end), Param::Text(resource_name)],
            offset,
            limit,
        )
        .await
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
        let statement = sql::select_by_time_range_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            ORIGIN_COL,
            &[],
            &[DEVICE_NAME_COL, RESOURCE_NAME_COL],
        );
        self.paged_readings(
            statement,
            vec![
                Param::Int(start),
                Param::Int(end),
                Param::Text(device_name),
                Param::Text(resource_name),
            ],
            offset,
            limit,
        )
        .await
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
        let statement = sql::select_by_time_range_paginated(
            LIVE_READING_VIEW,
            &READING_FIELDS,
            ORIGIN_COL,
            ORIGIN_COL,
            &[RESOURCE_NAME_COL],
            &[DEVICE_NAME_COL, RESOURCE_NAME_COL],
        );
        self.paged_readings(
            statement,
            vec![
                Param::Int(start),
                Param::Int(end),
                Param::Text(device_name),
                Param::Texts(resource_names),
            ],
            offset,
            limit,
        )
        .await
    }

    async fn latest_reading_by_offset(&self, offset: u32) -> Result<Reading, StorageError> {
        let statement = format!(
            "SELECT {} FROM {LIVE_READING_VIEW} {} OFFSET $1 LIMIT 1",
            READING_FIELDS.join(", "),
            sql::order_by_desc(ORIGIN_COL)
        );
        let row = sqlx::query(&statement)
            .bind(i64::from(offset))
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(decode_reading(&row)?.1),
            None => Err(StorageError::not_found(format!(
                "no reading found at offset {offset}"
            ))),
        }
    }

    async fn reading_total_count(&self) -> Result<u64, StorageError> {
        self.count(sql::count(LIVE_READING_VIEW), &[]).await
    }

    async fn reading_count_by_device_name(&self, device_name: &str) -> Result<u64, StorageError> {
        self.count(
            sql::count_where(LIVE_READING_VIEW, &[DEVICE_NAME_COL]),
            &[Param::Text(device_name)],
        )
        .await
    }

    async fn reading_count_by_resource_name(
        &self,
        resource_name: &str,
    ) -> Result<u64, StorageError> {
        self.count(
            sql::count_where(LIVE_READING_VIEW, &[RESOURCE_NAME_COL]),
            &[Param::Text(resource_name)],
        )
        .await
    }

    async fn reading_count_by_device_name_and_resource_name(
        &self,
        device_name: &str,
        resource_name: &str,
    ) -> Result<u64, StorageError> {
        self.count(
            sql::count_where(LIVE_READING_VIEW, &[DEVICE_NAME_COL, RESOURCE_NAME_COL]),
            &[Param::Text(device_name), Param::Text(resource_name)],
        )
        .await
    }

    async fn reading_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        self.count(
            sql::count_by_time_range_cols(LIVE_READING_VIEW, ORIGIN_COL, &[], &[]),
            &[Param::Int(start), Param::Int(end)],
        )
        .await
    }

    async fn reading_count_by_device_name_and_time_range(
        &self,
        device_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        self.count(
            sql::count_by_time_range_cols(LIVE_READING_VIEW, ORIGIN_COL, &[], &[DEVICE_NAME_COL]),
            &[Param::Int(start), Param::Int(end), Param::Text(device_name)],
        )
        .await
    }

    async fn reading_count_by_resource_name_and_time_range(
        &self,
        resource_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        self.count(
            sql::count_by_time_range_cols(LIVE_READING_VIEW, ORIGIN_COL, &[], &[RESOURCE_NAME_COL]),
            &[Param::Int(start), Param::Int(end), Param::Text(resource_name)],
        )
        .await
    }

    async fn reading_count_by_device_name_and_resource_name_and_time_range(
        &self,
        device_name: &str,
        resource_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        self.count(
            sql::count_by_time_range_cols(
                LIVE_READING_VIEW,
                ORIGIN_COL,
                &[],
                &[DEVICE_NAME_COL, RESOURCE_NAME_COL],
            ),
            &[
                Param::Int(start),
                Param::Int(end),
                Param::Text(device_name),
                Param::Text(resource_name),
            ],
        )
        .await
    }

    async fn reading_count_by_device_name_and_resource_names_and_time_range(
        &self,
        device_name: &str,
        resource_names: &[String],
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        self.count(
            sql::count_by_time_range_cols(
                LIVE_READING_VIEW,
                ORIGIN_COL,
                &[RESOURCE_NAME_COL],
                &[DEVICE_NAME_COL, RESOURCE_NAME_COL],
            ),
            &[
                Param::Int(start),
                Param::Int(end),
                Param::Text(device_name),
                Param::Texts(resource_names),
            ],
        )
        .await
    }

    async fn readings_aggregate(
        &self,
        func: AggregateFunc,
        filter: &AggregateFilter,
    ) -> Result<Vec<Reading>, StorageError> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            sql::validate_time_range(start, end)?;
        }
        let mut conditions = vec!["numeric_value IS NOT NULL".to_string()];
        let mut params = Vec::new();
        if let Some(device_name) = &filter.device_name {
            params.push(Param::Text(device_name));
            conditions.push(format!("{DEVICE_NAME_COL} = ${}", params.len()));
        }
        if let Some(resource_name) = &filter.resource_name {
            params.push(Param::Text(resource_name));
            conditions.push(format!("{RESOURCE_NAME_COL} = ${}", params.len()));
        }
        if let Some(start) = filter.start {
            params.push(Param::Int(start));
            conditions.push(format!("{ORIGIN_COL} >= ${}", params.len()));
        }
        if let Some(end) = filter.end {
            params.push(Param::Int(end));
            conditions.push(format!("{ORIGIN_COL} <= ${}", params.len()));
        }
        let group = "devicename, profilename, resourcename, valuetype, units";
        let statement = format!(
            "SELECT {group}, {}(numeric_value)::numeric AS agg, MAX({ORIGIN_COL}) AS {ORIGIN_COL} \
             FROM {LIVE_READING_VIEW} WHERE {} GROUP BY {group} ORDER BY devicename, resourcename",
            func.as_str(),
            conditions.join(" AND ")
        );
        let rows = bind_all(&statement, &params).fetch_all(&self.pool).await?;

        let mut readings = Vec::with_capacity(rows.len());
        for row in &rows {
            let value_type_tag: String = row.try_get("valuetype")?;
            let value_type = value_type_from_tag(&value_type_tag)?;
            let aggregate: BigDecimal = row.try_get("agg")?;
            let value = decode_aggregate(func, value_type, &aggregate)?;
            let mut reading = Reading::numeric(
                row.try_get::<String, _>("devicename")?,
                row.try_get::<String, _>("profilename")?,
                row.try_get::<String, _>("resourcename")?,
                aggregate_value_type(func, value_type)?,
                value,
                row.try_get(ORIGIN_COL)?,
            );
            reading.units = row.try_get("units")?;
            readings.push(reading);
        }
        Ok(readings)
    }
}
