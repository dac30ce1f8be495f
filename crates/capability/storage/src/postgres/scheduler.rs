//! Postgres 调度服务存储实现
//!
//! - 调度任务：文档型实体
//! - 动作执行记录：关系型表 `support_scheduler.record`，按 `created` 时间范围查询

use super::document::{
    self, NAME_COL, count_documents, document_by_id, document_by_name, documents,
    ensure_page, insert_document, labels_filter, update_document_by_name,
};
use crate::batch::BatchOutcome;
use crate::error::StorageError;
use crate::models::Document;
use crate::sql;
use crate::traits::{ScheduleActionRecordStore, ScheduleJobStore};
use domain::{ActionStatus, ScheduleActionRecord, ScheduleJob};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub const SCHEDULE_JOB_TABLE: &str = "support_scheduler.job";
pub const SCHEDULE_ACTION_RECORD_TABLE: &str = "support_scheduler.record";

const RECORD_FIELDS: [&str; 7] = [
    "id",
    "action_id",
    "job_name",
    "action",
    "status",
    "scheduled_at",
    "created",
];
const CREATED_COL: &str = "created";
const JOB_NAME_COL: &str = "job_name";
const STATUS_COL: &str = "status";

// ----------------------------------------------------------------------------
// 调度任务
// ----------------------------------------------------------------------------

pub struct PgScheduleJobStore {
    pub pool: PgPool,
}

impl PgScheduleJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ScheduleJobStore for PgScheduleJobStore {
    async fn add_schedule_job(&self, job: ScheduleJob) -> Result<ScheduleJob, StorageError> {
        insert_document(&self.pool, SCHEDULE_JOB_TABLE, job).await
    }

    async fn all_schedule_jobs(
        &self,
        offset: i64,
        limit: i64,
        labels: &[String],
    ) -> Result<Vec<ScheduleJob>, StorageError> {
        let filter = labels_filter(labels);
        documents(&self.pool, SCHEDULE_JOB_TABLE, filter.as_ref(), offset, limit).await
    }

    async fn update_schedule_job(&self, job: ScheduleJob) -> Result<(), StorageError> {
        update_document_by_name(&self.pool, SCHEDULE_JOB_TABLE, job).await
    }

    async fn delete_schedule_job_by_name(&self, name: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            SCHEDULE_JOB_TABLE,
            ScheduleJob::KIND,
            NAME_COL,
            name,
        )
        .await
    }

    async fn schedule_job_by_id(&self, id: &str) -> Result<ScheduleJob, StorageError> {
        document_by_id(&self.pool, SCHEDULE_JOB_TABLE, id).await
    }

    async fn schedule_job_by_name(&self, name: &str) -> Result<ScheduleJob, StorageError> {
        document_by_name(&self.pool, SCHEDULE_JOB_TABLE, name).await
    }

    async fn schedule_job_total_count(&self, labels: &[String]) -> Result<u64, StorageError> {
        let filter = labels_filter(labels);
        count_documents(&self.pool, SCHEDULE_JOB_TABLE, filter.as_ref()).await
    }
}

// ----------------------------------------------------------------------------
// 动作执行记录
// ----------------------------------------------------------------------------

pub struct PgScheduleActionRecordStore {
    pub pool: PgPool,
}

impl PgScheduleActionRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_record(
        &self,
        mut record: ScheduleActionRecord,
    ) -> Result<ScheduleActionRecord, StorageError> {
        let id = prepare_record(&mut record)?;
        sqlx::query(&sql::insert(SCHEDULE_ACTION_RECORD_TABLE, &RECORD_FIELDS))
            .bind(id)
            .bind(record.action_id())
            .bind(&record.job_name)
            .bind(&record.action)
            .bind(record.status.as_str())
            .bind(record.scheduled_at)
            .bind(record.created)
            .execute(&self.pool)
            .await?;
        Ok(record)
    }

    /// 时间范围 + 等值列的分页查询，参数顺序：start, end, 各列值, offset, limit。
    async fn records_in_range(
        &self,
        columns: &[&str],
        values: &[&str],
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError> {
        sql::validate_time_range(start, end)?;
        let (offset, limit) = sql::normalize_pagination(offset, limit);
        let statement = sql::select_by_time_range_paginated(
            SCHEDULE_ACTION_RECORD_TABLE,
            &RECORD_FIELDS,
            CREATED_COL,
            CREATED_COL,
            &[],
            columns,
        );
        let mut query = sqlx::query(&statement).bind(start).bind(end);
        for value in values {
            query = query.bind(*value);
        }
        let rows = query.bind(offset).bind(limit).fetch_all(&self.pool).await?;
        let records = rows.iter().map(decode_record).collect::<Result<Vec<_>, _>>()?;
        ensure_page(records, offset, "schedule action record")
    }

    async fn count_in_range(
        &self,
        columns: &[&str],
        values: &[&str],
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        sql::validate_time_range(start, end)?;
        let statement =
            sql::count_by_time_range_cols(SCHEDULE_ACTION_RECORD_TABLE, CREATED_COL, &[], columns);
        let mut query = sqlx::query(&statement).bind(start).bind(end);
        for value in values {
            query = query.bind(*value);
        }
        let count: i64 = query.fetch_one(&self.pool).await?.try_get(0)?;
        Ok(count.max(0) as u64)
    }
}

/// 补全 id 与 created，返回解析后的 UUID。
fn prepare_record(record: &mut ScheduleActionRecord) -> Result<Uuid, StorageError> {
    let id = if record.id.is_empty() {
        let id = Uuid::new_v4();
        record.id = id.to_string();
        id
    } else {
        Uuid::parse_str(&record.id).map_err(|err| {
            StorageError::invalid(format!("invalid schedule action record id {}", record.id))
                .with_source(err)
        })?
    };
    if record.created == 0 {
        record.created = domain::now_millis();
    }
    Ok(id)
}

fn decode_record(row: &PgRow) -> Result<ScheduleActionRecord, StorageError> {
    let id: Uuid = row.try_get("id")?;
    let status: String = row.try_get(STATUS_COL)?;
    let status = ActionStatus::parse(&status)
        .ok_or_else(|| StorageError::server(format!("unknown action status '{status}'")))?;
    let action: Value = row.try_get("action")?;
    Ok(ScheduleActionRecord {
        id: id.to_string(),
        job_name: row.try_get(JOB_NAME_COL)?,
        action,
        status,
        scheduled_at: row.try_get("scheduled_at")?,
        created: row.try_get(CREATED_COL)?,
    })
}

#[async_trait::async_trait]
impl ScheduleActionRecordStore for PgScheduleActionRecordStore {
    async fn add_schedule_action_record(
        &self,
        record: ScheduleActionRecord,
    ) -> Result<ScheduleActionRecord, StorageError> {
        self.insert_record(record).await
    }

    async fn add_schedule_action_records(
        &self,
        records: Vec<ScheduleActionRecord>,
    ) -> Result<BatchOutcome<ScheduleActionRecord>, StorageError> {
        let mut outcome = BatchOutcome::new();
        for mut record in records {
            let key = match prepare_record(&mut record) {
                Ok(_) => record.id.clone(),
                Err(err) => {
                    outcome.push(record.id.clone(), Err(err));
                    continue;
                }
            };
            outcome.push(key, self.insert_record(record).await);
        }
        Ok(outcome)
    }

    async fn all_schedule_action_records(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError> {
        self.records_in_range(&[], &[], start, end, offset, limit)
            .await
    }

    async fn latest_schedule_action_records_by_job_name(
        &self,
        job_name: &str,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError> {
        let fields = RECORD_FIELDS.join(", ");
        let statement = format!(
            "SELECT {fields} FROM (\
             SELECT {fields}, RANK() OVER (PARTITION BY job_name, action_id ORDER BY created DESC) AS rank \
             FROM {SCHEDULE_ACTION_RECORD_TABLE} WHERE {}) ranked \
             WHERE rank = 1 ORDER BY created DESC",
            sql::equality_condition(&[JOB_NAME_COL], 1)
        );
        let rows = sqlx::query(&statement)
            .bind(job_name)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_record).collect()
    }

    async fn latest_schedule_action_record_by_offset(
        &self,
        offset: u32,
    ) -> Result<ScheduleActionRecord, StorageError> {
        let statement = format!(
            "SELECT {} FROM {SCHEDULE_ACTION_RECORD_TABLE} {} OFFSET $1 LIMIT 1",
            RECORD_FIELDS.join(", "),
            sql::order_by_desc(CREATED_COL)
        );
        let row = sqlx::query(&statement)
            .bind(i64::from(offset))
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => decode_record(&row),
            None => Err(StorageError::not_found(format!(
                "no schedule action record found at offset {offset}"
            ))),
        }
    }

    async fn schedule_action_records_by_status(
        &self,
        status: ActionStatus,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError> {
        self.records_in_range(&[STATUS_COL], &[status.as_str()], start, end, offset, limit)
            .await
    }

    async fn schedule_action_records_by_job_name(
        &self,
        job_name: &str,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError> {
        self.records_in_range(&[JOB_NAME_COL], &[job_name], start, end, offset, limit)
            .await
    }

    async fn schedule_action_records_by_job_name_and_status(
        &self,
        job_name: &str,
        status: ActionStatus,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ScheduleActionRecord>, StorageError> {
        self.records_in_range(
            &[JOB_NAME_COL, STATUS_COL],
            &[job_name, status.as_str()],
            start,
            end,
            offset,
            limit,
        )
        .await
    }

    async fn schedule_action_record_total_count(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        self.count_in_range(&[], &[], start, end).await
    }

    async fn schedule_action_record_count_by_status(
        &self,
        status: ActionStatus,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        self.count_in_range(&[STATUS_COL], &[status.as_str()], start, end)
            .await
    }

    async fn schedule_action_record_count_by_job_name(
        &self,
        job_name: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        self.count_in_range(&[JOB_NAME_COL], &[job_name], start, end)
            .await
    }

    async fn schedule_action_record_count_by_job_name_and_status(
        &self,
        job_name: &str,
        status: ActionStatus,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        self.count_in_range(
            &[JOB_NAME_COL, STATUS_COL],
            &[job_name, status.as_str()],
            start,
            end,
        )
        .await
    }

    async fn delete_schedule_action_records_by_age(&self, age: i64) -> Result<u64, StorageError> {
        let statement = format!(
            "DELETE FROM {SCHEDULE_ACTION_RECORD_TABLE} \
             WHERE {CREATED_COL} < (EXTRACT(EPOCH FROM NOW()) * 1000)::bigint - $1"
        );
        let result = sqlx::query(&statement)
            .bind(age)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
