//! Postgres 通知服务存储实现：通知、订阅、投递记录。
//!
//! 三者均为文档型实体；投递记录额外带 `notification_id` 列用于按通知查询与级联删除。

use super::document::{
    self, NAME_COL, count_documents, count_documents_by_time_range, decode_rows, document_by_id,
    document_by_name, documents, documents_by_time_range, ensure_page, insert_document,
    latest_document_by_offset, update_document_by_id, update_document_by_name,
};
use crate::batch::BatchOutcome;
use crate::error::StorageError;
use crate::models::Document;
use crate::sql;
use crate::traits::{NotificationStore, SubscriptionStore, TransmissionStore};
use domain::{
    Notification, NotificationStatus, Subscription, Transmission, TransmissionStatus,
};
use serde_json::{Value, json};
use sqlx::{PgPool, Row};

pub const NOTIFICATION_TABLE: &str = "support_notifications.notification";
pub const SUBSCRIPTION_TABLE: &str = "support_notifications.subscription";
pub const TRANSMISSION_TABLE: &str = "support_notifications.transmission";

const NOTIFICATION_ID_COL: &str = "notification_id";

/// 已处理完毕、可按时间清理的投递状态。
pub const PROCESSED_TRANSMISSION_STATUSES: [TransmissionStatus; 3] = [
    TransmissionStatus::Sent,
    TransmissionStatus::Acknowledged,
    TransmissionStatus::Escalated,
];

// ----------------------------------------------------------------------------
// 通知
// ----------------------------------------------------------------------------

pub struct PgNotificationStore {
    pub pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_with_transmissions(&self, id: &str) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql::delete_by_col(TRANSMISSION_TABLE, NOTIFICATION_ID_COL))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(&sql::delete_by_id(NOTIFICATION_TABLE))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!(
                "notification with id {id} does not exist"
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_acknowledged(&self, id: &str, acknowledged: bool) -> Result<(), StorageError> {
        let statement = format!(
            "UPDATE {NOTIFICATION_TABLE} SET {content} = {content} || \
             jsonb_build_object('acknowledged', $1::boolean, 'modified', $2::bigint) \
             WHERE {} = $3",
            sql::ID_COL,
            content = sql::CONTENT_COL,
        );
        let result = sqlx::query(&statement)
            .bind(acknowledged)
            .bind(domain::now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!(
                "notification with id {id} does not exist"
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationStore for PgNotificationStore {
    async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StorageError> {
        insert_document(&self.pool, NOTIFICATION_TABLE, notification).await
    }

    async fn notification_by_id(&self, id: &str) -> Result<Notification, StorageError> {
        document_by_id(&self.pool, NOTIFICATION_TABLE, id).await
    }

    async fn notifications_by_category(
        &self,
        category: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError> {
        let filter = json!({ "category": category });
        documents(&self.pool, NOTIFICATION_TABLE, Some(&filter), offset, limit).await
    }

    async fn notifications_by_label(
        &self,
        label: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError> {
        let filter = json!({ "labels": [label] });
        documents(&self.pool, NOTIFICATION_TABLE, Some(&filter), offset, limit).await
    }

    async fn notifications_by_status(
        &self,
        status: NotificationStatus,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError> {
        let filter = json!({ "status": status.as_str() });
        documents(&self.pool, NOTIFICATION_TABLE, Some(&filter), offset, limit).await
    }

    async fn notifications_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError> {
        documents_by_time_range(&self.pool, NOTIFICATION_TABLE, None, start, end, offset, limit)
            .await
    }

    async fn notifications_by_categories_and_labels(
        &self,
        categories: &[String],
        labels: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, StorageError> {
        if categories.is_empty() {
            let filter = document::labels_filter(labels);
            return documents(&self.pool, NOTIFICATION_TABLE, filter.as_ref(), offset, limit)
                .await;
        }
        // 通知只有一个类别：类别取成员关系，标签取包含关系
        let labels_filter = json!({ "labels": labels });
        let (offset, limit) = sql::normalize_pagination(offset, limit);
        let statement = format!(
            "SELECT {content} FROM {NOTIFICATION_TABLE} \
             WHERE {content}->>'category' = ANY ($1) AND {} \
             ORDER BY {} {}",
            sql::json_containment(2),
            sql::CONTENT_CREATED,
            sql::pagination(3),
            content = sql::CONTENT_COL,
        );
        let rows = sqlx::query(&statement)
            .bind(categories)
            .bind(&labels_filter)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        ensure_page(decode_rows(&rows)?, offset, Notification::KIND)
    }

    async fn latest_notification_by_offset(
        &self,
        offset: u32,
    ) -> Result<Notification, StorageError> {
        latest_document_by_offset(&self.pool, NOTIFICATION_TABLE, offset).await
    }

    async fn update_notification(&self, notification: Notification) -> Result<(), StorageError> {
        update_document_by_id(&self.pool, NOTIFICATION_TABLE, notification).await
    }

    async fn update_acknowledge_status(
        &self,
        ids: &[String],
        acknowledged: bool,
    ) -> Result<BatchOutcome<()>, StorageError> {
        let mut outcome = BatchOutcome::new();
        for id in ids {
            outcome.push(id.clone(), self.set_acknowledged(id, acknowledged).await);
        }
        Ok(outcome)
    }

    async fn delete_notification_by_id(&self, id: &str) -> Result<(), StorageError> {
        self.delete_with_transmissions(id).await
    }

    async fn delete_notifications_by_ids(
        &self,
        ids: &[String],
    ) -> Result<BatchOutcome<()>, StorageError> {
        let mut outcome = BatchOutcome::new();
        for id in ids {
            outcome.push(id.clone(), self.delete_with_transmissions(id).await);
        }
        Ok(outcome)
    }

    async fn cleanup_notifications_by_age(&self, age: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(&sql::delete_by_content_age(NOTIFICATION_TABLE))
            .bind(age)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_processed_notifications_by_age(&self, age: i64) -> Result<u64, StorageError> {
        let filter = json!({ "status": NotificationStatus::Processed.as_str() });
        let result = sqlx::query(&sql::delete_by_json_and_content_age(NOTIFICATION_TABLE))
            .bind(&filter)
            .bind(age)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn notification_total_count(&self) -> Result<u64, StorageError> {
        count_documents(&self.pool, NOTIFICATION_TABLE, None).await
    }

    async fn notification_count_by_category(&self, category: &str) -> Result<u64, StorageError> {
        let filter = json!({ "category": category });
        count_documents(&self.pool, NOTIFICATION_TABLE, Some(&filter)).await
    }

    async fn notification_count_by_label(&self, label: &str) -> Result<u64, StorageError> {
        let filter = json!({ "labels": [label] });
        count_documents(&self.pool, NOTIFICATION_TABLE, Some(&filter)).await
    }

    async fn notification_count_by_status(
        &self,
        status: NotificationStatus,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "status": status.as_str() });
        count_documents(&self.pool, NOTIFICATION_TABLE, Some(&filter)).await
    }

    async fn notification_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        count_documents_by_time_range(&self.pool, NOTIFICATION_TABLE, start, end).await
    }
}

// ----------------------------------------------------------------------------
// 订阅
// ----------------------------------------------------------------------------

pub struct PgSubscriptionStore {
    pub pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 订阅的类别/标签过滤：两个列表都是包含关系，空列表不参与过滤。
fn subscription_filter(categories: &[String], labels: &[String]) -> Option<Value> {
    let mut filter = serde_json::Map::new();
    if !categories.is_empty() {
        filter.insert("categories".to_string(), json!(categories));
    }
    if !labels.is_empty() {
        filter.insert("labels".to_string(), json!(labels));
    }
    if filter.is_empty() {
        None
    } else {
        Some(Value::Object(filter))
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn add_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StorageError> {
        insert_document(&self.pool, SUBSCRIPTION_TABLE, subscription).await
    }

    async fn subscription_by_id(&self, id: &str) -> Result<Subscription, StorageError> {
        document_by_id(&self.pool, SUBSCRIPTION_TABLE, id).await
    }

    async fn subscription_by_name(&self, name: &str) -> Result<Subscription, StorageError> {
        document_by_name(&self.pool, SUBSCRIPTION_TABLE, name).await
    }

    async fn all_subscriptions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError> {
        documents(&self.pool, SUBSCRIPTION_TABLE, None, offset, limit).await
    }

    async fn subscriptions_by_category(
        &self,
        category: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError> {
        let filter = json!({ "categories": [category] });
        documents(&self.pool, SUBSCRIPTION_TABLE, Some(&filter), offset, limit).await
    }

    async fn subscriptions_by_label(
        &self,
        label: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError> {
        let filter = json!({ "labels": [label] });
        documents(&self.pool, SUBSCRIPTION_TABLE, Some(&filter), offset, limit).await
    }

    async fn subscriptions_by_receiver(
        &self,
        receiver: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError> {
        let filter = json!({ "receiver": receiver });
        documents(&self.pool, SUBSCRIPTION_TABLE, Some(&filter), offset, limit).await
    }

    async fn subscriptions_by_categories_and_labels(
        &self,
        categories: &[String],
        labels: &[String],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, StorageError> {
        let filter = subscription_filter(categories, labels);
        documents(&self.pool, SUBSCRIPTION_TABLE, filter.as_ref(), offset, limit).await
    }

    async fn update_subscription(&self, subscription: Subscription) -> Result<(), StorageError> {
        update_document_by_name(&self.pool, SUBSCRIPTION_TABLE, subscription).await
    }

    async fn delete_subscription_by_name(&self, name: &str) -> Result<(), StorageError> {
        document::delete_by_col(
            &self.pool,
            SUBSCRIPTION_TABLE,
            Subscription::KIND,
            NAME_COL,
            name,
        )
        .await
    }

    async fn subscription_total_count(&self) -> Result<u64, StorageError> {
        count_documents(&self.pool, SUBSCRIPTION_TABLE, None).await
    }

    async fn subscription_count_by_category(
        &self,
        category: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "categories": [category] });
        count_documents(&self.pool, SUBSCRIPTION_TABLE, Some(&filter)).await
    }

    async fn subscription_count_by_label(&self, label: &str) -> Result<u64, StorageError> {
        let filter = json!({ "labels": [label] });
        count_documents(&self.pool, SUBSCRIPTION_TABLE, Some(&filter)).await
    }

    async fn subscription_count_by_receiver(
        &self,
        receiver: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "receiver": receiver });
        count_documents(&self.pool, SUBSCRIPTION_TABLE, Some(&filter)).await
    }
}

// ----------------------------------------------------------------------------
// 投递记录
// ----------------------------------------------------------------------------

pub struct PgTransmissionStore {
    pub pool: PgPool,
}

impl PgTransmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TransmissionStore for PgTransmissionStore {
    async fn add_transmission(
        &self,
        mut transmission: Transmission,
    ) -> Result<Transmission, StorageError> {
        transmission.prepare_insert(domain::now_millis());
        let content = serde_json::to_value(&transmission)?;
        let result = sqlx::query(&sql::insert_or_ignore(
            TRANSMISSION_TABLE,
            &[sql::ID_COL, sql::CONTENT_COL, NOTIFICATION_ID_COL],
        ))
        .bind(&transmission.id)
        .bind(&content)
        .bind(&transmission.notification_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::duplicate(format!(
                "transmission id {} already exists",
                transmission.id
            )));
        }
        Ok(transmission)
    }

    async fn update_transmission(&self, transmission: Transmission) -> Result<(), StorageError> {
        update_document_by_id(&self.pool, TRANSMISSION_TABLE, transmission).await
    }

    async fn transmission_by_id(&self, id: &str) -> Result<Transmission, StorageError> {
        document_by_id(&self.pool, TRANSMISSION_TABLE, id).await
    }

    async fn all_transmissions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError> {
        documents(&self.pool, TRANSMISSION_TABLE, None, offset, limit).await
    }

    async fn transmissions_by_time_range(
        &self,
        start: i64,
        end: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError> {
        documents_by_time_range(&self.pool, TRANSMISSION_TABLE, None, start, end, offset, limit)
            .await
    }

    async fn transmissions_by_status(
        &self,
        status: TransmissionStatus,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError> {
        let filter = json!({ "status": status.as_str() });
        documents(&self.pool, TRANSMISSION_TABLE, Some(&filter), offset, limit).await
    }

    async fn transmissions_by_subscription_name(
        &self,
        subscription_name: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError> {
        let filter = json!({ "subscriptionName": subscription_name });
        documents(&self.pool, TRANSMISSION_TABLE, Some(&filter), offset, limit).await
    }

    async fn transmissions_by_notification_id(
        &self,
        notification_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Transmission>, StorageError> {
        let (offset, limit) = sql::normalize_pagination(offset, limit);
        let statement = format!(
            "SELECT {} FROM {TRANSMISSION_TABLE} WHERE {} ORDER BY {} {}",
            sql::CONTENT_COL,
            sql::equality_condition(&[NOTIFICATION_ID_COL], 1),
            sql::CONTENT_CREATED,
            sql::pagination(2)
        );
        let rows = sqlx::query(&statement)
            .bind(notification_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        ensure_page(decode_rows(&rows)?, offset, Transmission::KIND)
    }

    async fn delete_processed_transmissions_by_age(
        &self,
        age: i64,
    ) -> Result<u64, StorageError> {
        let statuses: Vec<&str> = PROCESSED_TRANSMISSION_STATUSES
            .iter()
            .map(|status| status.as_str())
            .collect();
        let statement = format!(
            "DELETE FROM {TRANSMISSION_TABLE} WHERE {}->>'status' = ANY ($1) \
             AND {} < (EXTRACT(EPOCH FROM NOW()) * 1000)::bigint - $2",
            sql::CONTENT_COL,
            sql::CONTENT_CREATED
        );
        let result = sqlx::query(&statement)
            .bind(&statuses)
            .bind(age)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn transmission_total_count(&self) -> Result<u64, StorageError> {
        count_documents(&self.pool, TRANSMISSION_TABLE, None).await
    }

    async fn transmission_count_by_status(
        &self,
        status: TransmissionStatus,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "status": status.as_str() });
        count_documents(&self.pool, TRANSMISSION_TABLE, Some(&filter)).await
    }

    async fn transmission_count_by_subscription_name(
        &self,
        subscription_name: &str,
    ) -> Result<u64, StorageError> {
        let filter = json!({ "subscriptionName": subscription_name });
        count_documents(&self.pool, TRANSMISSION_TABLE, Some(&filter)).await
    }

    async fn transmission_count_by_notification_id(
        &self,
        notification_id: &str,
    ) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query(&sql::count_where(TRANSMISSION_TABLE, &[NOTIFICATION_ID_COL]))
            .bind(notification_id)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn transmission_count_by_time_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<u64, StorageError> {
        count_documents_by_time_range(&self.pool, TRANSMISSION_TABLE, start, end).await
    }
}
