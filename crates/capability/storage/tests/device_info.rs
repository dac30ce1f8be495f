use async_trait::async_trait;
use domain::{Event, NumericValue, Reading, ValueType};
use edge_storage::{DeviceInfo, DeviceInfoCache, DeviceInfoStore, ErrorKind, StorageError};
use std::sync::Mutex;

#[derive(Default)]
struct CountingStore {
    rows: Mutex<Vec<DeviceInfo>>,
    finds: Mutex<usize>,
    inserts: Mutex<usize>,
}

#[async_trait]
impl DeviceInfoStore for CountingStore {
    async fn find_device_info_id(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        *self.finds.lock().expect("lock") += 1;
        let rows = self.rows.lock().expect("lock");
        rows.iter()
            .position(|row| row == info)
            .map(|index| index as i32 + 1)
            .ok_or_else(|| StorageError::not_found("device info does not exist"))
    }

    async fn insert_device_info(&self, info: &DeviceInfo) -> Result<i32, StorageError> {
        *self.inserts.lock().expect("lock") += 1;
        let mut rows = self.rows.lock().expect("lock");
        rows.push(info.clone());
        Ok(rows.len() as i32)
    }
}

struct FailingStore;

#[async_trait]
impl DeviceInfoStore for FailingStore {
    async fn find_device_info_id(&self, _info: &DeviceInfo) -> Result<i32, StorageError> {
        Err(StorageError::database("connection refused"))
    }

    async fn insert_device_info(&self, _info: &DeviceInfo) -> Result<i32, StorageError> {
        panic!("insert must not run after a database error");
    }
}

fn sample_event() -> Event {
    let mut event = Event::new("d1", "thermostat", "auto", 100);
    event.readings.push(Reading::numeric(
        "d1",
        "thermostat",
        "temperature",
        ValueType::Float32,
        NumericValue::Float(21.5),
        100,
    ));
    event
}

#[test]
fn event_and_reading_tuples_differ() {
    let event = sample_event();
    let event_info = DeviceInfo::for_event(&event);
    let reading_info = DeviceInfo::for_reading(&event, &event.readings[0]);
    assert_eq!(reading_info.source_name, "auto");
    assert_eq!(reading_info.value_type, "Float32");
    assert!(event_info.resource_name.is_empty());
    assert_ne!(
        event_info.cache_key().expect("key"),
        reading_info.cache_key().expect("key")
    );
    assert_eq!(
        reading_info.cache_key().expect("key"),
        DeviceInfo::for_reading(&event, &event.readings[0])
            .cache_key()
            .expect("key")
    );
}

#[tokio::test]
async fn resolve_hits_the_store_once_per_tuple() {
    let store = CountingStore::default();
    let cache = DeviceInfoCache::new();
    let info = DeviceInfo::for_event(&sample_event());

    let first = cache.resolve(&store, &info).await.expect("resolve");
    let second = cache.resolve(&store, &info).await.expect("resolve");
    assert_eq!(first, second);
    assert_eq!(*store.finds.lock().expect("lock"), 1);
    assert_eq!(*store.inserts.lock().expect("lock"), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn resolve_reuses_existing_row_after_eviction() {
    let store = CountingStore::default();
    let cache = DeviceInfoCache::new();
    let info = DeviceInfo::for_event(&sample_event());

    let id = cache.resolve(&store, &info).await.expect("resolve");
    cache.remove(id);
    assert!(cache.is_empty());

    let again = cache.resolve(&store, &info).await.expect("resolve");
    assert_eq!(again, id);
    assert_eq!(*store.inserts.lock().expect("lock"), 1);
}

#[tokio::test]
async fn database_errors_are_not_treated_as_misses() {
    let cache = DeviceInfoCache::new();
    let info = DeviceInfo::for_event(&sample_event());
    let err = cache
        .resolve(&FailingStore, &info)
        .await
        .expect_err("database error");
    assert_eq!(err.kind(), ErrorKind::DatabaseError);
    assert!(cache.is_empty());
}

#[test]
fn remove_ids_evicts_every_matching_entry() {
    let cache = DeviceInfoCache::new();
    cache.insert("a", 1);
    cache.insert("b", 1);
    cache.insert("c", 2);
    cache.remove_ids(&[1]);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("c"), Some(2));
}
