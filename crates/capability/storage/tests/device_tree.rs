use domain::Device;
use edge_storage::device_tree::{device_tree, page_tree};
use edge_storage::{DeviceLevels, ErrorKind, StorageError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 以 `(子, 父)` 列表描述的设备层级。
struct Links {
    links: Vec<(&'static str, &'static str)>,
    lookups: AtomicUsize,
}

impl Links {
    fn new(links: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            links,
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl DeviceLevels for Links {
    async fn child_devices(
        &self,
        parent: &str,
        _labels: &[String],
    ) -> Result<Vec<Device>, StorageError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .links
            .iter()
            .filter(|(_, owner)| *owner == parent)
            .map(|(name, owner)| {
                let mut device = Device::new(*name, "svc", "profile");
                device.parent = owner.to_string();
                device
            })
            .collect())
    }
}

fn devices(count: usize) -> Vec<Device> {
    (0..count)
        .map(|i| Device::new(format!("d{i}"), "svc", "profile"))
        .collect()
}

#[test]
fn page_bounds_follow_offset_and_limit() {
    let (total, page) = page_tree(devices(5), 1, 2);
    assert_eq!(total, 5);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "d1");

    let (_, page) = page_tree(devices(5), -3, 0);
    assert_eq!(page.len(), 5);

    let (total, page) = page_tree(devices(5), 5, 1);
    assert_eq!(total, 5);
    assert!(page.is_empty());

    let (total, page) = page_tree(Vec::new(), 0, -1);
    assert_eq!(total, 0);
    assert!(page.is_empty());
}

#[tokio::test]
async fn level_limit_bounds_the_walk() {
    let source = Links::new(vec![("a", "root"), ("b", "a"), ("c", "b")]);
    let (total, page) = device_tree(&source, "root", 2, 0, -1, &[])
        .await
        .expect("two levels");
    assert_eq!(total, 2);
    let names: Vec<_> = page.iter().map(|device| device.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn indirect_cycle_is_a_database_error() {
    let source = Links::new(vec![("a", "root"), ("b", "a"), ("a", "b")]);
    let err = device_tree(&source, "root", -1, 0, -1, &[])
        .await
        .expect_err("cycle through b");
    assert_eq!(err.kind(), ErrorKind::DatabaseError);
    assert!(err.message().contains("device a"));
}

#[tokio::test]
async fn leaf_parent_yields_empty_tree() {
    let source = Links::new(Vec::new());
    let (total, page) = device_tree(&source, "nobody", 0, 0, 10, &[])
        .await
        .expect("empty tree");
    assert_eq!(total, 0);
    assert!(page.is_empty());
}
