use domain::{Device, DeviceProfile, DeviceService, DiscoveredDevice, ProvisionWatcher};
use edge_storage::{
    DeviceProfileStore, DeviceServiceStore, DeviceStore, ErrorKind,
    InMemoryDeviceProfileStore, InMemoryDeviceServiceStore, InMemoryDeviceStore,
    InMemoryProvisionWatcherStore, ProvisionWatcherStore,
};

struct Fixture {
    services: InMemoryDeviceServiceStore,
    profiles: InMemoryDeviceProfileStore,
    devices: InMemoryDeviceStore,
}

async fn fixture() -> Fixture {
    let services = InMemoryDeviceServiceStore::new();
    let profiles = InMemoryDeviceProfileStore::new();
    let devices = InMemoryDeviceStore::new(&services, &profiles);
    services
        .add_device_service(DeviceService::new("modbus"))
        .await
        .expect("add service");
    let mut profile = DeviceProfile::new("thermostat");
    profile.manufacturer = "Acme".to_string();
    profile.model = "T-100".to_string();
    profiles.add_device_profile(profile).await.expect("add profile");
    Fixture {
        services,
        profiles,
        devices,
    }
}

#[tokio::test]
async fn add_fills_id_and_timestamps() {
    let fixture = fixture().await;
    let device = fixture
        .devices
        .add_device(Device::new("d1", "modbus", "thermostat"))
        .await
        .expect("add device");
    assert!(!device.id.is_empty());
    assert!(device.created > 0);
    assert_eq!(device.created, device.modified);

    let by_id = fixture.devices.device_by_id(&device.id).await.expect("by id");
    assert_eq!(by_id.name, "d1");
    assert!(fixture.devices.device_id_exists(&device.id).await.expect("exists"));
}

#[tokio::test]
async fn device_requires_existing_service_and_profile() {
    let fixture = fixture().await;

    let err = fixture
        .devices
        .add_device(Device::new("d1", "modbus", "missing-profile"))
        .await
        .expect_err("missing profile");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);
    assert!(err.message().contains("missing-profile"));

    let err = fixture
        .devices
        .add_device(Device::new("d1", "missing-service", "thermostat"))
        .await
        .expect_err("missing service");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);

    assert!(!fixture.devices.device_name_exists("d1").await.expect("exists"));
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let fixture = fixture().await;
    let err = fixture
        .services
        .add_device_service(DeviceService::new("modbus"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
}

#[tokio::test]
async fn listing_filters_by_labels_and_pages() {
    let fixture = fixture().await;
    for (name, labels) in [
        ("d1", vec!["floor-1", "hvac"]),
        ("d2", vec!["floor-2", "hvac"]),
        ("d3", vec!["floor-1"]),
    ] {
        let mut device = Device::new(name, "modbus", "thermostat");
        device.labels = labels.into_iter().map(str::to_string).collect();
        fixture.devices.add_device(device).await.expect("add device");
    }

    let hvac = vec!["hvac".to_string()];
    let names: Vec<String> = fixture
        .devices
        .all_devices(0, -1, &hvac)
        .await
        .expect("by labels")
        .into_iter()
        .map(|device| device.name)
        .collect();
    assert_eq!(names, vec!["d1", "d2"]);

    let both = vec!["floor-1".to_string(), "hvac".to_string()];
    assert_eq!(
        fixture.devices.device_count_by_labels(&both).await.expect("count"),
        1
    );

    let page = fixture.devices.all_devices(2, 5, &[]).await.expect("last page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "d3");

    let err = fixture
        .devices
        .all_devices(3, 5, &[])
        .await
        .expect_err("beyond range");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);

    assert_eq!(
        fixture
            .devices
            .device_count_by_service_name("modbus")
            .await
            .expect("count"),
        3
    );
}

#[tokio::test]
async fn update_replaces_whole_document() {
    let fixture = fixture().await;
    let mut device = fixture
        .devices
        .add_device(Device::new("d1", "modbus", "thermostat"))
        .await
        .expect("add device");
    device.description = "lobby".to_string();
    fixture
        .devices
        .update_device(device.clone())
        .await
        .expect("update");
    let loaded = fixture.devices.device_by_name("d1").await.expect("by name");
    assert_eq!(loaded.description, "lobby");

    let err = fixture
        .devices
        .update_device(Device::new("ghost", "modbus", "thermostat"))
        .await
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);
}

#[tokio::test]
async fn profiles_query_by_manufacturer_and_model() {
    let fixture = fixture().await;
    let profiles = fixture
        .profiles
        .device_profiles_by_manufacturer_and_model("Acme", "T-100", 0, -1)
        .await
        .expect("by manufacturer and model");
    assert_eq!(profiles.len(), 1);
    assert_eq!(
        fixture
            .profiles
            .device_profile_count_by_model("T-200")
            .await
            .expect("count"),
        0
    );
}

#[tokio::test]
async fn delete_missing_is_not_found() {
    let fixture = fixture().await;
    fixture
        .services
        .delete_device_service_by_name("modbus")
        .await
        .expect("delete");
    let err = fixture
        .services
        .delete_device_service_by_name("modbus")
        .await
        .expect_err("already deleted");
    assert_eq!(err.kind(), ErrorKind::EntityDoesNotExist);
}

#[tokio::test]
async fn provision_watchers_filter_by_discovered_profile() {
    let store = InMemoryProvisionWatcherStore::new();
    let watcher = ProvisionWatcher {
        name: "watch-thermostats".to_string(),
        service_name: "modbus".to_string(),
        discovered_device: DiscoveredDevice {
            profile_name: "thermostat".to_string(),
            ..DiscoveredDevice::default()
        },
        ..ProvisionWatcher::default()
    };
    store.add_provision_watcher(watcher).await.expect("add watcher");

    let found = store
        .provision_watchers_by_profile_name("thermostat", 0, -1)
        .await
        .expect("by profile");
    assert_eq!(found.len(), 1);
    assert_eq!(
        store
            .provision_watcher_count_by_service_name("modbus")
            .await
            .expect("count"),
        1
    );
}

async fn add_child(fixture: &Fixture, name: &str, parent: &str, labels: &[&str]) {
    let mut device = Device::new(name, "modbus", "thermostat");
    device.parent = parent.to_string();
    device.labels = labels.iter().map(|label| label.to_string()).collect();
    fixture.devices.add_device(device).await.expect("add device");
}

fn names(devices: &[Device]) -> Vec<&str> {
    devices.iter().map(|device| device.name.as_str()).collect()
}

#[tokio::test]
async fn device_tree_lists_levels_then_subtrees() {
    let fixture = fixture().await;
    add_child(&fixture, "floor-1", "gateway", &["floor"]).await;
    add_child(&fixture, "floor-2", "gateway", &["floor"]).await;
    add_child(&fixture, "meter-1a", "floor-1", &["meter"]).await;
    add_child(&fixture, "meter-2a", "floor-2", &["meter"]).await;
    add_child(&fixture, "sensor-1a", "meter-1a", &[]).await;

    let (total, page) = fixture
        .devices
        .device_tree("gateway", 1, 0, -1, &[])
        .await
        .expect("first level");
    assert_eq!(total, 2);
    assert_eq!(names(&page), vec!["floor-1", "floor-2"]);

    let (total, page) = fixture
        .devices
        .device_tree("gateway", 2, 0, -1, &[])
        .await
        .expect("two levels");
    assert_eq!(total, 4);
    assert_eq!(names(&page), vec!["floor-1", "floor-2", "meter-1a", "meter-2a"]);

    let (total, page) = fixture
        .devices
        .device_tree("gateway", 0, 0, -1, &[])
        .await
        .expect("unlimited");
    assert_eq!(total, 5);
    assert_eq!(
        names(&page),
        vec!["floor-1", "floor-2", "meter-1a", "sensor-1a", "meter-2a"]
    );

    let (total, page) = fixture
        .devices
        .device_tree("gateway", 0, 1, 2, &[])
        .await
        .expect("paged");
    assert_eq!(total, 5);
    assert_eq!(names(&page), vec!["floor-2", "meter-1a"]);

    let (total, page) = fixture
        .devices
        .device_tree("gateway", 0, 9, 2, &[])
        .await
        .expect("offset beyond tree");
    assert_eq!(total, 5);
    assert!(page.is_empty());
}

#[tokio::test]
async fn device_tree_labels_prune_whole_branches() {
    let fixture = fixture().await;
    add_child(&fixture, "floor-1", "gateway", &["floor"]).await;
    add_child(&fixture, "floor-2", "gateway", &[]).await;
    add_child(&fixture, "meter-1a", "floor-1", &["floor"]).await;
    add_child(&fixture, "meter-2a", "floor-2", &["floor"]).await;

    let labels = vec!["floor".to_string()];
    let (total, page) = fixture
        .devices
        .device_tree("gateway", 0, 0, -1, &labels)
        .await
        .expect("labelled tree");
    assert_eq!(total, 2);
    assert_eq!(names(&page), vec!["floor-1", "meter-1a"]);
}

#[tokio::test]
async fn device_tree_stops_on_ancestor_cycle() {
    let fixture = fixture().await;
    add_child(&fixture, "loop", "loop", &[]).await;

    let (total, _) = fixture
        .devices
        .device_tree("loop", 1, 0, -1, &[])
        .await
        .expect("single level does not recurse");
    assert_eq!(total, 1);

    let err = fixture
        .devices
        .device_tree("loop", 0, 0, -1, &[])
        .await
        .expect_err("cycle");
    assert_eq!(err.kind(), ErrorKind::DatabaseError);
    assert!(err.message().contains("loop"));
}
