use edge_telemetry::{
    LoggingClient, NullLoggingClient, SharedLogger, TracingLoggingClient, init_tracing,
};

#[test]
fn tracing_client_keeps_component() {
    init_tracing();
    let client = TracingLoggingClient::new("migration");
    assert_eq!(client.component(), "migration");
    client.info("applying idempotent scripts");
    client.warn("unlock failed");
}

#[test]
fn init_tracing_is_repeatable() {
    init_tracing();
    init_tracing();
}

#[test]
fn shared_clients_are_object_safe() {
    let clients: Vec<SharedLogger> = vec![
        NullLoggingClient::shared(),
        TracingLoggingClient::shared("deletion"),
    ];
    for client in &clients {
        client.debug("debug");
        client.error("error");
    }
    assert_eq!(clients.len(), 2);
}
