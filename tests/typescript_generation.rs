//! TypeScript Generation Tests
//!
//! Validates that the dashboard-facing types can be exported to TypeScript
//! when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_dashboard_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, the types are configured for TypeScript export
    fn assert_type<T: Type>() {}

    assert_type::<telemetry_stream::TelemetryFrame>();
    assert_type::<telemetry_stream::Location>();
    assert_type::<telemetry_stream::ConnectionState>();
    assert_type::<telemetry_stream::CloseEvent>();
    assert_type::<telemetry_stream::UpdateRate>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still compile without specta::Type
    let _ = telemetry_stream::UpdateRate::Native;
    let _ = telemetry_stream::ConnectionState::Idle;
}
