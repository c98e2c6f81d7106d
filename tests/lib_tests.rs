use flow_dissector::*;

#[test]
fn test_version_info() {
    assert!(!VERSION.is_empty());
    assert_eq!(NAME, "flow_dissector");
    assert!(!DESCRIPTION.is_empty());
}

#[test]
fn test_basic_builder_creation() {
    let _builder = EngineBuilder::new();
}

#[test]
fn test_empty_builder_is_rejected() {
    let err = EngineBuilder::new().build().unwrap_err();
    assert!(err.is_config_error());
}
