//! 注册表测试

use flow_dissector::core::bitmask::SelectionBitmask;
use flow_dissector::core::matcher::FnMatcher;
use flow_dissector::protocols::{init_all, init_cipio, CipIoMatcher};
use flow_dissector::*;
use std::sync::Arc;

fn modbus_stub(_: &EngineConfig, _: &FlowState, _: &PacketView<'_>) -> Decision {
    Decision::Exclude
}

fn modbus_registration() -> MatcherRegistration {
    MatcherRegistration::new(Arc::new(FnMatcher::new("Modbus", ProtocolId::Modbus, modbus_stub)))
        .with_selection(SelectionBitmask::V4_V6_TCP)
}

#[test]
fn test_sequential_slots() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 10;

    assert_eq!(init_cipio(&mut registry, &mut next_id).unwrap(), 10);
    assert_eq!(registry.register(&mut next_id, modbus_registration()).unwrap(), 11);
    assert_eq!(next_id, 12);

    let slots: Vec<u32> = registry.entries().iter().map(|e| e.slot()).collect();
    assert_eq!(slots, vec![10, 11]);
    assert_eq!(registry.get_by_name("Modbus").unwrap().protocol(), ProtocolId::Modbus);
}

#[test]
fn test_duplicate_protocol_fails_without_side_effects() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;
    init_cipio(&mut registry, &mut next_id).unwrap();

    let err = init_cipio(&mut registry, &mut next_id).unwrap_err();
    assert!(matches!(
        err,
        ClassifierError::DuplicateProtocol {
            protocol: ProtocolId::CipIo,
            existing_slot: 0
        }
    ));
    assert_eq!(next_id, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_missing_matcher_fails() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;
    let mut registration = modbus_registration();
    registration.matcher = None;

    let err = registry.register(&mut next_id, registration).unwrap_err();
    assert!(matches!(err, ClassifierError::MissingMatcher { .. }));
    assert!(registry.is_empty());
    assert_eq!(next_id, 0);
}

#[test]
fn test_invalid_registrations() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;

    let mut unnamed = modbus_registration();
    unnamed.name = "  ".to_string();
    assert!(matches!(
        registry.register(&mut next_id, unnamed),
        Err(ClassifierError::InvalidName { .. })
    ));

    let no_selection = modbus_registration().with_selection(SelectionBitmask::empty());
    assert!(matches!(
        registry.register(&mut next_id, no_selection),
        Err(ClassifierError::EmptySelection { .. })
    ));

    // 只有限定位、没有IP版本或传输层的选择条件永远无法满足
    for unsatisfiable in [
        SelectionBitmask::PAYLOAD,
        SelectionBitmask::IPV4 | SelectionBitmask::PAYLOAD,
        SelectionBitmask::UDP | SelectionBitmask::NO_RETRANSMISSION,
    ] {
        let registration = modbus_registration().with_selection(unsatisfiable);
        assert!(matches!(
            registry.register(&mut next_id, registration),
            Err(ClassifierError::EmptySelection { .. })
        ));
    }
    assert!(registry.is_empty());
    assert_eq!(next_id, 0);

    let mut mismatched = MatcherRegistration::new(Arc::new(CipIoMatcher::new()));
    mismatched.protocol = ProtocolId::Dnp3;
    assert!(matches!(
        registry.register(&mut next_id, mismatched),
        Err(ClassifierError::ConfigError { .. })
    ));

    assert!(registry.is_empty());
}

#[test]
fn test_duplicate_name_fails() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;
    registry.register(&mut next_id, modbus_registration()).unwrap();

    let clash = MatcherRegistration::new(Arc::new(FnMatcher::new(
        "Modbus",
        ProtocolId::Dnp3,
        modbus_stub,
    )));
    let err = registry.register(&mut next_id, clash).unwrap_err();
    assert!(matches!(err, ClassifierError::DuplicateName { .. }));
}

#[test]
fn test_participation_controls_detection_bitmask() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;
    init_cipio(&mut registry, &mut next_id).unwrap();
    registry
        .register(
            &mut next_id,
            modbus_registration().with_participation(BitmaskParticipation::Exclude),
        )
        .unwrap();

    let detection = registry.detection_bitmask();
    assert!(detection.contains(ProtocolId::CipIo));
    assert!(!detection.contains(ProtocolId::Modbus));
    assert_eq!(registry.registered_protocols().len(), 2);
}

#[test]
fn test_init_all_registers_builtins() {
    let mut registry = ProtocolRegistry::new();
    let mut next_id = 0;
    init_all(&mut registry, &mut next_id).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(next_id, 2);
    assert_eq!(registry.get(ProtocolId::Enip).unwrap().slot(), 0);
    assert_eq!(registry.get(ProtocolId::CipIo).unwrap().slot(), 1);
    assert_eq!(
        registry.get(ProtocolId::CipIo).unwrap().unconfigured(),
        UnconfiguredPolicy::SaveAsUnknown
    );
}

#[test]
fn test_builder_surfaces_registration_errors() {
    let err = EngineBuilder::new()
        .enable_cipio()
        .add_custom_matcher(MatcherRegistration::new(Arc::new(CipIoMatcher::new())))
        .build()
        .unwrap_err();
    assert!(matches!(err, ClassifierError::DuplicateProtocol { .. }));
}
