//! End-to-end tests for the core entity surface.
//!
//! Exercises the canonical scenario: a contract with writable Id/Name plus a
//! read-only extension-backed Tag, compiled through the registry.
//!
//! Each test exercises: analyze -> compile -> build -> access.

use entity_rs::{
    Contract, EntityRegistry, Error, HookDirectory, PropertyHooks, Value, ValueKind,
};

// ============================================================================
// Helper: the scenario contract {Id: Int (rw), Name: String (rw),
// Tag: String (ro, extension getter -> "const")}.
// ============================================================================

fn scenario_contract() -> std::sync::Arc<Contract> {
    Contract::builder("ICustomer")
        .property("Id", ValueKind::Int)
        .property("Name", ValueKind::String)
        .read_only_extended("Tag", ValueKind::String)
        .build()
}

fn scenario_hooks() -> HookDirectory {
    HookDirectory::new()
        .with("Tag", PropertyHooks::getter(ValueKind::String, |_| Value::from("const")))
}

fn build_scenario() -> entity_rs::Entity {
    let registry = EntityRegistry::new();
    registry
        .creator(&scenario_contract(), &scenario_hooks())
        .unwrap()
        .create()
}

// ============================================================================
// 1. Fresh entities are clean
// ============================================================================

#[test]
fn test_fresh_entity_has_no_changes() {
    let entity = build_scenario();
    assert!(!entity.has_changes());
    assert!(entity.get_changes().is_empty());
}

// ============================================================================
// 2. The scenario walk-through
// ============================================================================

#[test]
fn test_scenario_set_name() {
    let mut entity = build_scenario();

    entity.set("Name", "A").unwrap();
    assert!(entity.has_changes());

    let changes = entity.get_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes.get("Name"), Some(&Value::from("A")));
}

#[test]
fn test_scenario_tag_always_readable_never_writable() {
    let mut entity = build_scenario();

    // Readable before any assignment, and after.
    assert_eq!(entity.try_get("Tag").unwrap(), Some(Value::from("const")));
    entity.set("Name", "A").unwrap();
    assert_eq!(entity.try_get("Tag").unwrap(), Some(Value::from("const")));

    // Never writable, and trying leaves no trace.
    assert!(!entity.try_set("Tag", "x").unwrap());
    let changes = entity.get_changes();
    assert_eq!(changes.names().collect::<Vec<_>>(), vec!["Name"]);
}

// ============================================================================
// 3. Sparse try_get / try_set round-trip
// ============================================================================

#[test]
fn test_round_trip_through_try_accessors() {
    let mut entity = build_scenario();

    // Unassigned mutable property is invisible even though its slot holds a
    // default.
    assert_eq!(entity.try_get("Id").unwrap(), None);
    assert_eq!(entity.get("Id").unwrap(), Value::Int(0));

    assert!(entity.try_set("Id", 42).unwrap());
    assert_eq!(entity.try_get("Id").unwrap(), Some(Value::Int(42)));
}

#[test]
fn test_unknown_names_are_harmless() {
    let mut entity = build_scenario();

    assert_eq!(entity.try_get("Nope").unwrap(), None);
    assert!(!entity.try_set("Nope", 1).unwrap());
    assert!(!entity.has_changes());
}

#[test]
fn test_ordinary_accessors_fault_loudly() {
    let mut entity = build_scenario();

    assert!(matches!(entity.get("Nope"), Err(Error::NotFound(_))));
    assert!(matches!(entity.set("Nope", 1), Err(Error::NotFound(_))));
    assert!(matches!(entity.set("Tag", "x"), Err(Error::Unsupported(_))));
}

// ============================================================================
// 4. Bare read-only properties fault on read
// ============================================================================

#[test]
fn test_bare_read_only_get_faults() {
    let contract = Contract::builder("IOpaque")
        .property("Id", ValueKind::Int)
        .read_only("Shadow", ValueKind::String)
        .build();
    let entity = EntityRegistry::new().build(&contract).unwrap();

    assert!(matches!(entity.get("Shadow"), Err(Error::Unsupported(_))));
    assert!(matches!(entity.try_get("Shadow"), Err(Error::Unsupported(_))));
}

// ============================================================================
// 5. Typed reads and kind-checked writes
// ============================================================================

#[test]
fn test_typed_access() {
    let mut entity = build_scenario();
    entity.set("Id", 7).unwrap();
    entity.set("Name", "Ada").unwrap();

    assert_eq!(entity.get_as::<i64>("Id").unwrap(), 7);
    assert_eq!(entity.get_as::<String>("Name").unwrap(), "Ada");
    assert!(matches!(
        entity.get_as::<String>("Id"),
        Err(Error::Type { .. })
    ));
}

#[test]
fn test_kind_checked_writes() {
    let mut entity = build_scenario();

    assert!(matches!(entity.set("Id", "text"), Err(Error::Type { .. })));
    assert!(matches!(entity.set("Id", Value::Null), Err(Error::Type { .. })));
    // Reference-like kinds accept Null.
    entity.set("Name", Value::Null).unwrap();
    assert!(!entity.has_changes(), "Null equals the default Null slot");
}

// ============================================================================
// 6. Extension getter variants
// ============================================================================

#[test]
fn test_with_current_getter_sees_slot_value() {
    let contract = Contract::builder("IGreeting")
        .extended("Message", ValueKind::String)
        .build();
    let hooks = HookDirectory::new().with(
        "Message",
        PropertyHooks::getter_with_current(ValueKind::String, |_, current| match current {
            Value::String(s) => Value::String(format!("{s}!")),
            _ => Value::from("(unset)"),
        }),
    );

    let mut entity = EntityRegistry::new().creator(&contract, &hooks).unwrap().create();
    assert_eq!(entity.get("Message").unwrap(), Value::from("(unset)"));

    entity.set("Message", "hello").unwrap();
    assert_eq!(entity.get("Message").unwrap(), Value::from("hello!"));
}

#[test]
fn test_setter_hook_decides_change() {
    let contract = Contract::builder("IGuarded")
        .extended("Level", ValueKind::Int)
        .build();
    // Only admit strictly increasing levels.
    let hooks = HookDirectory::new().with(
        "Level",
        PropertyHooks::getter_with_current(ValueKind::Int, |_, current| current)
            .with_setter(|entity, value| {
                let current = entity.get("Level").ok().and_then(|v| v.as_int()).unwrap_or(0);
                value.as_int().is_some_and(|v| v > current)
            }),
    );

    let mut entity = EntityRegistry::new().creator(&contract, &hooks).unwrap().create();

    assert!(entity.try_set("Level", 3).unwrap());
    assert_eq!(entity.get_as::<i64>("Level").unwrap(), 3);

    // Rejected by the hook: still "a settable property exists", no mutation.
    assert!(entity.try_set("Level", 1).unwrap());
    assert_eq!(entity.get_as::<i64>("Level").unwrap(), 3);
    assert_eq!(entity.get_changes().len(), 1);
}

// ============================================================================
// 7. Compiled-type metadata
// ============================================================================

#[test]
fn test_entity_type_metadata() {
    let contract = Contract::builder("ICustomer")
        .property("Id", ValueKind::Int)
        .annotate("table", "customers")
        .build();
    let entity = EntityRegistry::new().build(&contract).unwrap();

    let ty = entity.entity_type();
    assert_eq!(ty.contract(), "ICustomer");
    assert_eq!(ty.display_name(), "Customer");
    assert_eq!(ty.annotation("table"), Some("customers"));
    assert_eq!(ty.property_count(), 1);
    assert_eq!(ty.tracked_count(), 1);
}
