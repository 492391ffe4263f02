//! Contract — the property-only capability set a schema is compiled from.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ValueKind;

/// A property-only contract: named, typed properties, possibly inherited
/// from several parent contracts.
///
/// The contract name is the schema identity — the compiled representation is
/// cached under it for the process lifetime. Contracts are pure data and can
/// be stored or shipped by consumers; the compiled artifacts cannot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parents: Vec<Arc<Contract>>,
    #[serde(default)]
    properties: Vec<PropertyDecl>,
    /// Names of callable (behavior) members the contract declares. Counted
    /// by the analyzer's property-only guard.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    behaviors: Vec<String>,
    /// Names of event-like members. Any entry fails analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    events: Vec<String>,
    /// Requests the change-notification capability for every entity of this
    /// schema (and of any schema inheriting it).
    #[serde(default)]
    observable: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
}

/// One property declaration inside a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub kind: ValueKind,
    pub writable: bool,
    /// Resolve get/set from the externally supplied hook directory instead
    /// of the default slot-based accessors.
    #[serde(default)]
    pub extended: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Contract {
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder {
            inner: Contract {
                name: name.into(),
                parents: Vec::new(),
                properties: Vec::new(),
                behaviors: Vec::new(),
                events: Vec::new(),
                observable: false,
                annotations: BTreeMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name with a leading interface-style `I` stripped
    /// (`"ICustomer"` → `"Customer"`).
    pub fn display_name(&self) -> &str {
        let name = &self.name;
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some('I'), Some(second)) if second.is_uppercase() => &name[1..],
            _ => name,
        }
    }

    pub fn parents(&self) -> &[Arc<Contract>] {
        &self.parents
    }

    pub fn properties(&self) -> &[PropertyDecl] {
        &self.properties
    }

    pub fn behaviors(&self) -> &[String] {
        &self.behaviors
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn is_observable(&self) -> bool {
        self.observable
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }
}

/// Fluent construction for [`Contract`].
pub struct ContractBuilder {
    inner: Contract,
}

impl ContractBuilder {
    /// Declare a writable property.
    pub fn property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.inner.properties.push(PropertyDecl {
            name: name.into(),
            kind,
            writable: true,
            extended: false,
            annotations: BTreeMap::new(),
        });
        self
    }

    /// Declare a read-only property. Without an extension getter, reading it
    /// faults at run time.
    pub fn read_only(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.inner.properties.push(PropertyDecl {
            name: name.into(),
            kind,
            writable: false,
            extended: false,
            annotations: BTreeMap::new(),
        });
        self
    }

    /// Declare a writable property whose accessors resolve from the hook
    /// directory at analysis time.
    pub fn extended(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.inner.properties.push(PropertyDecl {
            name: name.into(),
            kind,
            writable: true,
            extended: true,
            annotations: BTreeMap::new(),
        });
        self
    }

    /// Declare a read-only property backed by an extension getter.
    pub fn read_only_extended(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.inner.properties.push(PropertyDecl {
            name: name.into(),
            kind,
            writable: false,
            extended: true,
            annotations: BTreeMap::new(),
        });
        self
    }

    /// Declare a property from a prebuilt declaration (per-property
    /// annotations travel with it).
    pub fn declare(mut self, decl: PropertyDecl) -> Self {
        self.inner.properties.push(decl);
        self
    }

    pub fn behavior(mut self, name: impl Into<String>) -> Self {
        self.inner.behaviors.push(name.into());
        self
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.inner.events.push(name.into());
        self
    }

    pub fn observable(mut self) -> Self {
        self.inner.observable = true;
        self
    }

    pub fn inherits(mut self, parent: Arc<Contract>) -> Self {
        self.inner.parents.push(parent);
        self
    }

    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.annotations.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Arc<Contract> {
        Arc::new(self.inner)
    }
}
