//! Schema analysis — contract validation and flattening.
//!
//! Turns a [`Contract`] and its transitive parents into one ordered,
//! validated property list with capability flags and resolved extension
//! hooks. Analysis runs once per contract name; the compiler consumes the
//! result and the cache keeps the compiled form forever.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::model::{Contract, HookDirectory, HookGetter, HookSetter, ValueKind};
use crate::{Error, Result};

/// Tunable analysis knobs.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerOptions {
    /// A contract declaring more than `behavior_ratio × property_count`
    /// callable members is rejected as not property-only. A heuristic
    /// guard, not a hard invariant.
    pub behavior_ratio: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self { behavior_ratio: 2 }
    }
}

/// Hooks resolved from the directory at analysis time.
#[derive(Clone)]
pub struct ResolvedHooks {
    pub getter: HookGetter,
    pub setter: Option<HookSetter>,
}

impl std::fmt::Debug for ResolvedHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHooks")
            .field("getter", &match &self.getter {
                HookGetter::Plain(_) => "plain",
                HookGetter::WithCurrent(_) => "with_current",
            })
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// One flattened, validated property.
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    pub name: Arc<str>,
    pub kind: ValueKind,
    pub writable: bool,
    /// Slot/mask position. Assigned sequentially to writable properties in
    /// declaration order; read-only properties carry `None` and are not
    /// mask-tracked.
    pub ordinal: Option<u32>,
    pub hooks: Option<ResolvedHooks>,
    pub annotations: BTreeMap<String, String>,
}

/// Validated, flattened property description plus capability flags for one
/// contract. Declaration order is fixed forever once analyzed.
#[derive(Debug)]
pub struct Schema {
    pub contract: String,
    pub display_name: String,
    pub properties: Vec<PropertyDescriptor>,
    pub mutable_count: usize,
    pub needs_notification: bool,
    pub annotations: BTreeMap<String, String>,
}

/// Validate and flatten `contract` against `hooks`.
pub fn analyze(
    contract: &Contract,
    hooks: &HookDirectory,
    options: &AnalyzerOptions,
) -> Result<Schema> {
    if !contract.events().is_empty() {
        return Err(Error::Schema {
            contract: contract.name().to_owned(),
            message: format!(
                "contract declares event member '{}'; contracts must be property-only",
                contract.events()[0],
            ),
        });
    }

    if contract.behaviors().len() > options.behavior_ratio * contract.properties().len() {
        return Err(Error::Schema {
            contract: contract.name().to_owned(),
            message: format!(
                "contract declares {} behavior members against {} properties (limit {}×); not a property-only contract",
                contract.behaviors().len(),
                contract.properties().len(),
                options.behavior_ratio,
            ),
        });
    }

    // Flatten: own properties first, then ancestors breadth-first. The
    // seen-set keys by contract name so diamond inheritance contributes each
    // ancestor once.
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(contract.name());

    let mut needs_notification = contract.is_observable();
    let mut annotations = contract.annotations().clone();
    let mut flattened: Vec<(&Contract, usize)> = contract
        .properties()
        .iter()
        .enumerate()
        .map(|(i, _)| (contract, i))
        .collect();

    let mut queue: Vec<&Arc<Contract>> = contract.parents().iter().collect();
    let mut cursor = 0;
    while cursor < queue.len() {
        let ancestor = queue[cursor];
        cursor += 1;

        if !seen.insert(ancestor.name()) {
            continue;
        }

        needs_notification |= ancestor.is_observable();
        for (key, value) in ancestor.annotations() {
            annotations.entry(key.clone()).or_insert_with(|| value.clone());
        }
        flattened.extend(
            ancestor.properties().iter().enumerate().map(|(i, _)| (ancestor.as_ref(), i)),
        );
        queue.extend(ancestor.parents().iter());
    }

    // Assign ordinals and resolve hooks in declaration order.
    let mut names: HashSet<&str> = HashSet::new();
    let mut properties = Vec::with_capacity(flattened.len());
    let mut ordinal: u32 = 0;

    for (owner, index) in flattened {
        let decl = &owner.properties()[index];

        if !names.insert(decl.name.as_str()) {
            return Err(Error::Schema {
                contract: contract.name().to_owned(),
                message: format!("duplicate property name '{}'", decl.name),
            });
        }

        let resolved = if decl.extended {
            Some(resolve_hooks(contract.name(), &decl.name, decl.kind, hooks)?)
        } else {
            None
        };

        let assigned = if decl.writable {
            let slot = ordinal;
            ordinal += 1;
            Some(slot)
        } else {
            None
        };

        properties.push(PropertyDescriptor {
            name: Arc::from(decl.name.as_str()),
            kind: decl.kind,
            writable: decl.writable,
            ordinal: assigned,
            hooks: resolved,
            annotations: decl.annotations.clone(),
        });
    }

    tracing::debug!(
        contract = contract.name(),
        properties = properties.len(),
        mutable = ordinal,
        observable = needs_notification,
        "analyzed contract"
    );

    Ok(Schema {
        contract: contract.name().to_owned(),
        display_name: contract.display_name().to_owned(),
        properties,
        mutable_count: ordinal as usize,
        needs_notification,
        annotations,
    })
}

fn resolve_hooks(
    contract: &str,
    property: &str,
    kind: ValueKind,
    hooks: &HookDirectory,
) -> Result<ResolvedHooks> {
    let entry = hooks.get(property).ok_or_else(|| Error::Configuration {
        property: property.to_owned(),
        message: format!("contract '{contract}' marks the property extended but the hook directory has no entry"),
    })?;

    if entry.kind != kind {
        return Err(Error::Configuration {
            property: property.to_owned(),
            message: format!(
                "hook value type {} does not match declared {}",
                entry.kind.type_name(),
                kind.type_name(),
            ),
        });
    }

    let getter = entry.getter.clone().ok_or_else(|| Error::Configuration {
        property: property.to_owned(),
        message: "extended property requires an extension getter".to_owned(),
    })?;

    Ok(ResolvedHooks { getter, setter: entry.setter.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyHooks, Value};
    use pretty_assertions::assert_eq;

    fn options() -> AnalyzerOptions {
        AnalyzerOptions::default()
    }

    #[test]
    fn test_ordinals_skip_read_only() {
        let contract = Contract::builder("IRole")
            .property("RoleId", ValueKind::Int)
            .read_only_extended("Kind", ValueKind::String)
            .property("Name", ValueKind::String)
            .build();
        let hooks = HookDirectory::new()
            .with("Kind", PropertyHooks::getter(ValueKind::String, |_| Value::from("role")));

        let schema = analyze(&contract, &hooks, &options()).unwrap();
        assert_eq!(schema.mutable_count, 2);
        assert_eq!(schema.properties[0].ordinal, Some(0));
        assert_eq!(schema.properties[1].ordinal, None);
        assert_eq!(schema.properties[2].ordinal, Some(1));
    }

    #[test]
    fn test_event_members_rejected() {
        let contract = Contract::builder("IBroken")
            .property("Id", ValueKind::Int)
            .event("Changed")
            .build();
        let err = analyze(&contract, &HookDirectory::new(), &options()).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }), "got {err:?}");
    }

    #[test]
    fn test_behavior_guard_is_tunable() {
        let contract = Contract::builder("IBusy")
            .property("Id", ValueKind::Int)
            .behavior("Load")
            .behavior("Store")
            .behavior("Reset")
            .build();

        // 3 behaviors > 2 × 1 property: rejected by default.
        assert!(analyze(&contract, &HookDirectory::new(), &options()).is_err());

        // A looser ratio admits the same contract.
        let loose = AnalyzerOptions { behavior_ratio: 3 };
        assert!(analyze(&contract, &HookDirectory::new(), &loose).is_ok());
    }

    #[test]
    fn test_diamond_inheritance_flattens_once() {
        let root = Contract::builder("IIdentified")
            .property("Id", ValueKind::Int)
            .build();
        let left = Contract::builder("INamed")
            .inherits(Arc::clone(&root))
            .property("Name", ValueKind::String)
            .build();
        let right = Contract::builder("ITagged")
            .inherits(Arc::clone(&root))
            .property("Tag", ValueKind::String)
            .build();
        let leaf = Contract::builder("IRecord")
            .inherits(left)
            .inherits(right)
            .property("Body", ValueKind::String)
            .build();

        let schema = analyze(&leaf, &HookDirectory::new(), &options()).unwrap();
        let names: Vec<&str> = schema.properties.iter().map(|p| &*p.name).collect();
        assert_eq!(names, vec!["Body", "Name", "Tag", "Id"]);
        assert_eq!(schema.mutable_count, 4);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let a = Contract::builder("IA").property("Id", ValueKind::Int).build();
        let b = Contract::builder("IB").property("Id", ValueKind::Int).build();
        let leaf = Contract::builder("ILeaf").inherits(a).inherits(b).build();

        let err = analyze(&leaf, &HookDirectory::new(), &options()).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }), "got {err:?}");
    }

    #[test]
    fn test_observable_ancestor_propagates() {
        let base = Contract::builder("IObservable").observable().build();
        let leaf = Contract::builder("IThing")
            .inherits(base)
            .property("Id", ValueKind::Int)
            .build();
        let schema = analyze(&leaf, &HookDirectory::new(), &options()).unwrap();
        assert!(schema.needs_notification);
    }

    #[test]
    fn test_missing_hook_entry_fails_fast() {
        let contract = Contract::builder("IThing")
            .extended("Score", ValueKind::Float)
            .build();
        let err = analyze(&contract, &HookDirectory::new(), &options()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }), "got {err:?}");
    }

    #[test]
    fn test_hook_kind_mismatch_fails_fast() {
        let contract = Contract::builder("IThing")
            .extended("Score", ValueKind::Float)
            .build();
        let hooks = HookDirectory::new()
            .with("Score", PropertyHooks::getter(ValueKind::Int, |_| Value::Int(0)));
        let err = analyze(&contract, &hooks, &options()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }), "got {err:?}");
    }
}
