//! Extension hooks — externally supplied accessor overrides.
//!
//! A hook directory maps property names to get/set functions resolved once
//! at analysis time, never re-resolved per call. The declared [`ValueKind`]
//! on each entry is checked against the property's kind so a mismatched hook
//! fails fast during analysis instead of corrupting slots at run time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;
use super::{Value, ValueKind};

/// Extension getter. `WithCurrent` hooks additionally receive the current
/// slot value (or the kind's default when the property has no slot).
#[derive(Clone)]
pub enum HookGetter {
    Plain(Arc<dyn Fn(&Entity) -> Value + Send + Sync>),
    WithCurrent(Arc<dyn Fn(&Entity, Value) -> Value + Send + Sync>),
}

/// Extension setter: inspects `(entity, new_value)` and reports whether the
/// assignment constitutes a change. The synthesized setter performs the
/// store itself when the hook reports `true`.
pub type HookSetter = Arc<dyn Fn(&Entity, &Value) -> bool + Send + Sync>;

/// Hook pair for one property.
#[derive(Clone)]
pub struct PropertyHooks {
    pub kind: ValueKind,
    pub getter: Option<HookGetter>,
    pub setter: Option<HookSetter>,
}

impl PropertyHooks {
    /// Hooks with a plain getter.
    pub fn getter<F>(kind: ValueKind, f: F) -> Self
    where
        F: Fn(&Entity) -> Value + Send + Sync + 'static,
    {
        Self { kind, getter: Some(HookGetter::Plain(Arc::new(f))), setter: None }
    }

    /// Hooks with a getter that receives the current slot value.
    pub fn getter_with_current<F>(kind: ValueKind, f: F) -> Self
    where
        F: Fn(&Entity, Value) -> Value + Send + Sync + 'static,
    {
        Self { kind, getter: Some(HookGetter::WithCurrent(Arc::new(f))), setter: None }
    }

    /// Attach a change-deciding setter.
    pub fn with_setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entity, &Value) -> bool + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for PropertyHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyHooks")
            .field("kind", &self.kind)
            .field("getter", &self.getter.as_ref().map(|g| match g {
                HookGetter::Plain(_) => "plain",
                HookGetter::WithCurrent(_) => "with_current",
            }))
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// The consumed external collaborator: property name → hook pair.
#[derive(Clone, Default)]
pub struct HookDirectory {
    entries: HashMap<String, PropertyHooks>,
}

impl HookDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: impl Into<String>, hooks: PropertyHooks) -> &mut Self {
        self.entries.insert(property.into(), hooks);
        self
    }

    /// Builder-style insert.
    pub fn with(mut self, property: impl Into<String>, hooks: PropertyHooks) -> Self {
        self.entries.insert(property.into(), hooks);
        self
    }

    pub fn get(&self, property: &str) -> Option<&PropertyHooks> {
        self.entries.get(property)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for HookDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
