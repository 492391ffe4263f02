//! Entity — the runtime instance of a compiled schema.
//!
//! One `Value` slot per mutable property, one change mask, and an optional
//! notification channel. Entities are not internally synchronized: mutation
//! goes through `&mut self` and concurrent writers must be serialized by the
//! caller. Subscription management is the exception — the channel is safe
//! under concurrent use.

use std::sync::Arc;

use crate::compile::EntityType;
use crate::mask::ChangeMask;
use crate::model::Value;
use crate::notify::{ChangeCallback, NotificationChannel, SubscriptionId};
use crate::{Error, Result};

/// A contract-defined record with change tracking.
#[derive(Debug)]
pub struct Entity {
    ty: Arc<EntityType>,
    slots: Vec<Value>,
    mask: ChangeMask,
    channel: Option<NotificationChannel>,
}

impl Entity {
    pub(crate) fn new(ty: Arc<EntityType>) -> Self {
        let slots = ty.slot_defaults().to_vec();
        let mask = ChangeMask::new(ty.mask_shape());
        let channel = ty.is_observable().then(NotificationChannel::new);
        Self { ty, slots, mask, channel }
    }

    /// The shared compiled representation this instance was built from.
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    // ========================================================================
    // Ordinary access
    // ========================================================================

    /// Read a property. Unknown names are `NotFound`; a read-only property
    /// with no extension getter faults `Unsupported`. Unassigned mutable
    /// properties read their default — use [`try_get`](Self::try_get) for
    /// the assigned-only view.
    pub fn get(&self, name: &str) -> Result<Value> {
        let token = self
            .ty
            .token(name)
            .ok_or_else(|| Error::NotFound(format!("property '{name}'")))?;
        (token.getter)(self)
    }

    /// Read a property as a concrete type.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        T::from_value(&self.get(name)?)
    }

    /// Write a property. Unknown names are `NotFound`; read-only properties
    /// fault `Unsupported`. Assigning the current value performs no
    /// mutation, no mask update, and no notification.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let setter = {
            let token = self
                .ty
                .token(name)
                .ok_or_else(|| Error::NotFound(format!("property '{name}'")))?;
            token.setter.clone().ok_or_else(|| {
                Error::Unsupported(format!("property '{name}' is read-only"))
            })?
        };
        setter(self, value.into())
    }

    // ========================================================================
    // Name-based accessors (sparse view)
    // ========================================================================

    /// Assigned-only read: `Ok(None)` for unknown names and for mutable
    /// properties whose mask bit is clear — even though the slot holds a
    /// default. Read-only properties are always readable (a bare one still
    /// faults on the read itself).
    pub fn try_get(&self, name: &str) -> Result<Option<Value>> {
        let Some(token) = self.ty.token(name) else {
            return Ok(None);
        };

        if let Some(ordinal) = token.ordinal {
            if !self.mask.test(ordinal as usize) {
                return Ok(None);
            }
        }

        (token.getter)(self).map(Some)
    }

    /// Write through the uniform setter. `Ok(false)` when the name is
    /// unknown or the property read-only; `Ok(true)` means "a settable
    /// property exists," not "a mutation occurred" — change suppression may
    /// still short-circuit internally. Subscriber faults propagate as `Err`.
    pub fn try_set(&mut self, name: &str, value: impl Into<Value>) -> Result<bool> {
        let setter = match self.ty.token(name) {
            Some(token) => match &token.setter {
                Some(setter) => setter.clone(),
                None => return Ok(false),
            },
            None => return Ok(false),
        };
        setter(self, value.into())?;
        Ok(true)
    }

    // ========================================================================
    // Change tracking
    // ========================================================================

    /// Whether any property has been assigned a new value since construction.
    pub fn has_changes(&self) -> bool {
        self.mask.any()
    }

    /// Whether any of the given properties changed. Unknown and read-only
    /// names are silently skipped; an empty slice behaves as
    /// [`has_changes`](Self::has_changes).
    pub fn has_changes_in(&self, names: &[&str]) -> bool {
        if names.is_empty() {
            return self.has_changes();
        }

        names.iter().any(|name| {
            self.ty.token(name).is_some_and(|token| {
                token.setter.is_some()
                    && token.ordinal.is_some_and(|o| self.mask.test(o as usize))
            })
        })
    }

    /// All changed properties in ordinal (declaration) order, independent of
    /// assignment order. Empty when nothing changed.
    pub fn get_changes(&self) -> Changeset {
        let mut entries = Vec::new();
        if !self.mask.any() {
            return Changeset { entries };
        }

        for (ordinal, name) in self.ty.tracked_names().iter().enumerate() {
            if !self.mask.test(ordinal) {
                continue;
            }
            if let Some(token) = self.ty.token(name) {
                if let Ok(value) = (token.getter)(self) {
                    entries.push((Arc::clone(name), value));
                }
            }
        }

        Changeset { entries }
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Register a change callback. Fails `Unsupported` when the schema does
    /// not request the observable capability.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Entity, &str) -> Result<()> + Send + Sync + 'static,
    {
        let channel = self.channel.as_ref().ok_or_else(|| {
            Error::Unsupported(format!(
                "contract '{}' does not request change notification",
                self.ty.contract(),
            ))
        })?;
        Ok(channel.subscribe(Arc::new(callback) as ChangeCallback))
    }

    /// Remove a previously registered callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.channel.as_ref().is_some_and(|channel| channel.unsubscribe(id))
    }

    // ========================================================================
    // Accessor-synthesis surface (crate-internal)
    // ========================================================================

    pub(crate) fn slot(&self, ordinal: usize) -> &Value {
        &self.slots[ordinal]
    }

    pub(crate) fn store_slot(&mut self, ordinal: usize, value: Value) {
        self.slots[ordinal] = value;
        self.mask.set(ordinal);
    }

    pub(crate) fn dispatch_change(&self, name: &str) -> Result<()> {
        match &self.channel {
            Some(channel) => channel.dispatch(self, name),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Changeset
// ============================================================================

/// Ordered name→value view of the changed properties of one entity.
/// Iteration order is ordinal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    entries: Vec<(Arc<str>, Value)>,
}

impl Changeset {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| &**n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| &**n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (&**n, v))
    }
}

impl IntoIterator for Changeset {
    type Item = (Arc<str>, Value);
    type IntoIter = std::vec::IntoIter<(Arc<str>, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// Typed reads
// ============================================================================

/// Convert from Value to concrete types.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.clone()),
            _ => Err(Error::Type {
                expected: "STRING".into(),
                got: val.type_name().into(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_int().ok_or_else(|| Error::Type {
            expected: "INTEGER".into(),
            got: val.type_name().into(),
        })
    }
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_float().ok_or_else(|| Error::Type {
            expected: "FLOAT".into(),
            got: val.type_name().into(),
        })
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_bool().ok_or_else(|| Error::Type {
            expected: "BOOLEAN".into(),
            got: val.type_name().into(),
        })
    }
}
