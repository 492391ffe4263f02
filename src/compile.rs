//! Entity compilation — schema → shared runtime representation.
//!
//! In place of emitting a fresh concrete type per contract, compilation
//! assembles one [`EntityType`]: a name→token map over synthesized accessor
//! closures, an ordinal-ordered name array, per-slot defaults, and the mask
//! shape. The result is immutable, `Arc`-shared by every instance, and
//! cached for the process lifetime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::batch::Batch;
use crate::entity::Entity;
use crate::mask::MaskShape;
use crate::model::{HookGetter, Value};
use crate::schema::{PropertyDescriptor, Schema};
use crate::{Error, Result};

/// Uniform name-based read, shared by `get`/`try_get`/`get_changes`.
pub(crate) type Getter = Arc<dyn Fn(&Entity) -> Result<Value> + Send + Sync>;

/// Uniform name-based write, shared by `set`/`try_set`. Runs the full
/// change-suppression / store / mask / notify sequence.
pub(crate) type Setter = Arc<dyn Fn(&mut Entity, Value) -> Result<()> + Send + Sync>;

/// Immutable accessor pair plus mask position for one property. Shared
/// across all instances of a compiled type.
pub struct PropertyToken {
    pub(crate) ordinal: Option<u32>,
    pub(crate) getter: Getter,
    pub(crate) setter: Option<Setter>,
    annotations: BTreeMap<String, String>,
}

impl PropertyToken {
    /// Mask position; `None` for read-only (untracked) properties.
    pub fn ordinal(&self) -> Option<u32> {
        self.ordinal
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Annotation carried over from the property declaration.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// The compiled representation of one schema: one per contract, cached for
/// the process lifetime.
pub struct EntityType {
    contract: String,
    display_name: String,
    tokens: HashMap<Arc<str>, PropertyToken>,
    /// Writable property names, ordinal order.
    tracked: Vec<Arc<str>>,
    defaults: Vec<Value>,
    shape: MaskShape,
    observable: bool,
    annotations: BTreeMap<String, String>,
}

impl EntityType {
    /// The contract name this type was compiled from (the cache identity).
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Contract name with interface-style prefix stripped.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn mask_shape(&self) -> MaskShape {
        self.shape
    }

    pub fn is_observable(&self) -> bool {
        self.observable
    }

    pub fn property_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Annotation carried over from the contract.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn token(&self, name: &str) -> Option<&PropertyToken> {
        self.tokens.get(name)
    }

    /// Writable property names in ordinal (declaration) order.
    pub fn tracked_names(&self) -> &[Arc<str>] {
        &self.tracked
    }

    pub(crate) fn slot_defaults(&self) -> &[Value] {
        &self.defaults
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("contract", &self.contract)
            .field("properties", &self.tokens.len())
            .field("tracked", &self.tracked.len())
            .field("shape", &self.shape)
            .field("observable", &self.observable)
            .finish()
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Assemble the compiled representation from an analyzed schema.
pub(crate) fn compile(schema: Schema) -> Arc<EntityType> {
    let shape = MaskShape::for_count(schema.mutable_count);
    let mut tokens = HashMap::with_capacity(schema.properties.len());
    let mut tracked = Vec::with_capacity(schema.mutable_count);
    let mut defaults = Vec::with_capacity(schema.mutable_count);

    for descriptor in &schema.properties {
        let getter = synthesize_getter(descriptor);
        let setter = descriptor
            .ordinal
            .map(|ordinal| synthesize_setter(descriptor, ordinal as usize, schema.needs_notification));

        if descriptor.ordinal.is_some() {
            tracked.push(Arc::clone(&descriptor.name));
            defaults.push(descriptor.kind.default_value());
        }

        tokens.insert(
            Arc::clone(&descriptor.name),
            PropertyToken {
                ordinal: descriptor.ordinal,
                getter,
                setter,
                annotations: descriptor.annotations.clone(),
            },
        );
    }

    tracing::info!(
        contract = %schema.contract,
        properties = schema.properties.len(),
        tracked = tracked.len(),
        shape = ?shape,
        observable = schema.needs_notification,
        "compiled entity type"
    );

    Arc::new(EntityType {
        contract: schema.contract,
        display_name: schema.display_name,
        tokens,
        tracked,
        defaults,
        shape,
        observable: schema.needs_notification,
        annotations: schema.annotations,
    })
}

// ============================================================================
// Accessor synthesis
// ============================================================================

fn synthesize_getter(descriptor: &PropertyDescriptor) -> Getter {
    match (&descriptor.hooks, descriptor.ordinal) {
        // Plain slot read.
        (None, Some(ordinal)) => {
            let slot = ordinal as usize;
            Arc::new(move |entity| Ok(entity.slot(slot).clone()))
        }

        // Read-only with neither slot nor hook: faults on every read.
        (None, None) => {
            let name = Arc::clone(&descriptor.name);
            Arc::new(move |_| {
                Err(Error::Unsupported(format!(
                    "read-only property '{name}' has no storage and no extension getter"
                )))
            })
        }

        (Some(hooks), ordinal) => match &hooks.getter {
            HookGetter::Plain(hook) => {
                let hook = Arc::clone(hook);
                Arc::new(move |entity| Ok(hook(entity)))
            }
            HookGetter::WithCurrent(hook) => {
                let hook = Arc::clone(hook);
                match ordinal {
                    Some(ordinal) => {
                        let slot = ordinal as usize;
                        Arc::new(move |entity| Ok(hook(entity, entity.slot(slot).clone())))
                    }
                    None => {
                        // Slot-less property: the hook sees the kind default.
                        let fallback = descriptor.kind.default_value();
                        Arc::new(move |entity| Ok(hook(entity, fallback.clone())))
                    }
                }
            }
        },
    }
}

fn synthesize_setter(
    descriptor: &PropertyDescriptor,
    slot: usize,
    notifying: bool,
) -> Setter {
    let name = Arc::clone(&descriptor.name);
    let kind = descriptor.kind;
    let hook = descriptor.hooks.as_ref().and_then(|hooks| hooks.setter.clone());

    Arc::new(move |entity: &mut Entity, value: Value| -> Result<()> {
        if !value.conforms_to(kind) {
            return Err(Error::Type {
                expected: kind.type_name().into(),
                got: value.type_name().into(),
            });
        }

        // The hook decides "changed?" when present; otherwise an assignment
        // equal to the stored value aborts the whole sequence.
        let changed = match &hook {
            Some(hook) => hook(entity, &value),
            None => *entity.slot(slot) != value,
        };
        if !changed {
            return Ok(());
        }

        entity.store_slot(slot, value);

        if notifying {
            entity.dispatch_change(&name)?;
        }
        Ok(())
    })
}

// ============================================================================
// Factory
// ============================================================================

/// Zero-argument entity creator for one compiled type — what the cache hands
/// out; cheap to clone and share.
#[derive(Clone)]
pub struct EntityFactory {
    ty: Arc<EntityType>,
}

impl EntityFactory {
    pub(crate) fn new(ty: Arc<EntityType>) -> Self {
        Self { ty }
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// Build one entity.
    pub fn create(&self) -> Entity {
        Entity::new(Arc::clone(&self.ty))
    }

    /// Lazily build `count` entities. Fails `Range` when `count` is zero.
    pub fn batch(&self, count: usize) -> Result<Batch> {
        Batch::new(Arc::clone(&self.ty), count, None)
    }

    /// Lazily build `count` entities, running `init` on each with its index
    /// before it is yielded.
    pub fn batch_with<F>(&self, count: usize, init: F) -> Result<Batch>
    where
        F: FnMut(&mut Entity, usize) + 'static,
    {
        Batch::new(Arc::clone(&self.ty), count, Some(Box::new(init)))
    }
}

impl fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFactory")
            .field("contract", &self.ty.contract())
            .finish()
    }
}
