//! # entity-rs — Runtime Entity-Schema Compiler
//!
//! Compiles property-only contracts into lightweight, trackable records.
//!
//! ## Design Principles
//!
//! 1. **Compile once**: a contract is analyzed and synthesized exactly once
//!    per process; every instance shares one [`EntityType`]
//! 2. **Clean DTOs**: `Contract`, `PropertyDecl`, `Value` are pure data and
//!    cross all boundaries
//! 3. **Generic representation**: no runtime type emission — a value-slot
//!    array indexed by ordinal plus a name→token table covers every schema
//! 4. **Sparse by assignment**: the change mask records "explicitly assigned
//!    a different value," and `try_get` exposes exactly that view
//!
//! ## Quick Start
//!
//! ```rust
//! use entity_rs::{Contract, EntityRegistry, Value, ValueKind};
//!
//! # fn example() -> entity_rs::Result<()> {
//! let contract = Contract::builder("ICustomer")
//!     .property("Id", ValueKind::Int)
//!     .property("Name", ValueKind::String)
//!     .build();
//!
//! let mut entity = EntityRegistry::global().build(&contract)?;
//! assert!(!entity.has_changes());
//!
//! entity.set("Name", "Ada")?;
//! assert!(entity.has_changes());
//! assert_eq!(entity.try_get("Name")?, Some(Value::from("Ada")));
//! assert_eq!(entity.try_get("Id")?, None); // unassigned stays invisible
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! | Surface | Guarantee |
//! |---------|-----------|
//! | Registry | Concurrent reads, single-writer compiles, compile-once |
//! | Entity get/set | `&mut` — caller-serialized, not internally locked |
//! | Subscribe/unsubscribe | Lock-free, safe under concurrent writers |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod mask;
pub mod compile;
pub mod entity;
pub mod notify;
pub mod batch;

use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Contract, ContractBuilder, PropertyDecl,
    HookDirectory, HookGetter, HookSetter, PropertyHooks,
    Value, ValueKind,
};

// ============================================================================
// Re-exports: Schema & compilation
// ============================================================================

pub use schema::{AnalyzerOptions, PropertyDescriptor, Schema};
pub use mask::{ChangeMask, MaskShape};
pub use compile::{EntityFactory, EntityType, PropertyToken};

// ============================================================================
// Re-exports: Runtime
// ============================================================================

pub use entity::{Changeset, Entity, FromValue};
pub use notify::{ChangeCallback, NotificationChannel, SubscriptionId};
pub use batch::Batch;

// ============================================================================
// Entity registry (the compiled-type cache)
// ============================================================================

/// Compiled-type cache with a single-compile guarantee.
///
/// The read-lock fast path serves cached factories; a miss takes the write
/// lock, double-checks, and runs analysis + synthesis at most once per
/// contract name. Failed compilations are never cached — a later call
/// re-validates from scratch.
///
/// Most callers want the process-wide [`EntityRegistry::global`]; isolated
/// registries are mainly useful for tests and for custom
/// [`AnalyzerOptions`].
pub struct EntityRegistry {
    cache: RwLock<HashMap<String, Arc<EntityType>>>,
    compilations: AtomicU64,
    options: AnalyzerOptions,
}

/// Registry counters exposed for telemetry and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Distinct compiled types currently cached.
    pub compiled_types: usize,
    /// Total analysis+synthesis runs since the registry was created.
    pub compilations: u64,
}

impl EntityRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static EntityRegistry {
        static GLOBAL: OnceLock<EntityRegistry> = OnceLock::new();
        GLOBAL.get_or_init(EntityRegistry::new)
    }

    /// An isolated registry with default analysis options.
    pub fn new() -> Self {
        Self::with_options(AnalyzerOptions::default())
    }

    pub fn with_options(options: AnalyzerOptions) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            compilations: AtomicU64::new(0),
            options,
        }
    }

    /// Get (or compile) the factory for a contract. Hooks are resolved once,
    /// at analysis time — later calls for a cached contract ignore them.
    pub fn creator(&self, contract: &Contract, hooks: &HookDirectory) -> Result<EntityFactory> {
        {
            let cache = self.cache.read();
            if let Some(ty) = cache.get(contract.name()) {
                tracing::debug!(contract = contract.name(), "schema cache hit");
                return Ok(EntityFactory::new(Arc::clone(ty)));
            }
        }

        let mut cache = self.cache.write();
        if let Some(ty) = cache.get(contract.name()) {
            return Ok(EntityFactory::new(Arc::clone(ty)));
        }

        let analyzed = schema::analyze(contract, hooks, &self.options)?;
        let ty = compile::compile(analyzed);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        cache.insert(contract.name().to_owned(), Arc::clone(&ty));
        Ok(EntityFactory::new(ty))
    }

    /// Build one entity of a hook-free contract.
    pub fn build(&self, contract: &Contract) -> Result<Entity> {
        Ok(self.creator(contract, &HookDirectory::default())?.create())
    }

    /// Lazily build `count` entities of a hook-free contract.
    pub fn build_many(&self, contract: &Contract, count: usize) -> Result<Batch> {
        self.creator(contract, &HookDirectory::default())?.batch(count)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            compiled_types: self.cache.read().len(),
            compilations: self.compilations.load(Ordering::Relaxed),
        }
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("schema error in contract '{contract}': {message}")]
    Schema { contract: String, message: String },

    #[error("configuration error for property '{property}': {message}")]
    Configuration { property: String, message: String },

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("batch count must be at least 1, got {0}")]
    Range(usize),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },
}

pub type Result<T> = std::result::Result<T, Error>;
