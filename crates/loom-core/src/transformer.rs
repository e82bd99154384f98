//! Handle to the active class transformer.
//!
//! The transformation engine lives outside this crate. The registry only
//! stores a handle to it on the blackboard and, when asked to audit, invokes
//! the engine's audit capability if the engine exposes one.

use std::sync::Arc;

/// Blackboard key for the active transformer handle.
pub const TRANSFORMER_KEY: &str = "loom.transformer";

/// Audit capability of a transformer.
pub trait Audit: Send + Sync {
    /// Run the transformer's audit pass.
    fn audit(&self);
}

/// The external class transformer, as seen by the registry.
pub trait Transformer: Send + Sync {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// The audit capability, if this transformer has one.
    fn as_audit(&self) -> Option<&dyn Audit> {
        None
    }
}

/// Blackboard wrapper around a shared transformer.
#[derive(Clone)]
pub struct TransformerHandle(pub Arc<dyn Transformer>);

impl core::fmt::Debug for TransformerHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("TransformerHandle").field(&self.0.name()).finish()
    }
}
