//! Webhook building blocks for Gardener provider extensions
//!
//! The generic mutator dispatches admitted control plane objects to a
//! provider [`Ensurer`]; the remaining modules are the idempotent helpers
//! ensurers are written with.

#![deny(missing_docs)]

pub mod admission;
pub mod codec;
pub mod controlplane;
pub mod flags;
pub mod genericmutator;
pub mod merge;

pub use genericmutator::{Codecs, Ensurer, Hook, Mutator, NoopEnsurer, Object};
