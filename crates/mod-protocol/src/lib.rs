//! Data shared between lineage extensions, the host that activates them and the tooling that
//! inspects them. Nothing in this crate runs host code.

pub mod decl;
pub mod dependency;
pub mod key;
pub mod profile;

pub use decl::{ApplyMode, ExtensionManifest, OverrideDecl, OwnerId, Priority};
pub use key::{KeyParseError, OverrideKey};
pub use profile::{ExtensionRef, ModProfile};
