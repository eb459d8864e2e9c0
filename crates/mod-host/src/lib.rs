//! Hosts extensions that amend the results of methods of a closed host application.
//!
//! Extensions declare [`OverrideEntry`]s against [`HostMethod`]s. The [`Loader`] registers them
//! into a [`Registry`] when the host loads, and the [`Dispatcher`] folds them over the result
//! of every intercepted call until the host unloads.

pub mod dispatch;
pub mod entry;
pub mod host;
pub mod loader;
pub mod method;
pub mod registry;

pub use lineage_mod_protocol::{ApplyMode, OverrideKey, OwnerId, Priority};

pub use self::{
    dispatch::{DispatchContext, Dispatched, Dispatcher, OverrideExecutionError},
    entry::OverrideEntry,
    host::{HostError, ModHost},
    loader::{ActivationError, ActivationReport, Extension, Loader, LoaderError, LoaderState, Overrides},
    method::{HostMethod, Truthy},
    registry::{RegisteredEntry, Registry, RegistryError},
};
