use std::{
    collections::HashSet,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use eyre::eyre;
use lineage_mod_protocol::{ExtensionManifest, OverrideDecl, OwnerId};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    entry::OverrideEntry,
    method::HostMethod,
    registry::{Registry, RegistryError},
};

/// A module that contributes overrides to the host.
pub trait Extension: Send + Sync {
    /// Stable identifier that scopes everything this extension registers.
    fn owner(&self) -> OwnerId;

    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Declares the overrides this extension provides. Must not call into the host.
    fn declare(&self, overrides: &mut Overrides) -> eyre::Result<()>;

    /// The declaration surface of this extension, without registering anything.
    fn manifest(&self) -> eyre::Result<ExtensionManifest> {
        let mut overrides = Overrides::default();
        self.declare(&mut overrides)?;

        Ok(ExtensionManifest {
            owner: self.owner(),
            name: self.name().to_owned(),
            description: self.description().map(str::to_owned),
            overrides: overrides.decls().cloned().collect(),
        })
    }
}

type Registration = Box<dyn FnOnce(&Registry, &OwnerId) -> Result<(), RegistryError> + Send>;

/// Collects the overrides an [`Extension`] declares.
#[derive(Default)]
pub struct Overrides {
    decls: Vec<OverrideDecl>,
    registrations: Vec<Registration>,
}

impl Overrides {
    pub fn add<M: HostMethod>(&mut self, entry: OverrideEntry<M>) -> &mut Self {
        self.decls.push(entry.decl());
        self.registrations
            .push(Box::new(move |registry, owner| registry.register(owner, entry)));
        self
    }

    pub fn decls(&self) -> impl Iterator<Item = &OverrideDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.decls).finish()
    }
}

/// An extension could not be (fully) activated. Other extensions are unaffected.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("{owner} failed to declare its overrides: {report}")]
    Declaration { owner: OwnerId, report: eyre::Report },

    #[error("{owner} could not register {} of its overrides", .errors.len())]
    Registration {
        owner: OwnerId,
        errors: Vec<RegistryError>,
    },

    #[error("{owner} was activated more than once")]
    DuplicateOwner { owner: OwnerId },
}

impl ActivationError {
    pub fn owner(&self) -> &OwnerId {
        match self {
            Self::Declaration { owner, .. }
            | Self::Registration { owner, .. }
            | Self::DuplicateOwner { owner } => owner,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("the loader is already active")]
    AlreadyActive,

    #[error("the registry already holds {0} overrides that this loader does not own")]
    RegistryNotEmpty(usize),
}

#[derive(Debug, Default)]
pub struct ActivationReport {
    /// Owners whose overrides were all registered.
    pub activated: Vec<OwnerId>,

    /// Owners with at least one problem. Overrides that did register stay registered until
    /// deactivation.
    pub failed: Vec<ActivationError>,
}

impl ActivationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_owners(&self) -> impl Iterator<Item = &OwnerId> {
        self.failed.iter().map(ActivationError::owner)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoaderState {
    #[default]
    Uninitialized,
    Active,
}

/// Registers the overrides of a set of extensions and removes them again.
#[derive(Debug)]
pub struct Loader {
    registry: Arc<Registry>,
    state: LoaderState,
    owners: Vec<OwnerId>,
}

impl Loader {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: LoaderState::Uninitialized,
            owners: vec![],
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Owners this loader touched during activation, including ones that failed.
    pub fn owners(&self) -> &[OwnerId] {
        &self.owners
    }

    #[instrument(skip_all)]
    pub fn activate<'a, I>(&mut self, extensions: I) -> Result<ActivationReport, LoaderError>
    where
        I: IntoIterator<Item = &'a dyn Extension>,
    {
        if self.state == LoaderState::Active {
            return Err(LoaderError::AlreadyActive);
        }

        if !self.registry.is_empty() {
            return Err(LoaderError::RegistryNotEmpty(self.registry.len()));
        }

        self.state = LoaderState::Active;

        let mut report = ActivationReport::default();
        let mut seen = HashSet::new();

        for extension in extensions {
            let owner = extension.owner();

            if !seen.insert(owner.clone()) {
                warn!(%owner, "extension owner is already active, skipping");
                report.failed.push(ActivationError::DuplicateOwner { owner });
                continue;
            }

            self.owners.push(owner.clone());

            match self.activate_one(extension, &owner) {
                Ok(count) => {
                    info!(%owner, name = extension.name(), overrides = count, "activated extension");
                    report.activated.push(owner);
                }
                Err(e) => {
                    error!(%owner, name = extension.name(), error = %e, "failed to activate extension");
                    report.failed.push(e);
                }
            }
        }

        if !report.is_complete() {
            warn!(
                activated = report.activated.len(),
                failed = report.failed.len(),
                "activation was partial"
            );
        }

        Ok(report)
    }

    fn activate_one(
        &self,
        extension: &dyn Extension,
        owner: &OwnerId,
    ) -> Result<usize, ActivationError> {
        let mut overrides = Overrides::default();

        let declared = panic::catch_unwind(AssertUnwindSafe(|| extension.declare(&mut overrides)))
            .unwrap_or_else(|_| Err(eyre!("panicked while declaring overrides")));

        if let Err(report) = declared {
            return Err(ActivationError::Declaration {
                owner: owner.clone(),
                report,
            });
        }

        let mut errors = vec![];
        let mut count = 0;

        for register in overrides.registrations {
            match register(&self.registry, owner) {
                Ok(()) => count += 1,
                Err(e) => {
                    warn!(%owner, error = %e, "skipping override");
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(count)
        } else {
            Err(ActivationError::Registration {
                owner: owner.clone(),
                errors,
            })
        }
    }

    /// Removes everything registered by the owners of the last activation. Does nothing when
    /// the loader is not active.
    #[instrument(skip_all)]
    pub fn deactivate(&mut self) -> usize {
        if self.state == LoaderState::Uninitialized {
            debug!("loader is not active");
            return 0;
        }

        let removed = self
            .owners
            .drain(..)
            .map(|owner| self.registry.unregister_all(&owner))
            .sum();

        self.state = LoaderState::Uninitialized;

        info!(removed, "deactivated extensions");

        removed
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.deactivate();
    }
}
