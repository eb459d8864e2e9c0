use std::{
    fmt::Debug,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::{
    dispatch::Dispatcher,
    loader::{ActivationReport, Extension, Loader, LoaderError},
    method::HostMethod,
    registry::Registry,
};

static ATTACHED_INSTANCE: RwLock<Option<ModHost>> = RwLock::new(None);

#[derive(Debug, Error)]
pub enum HostError {
    #[error("a mod host is already attached")]
    AlreadyAttached,

    #[error("no mod host is attached")]
    NotAttached,

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Owns the registry, dispatcher and loader for one load/unload lifecycle of the host
/// application.
pub struct ModHost {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    loader: Loader,
}

impl Debug for ModHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModHost")
            .field("registry", &self.registry)
            .field("loader", &self.loader.state())
            .finish()
    }
}

impl Default for ModHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ModHost {
    /// A detached host with an empty registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        Self {
            dispatcher: Dispatcher::new(registry.clone()),
            loader: Loader::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn activate<'a, I>(&mut self, extensions: I) -> Result<ActivationReport, LoaderError>
    where
        I: IntoIterator<Item = &'a dyn Extension>,
    {
        self.loader.activate(extensions)
    }

    pub fn deactivate(&mut self) -> usize {
        self.loader.deactivate()
    }

    fn attached() -> RwLockReadGuard<'static, Option<ModHost>> {
        match ATTACHED_INSTANCE.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn attached_mut() -> RwLockWriteGuard<'static, Option<ModHost>> {
        match ATTACHED_INSTANCE.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn is_attached() -> bool {
        Self::attached().is_some()
    }

    /// Runs `f` against the attached host, if there is one.
    pub fn with_attached<R>(f: impl FnOnce(&ModHost) -> R) -> Option<R> {
        Self::attached().as_ref().map(f)
    }

    /// Entry point for the host application's load hook. Activates `extensions` and attaches
    /// the resulting host process-wide.
    ///
    /// Extension failures are reported, never fatal: the host stays attached with whatever
    /// could be activated.
    #[instrument(skip_all)]
    pub fn on_load<'a, I>(extensions: I) -> Result<ActivationReport, HostError>
    where
        I: IntoIterator<Item = &'a dyn Extension>,
    {
        let mut attached = Self::attached_mut();

        if attached.is_some() {
            warn!("load hook called while a host is already attached");
            return Err(HostError::AlreadyAttached);
        }

        let mut host = ModHost::new();
        let report = host.activate(extensions)?;

        for failure in &report.failed {
            error!(owner = %failure.owner(), error = %failure, "extension failed to activate");
        }

        info!(
            activated = report.activated.len(),
            failed = report.failed.len(),
            overrides = host.registry.len(),
            "mod host attached"
        );

        *attached = Some(host);

        Ok(report)
    }

    /// Entry point for the host application's unload hook. Removes every override and detaches
    /// the host.
    #[instrument]
    pub fn on_unload() -> Result<(), HostError> {
        let Some(mut host) = Self::attached_mut().take() else {
            warn!("unload hook called without an attached host");
            return Err(HostError::NotAttached);
        };

        let removed = host.deactivate();
        info!(removed, "mod host detached");

        Ok(())
    }

    /// Dispatches a call to `M` through the attached host. Without an attached host the
    /// original runs alone.
    pub fn dispatch<M, F>(receiver: &M::Receiver, args: &M::Args, original: F) -> M::Output
    where
        M: HostMethod,
        F: FnOnce(&M::Receiver, &M::Args) -> M::Output,
    {
        // Released before dispatching so that overrides may call back into the host.
        let dispatcher = Self::with_attached(|host| host.dispatcher.clone());

        match dispatcher {
            Some(dispatcher) => dispatcher.dispatch::<M, F>(receiver, args, original),
            None => original(receiver, args),
        }
    }
}
