use std::{
    any::Any,
    convert::Infallible,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use lineage_mod_protocol::{ApplyMode, OverrideKey, OwnerId, Priority};
use thiserror::Error;
use tracing::{error, trace};

use crate::{
    method::{HostMethod, Truthy},
    registry::{RegisteredEntry, Registry},
};

/// What an override sees of the intercepted call. Lives only for the duration of the call.
pub struct DispatchContext<'a, M: HostMethod> {
    receiver: &'a M::Receiver,
    args: &'a M::Args,
}

impl<'a, M: HostMethod> DispatchContext<'a, M> {
    pub fn new(receiver: &'a M::Receiver, args: &'a M::Args) -> Self {
        Self { receiver, args }
    }

    #[inline]
    pub fn receiver(&self) -> &'a M::Receiver {
        self.receiver
    }

    #[inline]
    pub fn args(&self) -> &'a M::Args {
        self.args
    }

    #[inline]
    pub fn key(&self) -> OverrideKey {
        M::KEY
    }
}

impl<M: HostMethod> fmt::Debug for DispatchContext<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("key", &M::KEY)
            .finish_non_exhaustive()
    }
}

/// An override failed while amending a result. The failure never reaches the caller of the
/// intercepted method.
#[derive(Debug, Error)]
pub enum OverrideExecutionError {
    #[error("override {handler} ({owner}, priority {priority}) for {key} failed: {report}")]
    Failed {
        key: OverrideKey,
        owner: OwnerId,
        handler: String,
        priority: Priority,
        report: eyre::Report,
    },

    #[error("override {handler} ({owner}, priority {priority}) for {key} panicked: {message}")]
    Panicked {
        key: OverrideKey,
        owner: OwnerId,
        handler: String,
        priority: Priority,
        message: String,
    },

    #[error("override {handler} ({owner}) is registered for {key} with a different signature")]
    SignatureMismatch {
        key: OverrideKey,
        owner: OwnerId,
        handler: String,
    },
}

impl OverrideExecutionError {
    pub fn owner(&self) -> &OwnerId {
        match self {
            Self::Failed { owner, .. }
            | Self::Panicked { owner, .. }
            | Self::SignatureMismatch { owner, .. } => owner,
        }
    }

    pub fn handler(&self) -> &str {
        match self {
            Self::Failed { handler, .. }
            | Self::Panicked { handler, .. }
            | Self::SignatureMismatch { handler, .. } => handler,
        }
    }
}

/// The result of folding overrides over an original result.
#[derive(Debug)]
pub struct Dispatched<T> {
    pub result: T,
    pub failures: Vec<OverrideExecutionError>,
}

/// Runs original host methods and layers the registered overrides on top of their results.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Calls `original` once, then applies every override registered for `M` in priority
    /// order.
    pub fn dispatch<M, F>(&self, receiver: &M::Receiver, args: &M::Args, original: F) -> M::Output
    where
        M: HostMethod,
        F: FnOnce(&M::Receiver, &M::Args) -> M::Output,
    {
        let result = self.try_dispatch::<M, Infallible, _>(receiver, args, |receiver, args| {
            Ok(original(receiver, args))
        });

        match result {
            Ok(output) => output,
            Err(never) => match never {},
        }
    }

    /// Like [`Dispatcher::dispatch`] for fallible originals. An error from `original` is
    /// returned untouched and no override runs.
    pub fn try_dispatch<M, E, F>(
        &self,
        receiver: &M::Receiver,
        args: &M::Args,
        original: F,
    ) -> Result<M::Output, E>
    where
        M: HostMethod,
        F: FnOnce(&M::Receiver, &M::Args) -> Result<M::Output, E>,
    {
        let result = original(receiver, args)?;

        Ok(self.fold::<M>(receiver, args, result).result)
    }

    /// Applies the overrides registered for `M` to a result the original method already
    /// produced, returning the final result along with every isolated failure.
    pub fn fold<M: HostMethod>(
        &self,
        receiver: &M::Receiver,
        args: &M::Args,
        mut result: M::Output,
    ) -> Dispatched<M::Output> {
        let entries = self.registry.lookup(&M::KEY);
        let mut failures = vec![];

        if entries.is_empty() {
            return Dispatched { result, failures };
        }

        let context = DispatchContext::<M>::new(receiver, args);

        for registered in &entries {
            match apply_entry(registered, &context, &result) {
                Ok(Some(output)) => result = output,
                Ok(None) => {}
                Err(failure) => {
                    error!(
                        key = %registered.key(),
                        owner = %registered.owner(),
                        handler = registered.handler(),
                        priority = %registered.priority(),
                        error = %failure,
                        "override failed, keeping previous result"
                    );

                    failures.push(failure);
                }
            }
        }

        Dispatched { result, failures }
    }
}

/// Runs one entry. `Ok(None)` means the entry was skipped.
fn apply_entry<M: HostMethod>(
    registered: &RegisteredEntry,
    context: &DispatchContext<'_, M>,
    current: &M::Output,
) -> Result<Option<M::Output>, OverrideExecutionError> {
    let Some(entry) = registered.typed::<M>() else {
        return Err(OverrideExecutionError::SignatureMismatch {
            key: M::KEY,
            owner: registered.owner().clone(),
            handler: registered.handler().to_owned(),
        });
    };

    if entry.mode() == ApplyMode::OnlyIfFalsy && current.is_truthy() {
        trace!(handler = registered.handler(), "result already decided, skipping");
        return Ok(None);
    }

    match panic::catch_unwind(AssertUnwindSafe(|| entry.apply(context, current))) {
        Ok(Ok(output)) => Ok(Some(output)),
        Ok(Err(report)) => Err(OverrideExecutionError::Failed {
            key: M::KEY,
            owner: registered.owner().clone(),
            handler: registered.handler().to_owned(),
            priority: registered.priority(),
            report,
        }),
        Err(payload) => Err(OverrideExecutionError::Panicked {
            key: M::KEY,
            owner: registered.owner().clone(),
            handler: registered.handler().to_owned(),
            priority: registered.priority(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use eyre::eyre;
    use lineage_mod_protocol::{ApplyMode, OverrideKey, OwnerId, Priority};

    use super::{Dispatcher, OverrideExecutionError};
    use crate::{entry::OverrideEntry, method::HostMethod, registry::Registry};

    const OWNER: OwnerId = OwnerId::new("com.example.dispatch");

    struct Eligible;

    impl HostMethod for Eligible {
        const KEY: OverrideKey = OverrideKey::new("Character", "isEligible");
        type Receiver = ();
        type Args = ();
        type Output = bool;
    }

    struct Lineage;

    impl HostMethod for Lineage {
        const KEY: OverrideKey = OverrideKey::new("Character", "lineage");
        type Receiver = ();
        type Args = u32;
        type Output = Vec<&'static str>;
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(Registry::new()))
    }

    fn register<M: HostMethod>(dispatcher: &Dispatcher, entry: OverrideEntry<M>) {
        dispatcher
            .registry()
            .register(&OWNER, entry)
            .expect("entry registers");
    }

    #[test]
    fn no_entries_returns_original_result() {
        let dispatcher = dispatcher();

        assert!(dispatcher.dispatch::<Eligible, _>(&(), &(), |_, _| true));
        assert!(!dispatcher.dispatch::<Eligible, _>(&(), &(), |_, _| false));
    }

    #[test]
    fn only_if_falsy_skips_truthy_results() {
        let dispatcher = dispatcher();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        register(
            &dispatcher,
            OverrideEntry::<Eligible>::new("counted", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
            .with_mode(ApplyMode::OnlyIfFalsy),
        );

        assert!(dispatcher.dispatch::<Eligible, _>(&(), &(), |_, _| true));
        assert_eq!(0, calls.load(Ordering::SeqCst));

        assert!(dispatcher.dispatch::<Eligible, _>(&(), &(), |_, _| false));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn first_satisfied_only_if_falsy_entry_wins() {
        let dispatcher = dispatcher();
        let calls = Arc::new(AtomicUsize::new(0));

        for priority in [1, 2] {
            let counter = calls.clone();
            register(
                &dispatcher,
                OverrideEntry::<Eligible>::new(format!("p{priority}"), move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                })
                .with_mode(ApplyMode::OnlyIfFalsy)
                .with_priority(Priority(priority)),
            );
        }

        assert!(dispatcher.dispatch::<Eligible, _>(&(), &(), |_, _| false));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn entries_run_in_priority_then_registration_order() {
        let dispatcher = dispatcher();
        let order = Arc::new(Mutex::new(vec![]));

        for (name, priority) in [("A", 5), ("B", 1), ("C", 5)] {
            let order = order.clone();
            register(
                &dispatcher,
                OverrideEntry::<Lineage>::new(name, move |_, current: &Vec<&'static str>| {
                    order.lock().unwrap().push(name);

                    let mut next = current.clone();
                    next.push(name);
                    Ok(next)
                })
                .with_priority(Priority(priority)),
            );
        }

        let result = dispatcher.dispatch::<Lineage, _>(&(), &0, |_, _| vec![]);

        assert_eq!(vec!["B", "A", "C"], *order.lock().unwrap());
        assert_eq!(vec!["B", "A", "C"], result);
    }

    #[test]
    fn failing_entries_are_isolated() {
        let dispatcher = dispatcher();

        register(
            &dispatcher,
            OverrideEntry::<Lineage>::new("ok1", |_, current: &Vec<&'static str>| {
                let mut next = current.clone();
                next.push("ok1");
                Ok(next)
            })
            .with_priority(Priority(1)),
        );
        register(
            &dispatcher,
            OverrideEntry::<Lineage>::new("fail", |_, _| Err(eyre!("no heir")))
                .with_priority(Priority(2)),
        );
        register(
            &dispatcher,
            OverrideEntry::<Lineage>::new("panic", |_, _| panic!("bad extension"))
                .with_priority(Priority(3)),
        );
        register(
            &dispatcher,
            OverrideEntry::<Lineage>::new("ok2", |context, current: &Vec<&'static str>| {
                assert_eq!(7, *context.args());

                let mut next = current.clone();
                next.push("ok2");
                Ok(next)
            })
            .with_priority(Priority(4)),
        );

        let dispatched = dispatcher.fold::<Lineage>(&(), &7, vec!["original"]);

        assert_eq!(vec!["original", "ok1", "ok2"], dispatched.result);
        assert_eq!(2, dispatched.failures.len());
        assert!(matches!(
            &dispatched.failures[0],
            OverrideExecutionError::Failed { handler, .. } if handler == "fail"
        ));
        assert!(matches!(
            &dispatched.failures[1],
            OverrideExecutionError::Panicked { message, .. } if message == "bad extension"
        ));
        assert_eq!(&OWNER, dispatched.failures[1].owner());
    }

    #[test]
    fn original_errors_propagate_without_running_overrides() {
        let dispatcher = dispatcher();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        register(
            &dispatcher,
            OverrideEntry::<Eligible>::new("counted", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }),
        );

        let result =
            dispatcher.try_dispatch::<Eligible, _, _>(&(), &(), |_, _| Err("host failure"));

        assert_eq!(Err("host failure"), result);
        assert_eq!(0, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn original_runs_exactly_once_before_overrides() {
        let dispatcher = dispatcher();
        let events = Arc::new(Mutex::new(vec![]));
        let log = events.clone();

        register(
            &dispatcher,
            OverrideEntry::<Eligible>::new("observer", move |_, current| {
                log.lock().unwrap().push("override");
                Ok(*current)
            }),
        );

        let result = dispatcher.dispatch::<Eligible, _>(&(), &(), |_, _| {
            events.lock().unwrap().push("original");
            true
        });

        assert!(result);
        assert_eq!(vec!["original", "override"], *events.lock().unwrap());
    }

    #[test]
    fn context_exposes_the_receiver() {
        struct Named;

        impl HostMethod for Named {
            const KEY: OverrideKey = OverrideKey::new("Character", "displayName");
            type Receiver = str;
            type Args = ();
            type Output = String;
        }

        let dispatcher = dispatcher();
        register(
            &dispatcher,
            OverrideEntry::<Named>::new("suffix", |context, _| {
                Ok(format!("{} the Younger", context.receiver()))
            })
            .with_mode(ApplyMode::Replace),
        );

        let name = dispatcher.dispatch::<Named, _>("Seleucus", &(), |receiver, _| {
            receiver.to_owned()
        });

        assert_eq!("Seleucus the Younger", name);
    }
}
