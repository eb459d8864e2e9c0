use std::{
    any::TypeId,
    borrow::Cow,
    fmt,
    mem,
    sync::Arc,
};

use lineage_mod_protocol::{ApplyMode, OverrideDecl, OverrideKey, Priority};

use crate::{dispatch::DispatchContext, method::HostMethod};

/// Body of an override: receives the call context and the running result, returns the new
/// result.
pub type ApplyFn<M> = dyn Fn(&DispatchContext<'_, M>, &<M as HostMethod>::Output) -> eyre::Result<<M as HostMethod>::Output>
    + Send
    + Sync;

/// What makes two entries "the same" for duplicate detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum EntryIdentity {
    /// A function item. Every function has its own type, even when the optimizer merges
    /// identical bodies into one address.
    Function(TypeId),

    /// A closure or function pointer, identified by its shared allocation.
    Allocation(usize),
}

/// A rule that may amend the result of `M` after the original implementation ran.
///
/// Cloning an entry is cheap and the clone shares the identity of the original, so
/// registering both under the same key is rejected as a duplicate.
pub struct OverrideEntry<M: HostMethod> {
    priority: Priority,
    mode: ApplyMode,
    handler: Cow<'static, str>,
    identity: EntryIdentity,
    apply: Arc<ApplyFn<M>>,
}

impl<M: HostMethod> OverrideEntry<M> {
    /// Creates an entry from a function. Entries created from the same function share an
    /// identity.
    ///
    /// Passing a function pointer instead of a function item gives every call a distinct
    /// identity, like [`OverrideEntry::new`].
    pub fn from_fn<F>(handler: &'static str, apply: F) -> Self
    where
        F: Fn(&DispatchContext<'_, M>, &M::Output) -> eyre::Result<M::Output>
            + Copy
            + Send
            + Sync
            + 'static,
    {
        if mem::size_of::<F>() != 0 {
            return Self::new(handler, apply);
        }

        Self {
            priority: Priority::default(),
            mode: ApplyMode::default(),
            handler: Cow::Borrowed(handler),
            identity: EntryIdentity::Function(TypeId::of::<F>()),
            apply: Arc::new(apply),
        }
    }

    /// Creates an entry from a closure. Every call produces a distinct identity.
    pub fn new<H, F>(handler: H, apply: F) -> Self
    where
        H: Into<Cow<'static, str>>,
        F: Fn(&DispatchContext<'_, M>, &M::Output) -> eyre::Result<M::Output>
            + Send
            + Sync
            + 'static,
    {
        let apply: Arc<ApplyFn<M>> = Arc::new(apply);

        Self {
            priority: Priority::default(),
            mode: ApplyMode::default(),
            handler: handler.into(),
            identity: EntryIdentity::Allocation(Arc::as_ptr(&apply) as *const () as usize),
            apply,
        }
    }

    pub fn with_priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    pub fn with_mode(self, mode: ApplyMode) -> Self {
        Self { mode, ..self }
    }

    #[inline]
    pub fn key(&self) -> OverrideKey {
        M::KEY
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    #[inline]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    #[inline]
    pub(crate) fn identity(&self) -> EntryIdentity {
        self.identity
    }

    pub fn decl(&self) -> OverrideDecl {
        OverrideDecl {
            key: M::KEY,
            priority: self.priority,
            mode: self.mode,
            handler: self.handler.to_string(),
        }
    }

    pub(crate) fn apply(
        &self,
        context: &DispatchContext<'_, M>,
        current: &M::Output,
    ) -> eyre::Result<M::Output> {
        (self.apply)(context, current)
    }
}

impl<M: HostMethod> Clone for OverrideEntry<M> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            mode: self.mode,
            handler: self.handler.clone(),
            identity: self.identity,
            apply: self.apply.clone(),
        }
    }
}

impl<M: HostMethod> fmt::Debug for OverrideEntry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideEntry")
            .field("key", &M::KEY)
            .field("priority", &self.priority)
            .field("mode", &self.mode)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use lineage_mod_protocol::{ApplyMode, OverrideKey, Priority};

    use super::OverrideEntry;
    use crate::{dispatch::DispatchContext, method::HostMethod};

    struct Greeting;

    impl HostMethod for Greeting {
        const KEY: OverrideKey = OverrideKey::new("Court", "greeting");
        type Receiver = ();
        type Args = ();
        type Output = String;
    }

    fn shout(_: &DispatchContext<'_, Greeting>, current: &String) -> eyre::Result<String> {
        Ok(current.to_uppercase())
    }

    fn keep_a(_: &DispatchContext<'_, Greeting>, current: &String) -> eyre::Result<String> {
        Ok(current.clone())
    }

    fn keep_b(_: &DispatchContext<'_, Greeting>, current: &String) -> eyre::Result<String> {
        Ok(current.clone())
    }

    #[test]
    fn entries_from_the_same_fn_share_identity() {
        let a = OverrideEntry::<Greeting>::from_fn("shout", shout);
        let b = OverrideEntry::<Greeting>::from_fn("shout", shout);

        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn identical_functions_have_distinct_identities() {
        let a = OverrideEntry::<Greeting>::from_fn("keep_a", keep_a);
        let b = OverrideEntry::<Greeting>::from_fn("keep_b", keep_b);

        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn function_pointers_are_not_shared() {
        type Pointer = fn(&DispatchContext<'_, Greeting>, &String) -> eyre::Result<String>;

        let a = OverrideEntry::<Greeting>::from_fn("shout", shout as Pointer);
        let b = OverrideEntry::<Greeting>::from_fn("shout", shout as Pointer);

        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn closure_entries_are_distinct_but_clones_are_not() {
        let a = OverrideEntry::<Greeting>::new("a", |_, current| Ok(current.clone()));
        let b = OverrideEntry::<Greeting>::new("b", |_, current| Ok(current.clone()));

        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.identity(), a.clone().identity());
    }

    #[test]
    fn declaration_defaults() {
        let entry = OverrideEntry::<Greeting>::from_fn("shout", shout);
        let decl = entry.decl();

        assert_eq!(Priority::NORMAL, decl.priority);
        assert_eq!(ApplyMode::Chain, decl.mode);
        assert_eq!(Greeting::KEY, decl.key);
        assert_eq!("shout", decl.handler);

        let decl = entry
            .with_priority(Priority::FIRST)
            .with_mode(ApplyMode::Replace)
            .decl();

        assert_eq!(Priority::FIRST, decl.priority);
        assert_eq!(ApplyMode::Replace, decl.mode);
    }
}
