use lineage_mod_protocol::OverrideKey;

/// A host method that overrides can be attached to.
///
/// Implementors are usually zero-sized marker types. The associated types pin down the shape of
/// the call so that every override registered for [`HostMethod::KEY`] agrees on it.
pub trait HostMethod: 'static {
    const KEY: OverrideKey;

    /// The object the method is invoked on.
    type Receiver: ?Sized + 'static;

    /// Arguments of the call, excluding the receiver. Use a tuple for more than one.
    type Args: 'static;

    type Output: Truthy + 'static;
}

/// Declares marker types implementing [`HostMethod`].
///
/// ```
/// lineage_mod_host::host_method! {
///     /// `Character.getAge(turn)`
///     pub CharacterAge: "Character"::"getAge" => fn(&str, u32) -> u32;
/// }
/// ```
#[macro_export]
macro_rules! host_method {
    (
        $(
            $(#[$meta:meta])*
            $vs:vis $name:ident: $declaring_type:literal::$method:literal
                => fn(&$receiver:ty $(, $args:ty)?) -> $output:ty;
        )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug)]
            $vs struct $name;

            impl $crate::HostMethod for $name {
                const KEY: $crate::OverrideKey = $crate::OverrideKey::new($declaring_type, $method);
                type Receiver = $receiver;
                type Args = ($($args)?);
                type Output = $output;
            }
        )*
    };
}

/// Whether a result counts as already decided for [`ApplyMode::OnlyIfFalsy`] overrides.
///
/// [`ApplyMode::OnlyIfFalsy`]: lineage_mod_protocol::ApplyMode::OnlyIfFalsy
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    #[inline]
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for () {
    #[inline]
    fn is_truthy(&self) -> bool {
        false
    }
}

impl<T> Truthy for Option<T> {
    #[inline]
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T> Truthy for Vec<T> {
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &'static str {
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! truthy_int {
    ($($ty:ty),*) => {
        $(
            impl Truthy for $ty {
                #[inline]
                fn is_truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
