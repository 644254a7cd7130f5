//! Small helpers shared by the importer library and its command line tool.

use std::fmt::Debug;

pub mod text;

/// Trait that allows discarding values.
pub trait Discard {
    /// Consumes and discards the value.
    /// May panic if debug assertions are enabled.
    fn discard(self);
}

impl<T, E: Debug> Discard for Result<T, E> {
    /// Consumes and discards the value.
    /// If debug assertions are enabled, panics if it holds an error.
    ///
    /// Intended for results that cannot fail in practice, such as formatting into a [`String`].
    fn discard(self) {
        #[cfg(debug_assertions)]
        drop(self.unwrap());

        #[cfg(not(debug_assertions))]
        drop(self);
    }
}

/// Defines a simple error type with a fixed message or implements
/// [`Display`](std::fmt::Display) and [`Error`](std::error::Error) for an existing type.
///
/// # Examples
///
/// A unit struct:
/// ```
/// utils::define_simple_error!(
///     /// Nothing to see here.
///     EmptyError: "the input was empty"
/// );
///
/// assert_eq!(EmptyError.to_string(), "the input was empty");
/// ```
///
/// A struct that cannot be constructed outside its module:
/// ```
/// utils::define_simple_error!(SealedError(()): "sealed");
/// assert_eq!(SealedError(()).to_string(), "sealed");
/// ```
///
/// Or an existing type, binding `self` to a name:
/// ```
/// #[derive(Debug)]
/// struct CountError { count: usize }
///
/// utils::define_simple_error!(
///     @main
///     CountError:
///     e => "got {} items", e.count
/// );
///
/// assert_eq!(CountError { count: 3 }.to_string(), "got 3 items");
/// ```
#[macro_export]
macro_rules! define_simple_error {
    (@main $name:ident: $e:ident => $($fmt:tt)*) => {
        impl ::std::error::Error for $name {}

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let $e = self;
                write!(f, $($fmt)*)
            }
        }
    };
    ($(#[$attr:meta])* $name:ident(()): $message:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(());

        $crate::define_simple_error!(@main $name: _e => $message);
    };
    ($(#[$attr:meta])* $name:ident: $message:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        $crate::define_simple_error!(@main $name: _e => $message);
    };
}
