//! Cancels superseded GitHub Actions runs for pull requests.
//!
//! Webhook deliveries announcing a requested `pull_request` run are coalesced by a
//! [`framework::Debouncer`]; once the burst goes quiet, a [`reconcile::Reconciler`] lists
//! in-flight runs and cancels every run that has a newer sibling for the same workflow and
//! branch.

pub mod env;
pub mod framework;
pub mod ingress;
pub mod reconcile;
pub mod shutdown;
pub mod workflow;

/// A shorthand to define a statically allocated variable using a [`std::sync::LazyLock`].
///
/// # Examples
///
/// ```rust
/// # use workflow_reaper::static_lazy_lock;
/// # use std::sync::LazyLock;
/// static_lazy_lock!{
///     pub VAR_1: String = String::from("a static variable");
/// }
/// // ...equals to...
/// pub static VAR_2: LazyLock<String> = LazyLock::new(|| String::from("a static variable"));
/// ```
#[macro_export]
macro_rules! static_lazy_lock {
    ($(#[$meta:meta])* $vis:vis $name:ident: $type:ty = $expr:expr $(;)?) => {
        $(#[$meta])*
        $vis static $name: $crate::__priv_macro_use::LazyLock<$type> =
            $crate::__priv_macro_use::LazyLock::new(|| $expr);
    };
}

#[doc(hidden)]
pub mod __priv_macro_use {
    pub use std::sync::LazyLock;
}
