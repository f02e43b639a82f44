//! Scheduling primitives shared by the webhook server and the reconciler.

#![cfg(feature = "framework")]

mod debounce;

pub use debounce::*;
