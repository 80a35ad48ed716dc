//! Route staging: definitions, the fluent controller builder, and the
//! collection that freezes them into a route table.
//!
//! ## Overview
//!
//! Routes are not registered directly. Calling code stages them:
//!
//! 1. [`ControllerCollection::match_route`] (or the `get`/`post`/`put`/
//!    `delete` sugar) clones the collection's template route, binds the
//!    handler, and returns a shared [`Controller`] for fluent per-route
//!    configuration (`assert`, `value`, `convert`, `method`, ...).
//! 2. Collection-wide calls apply the same configuration to the template
//!    *and* retroactively to everything already staged, including mounted
//!    sub-collections.
//! 3. [`ControllerCollection::flush`] names, freezes, and drains the staged
//!    controllers into an immutable [`crate::router::RouteTable`].
//!
//! After the flush a controller is frozen: rebinding its name fails with
//! [`crate::errors::FrozenControllerError`].

mod collection;
mod controller;
mod core;

pub use collection::ControllerCollection;
pub use controller::Controller;
pub use core::Route;
