//! ## Crate layout
//! - `core`: runtime mapping plans, dialects, commands, audit, paging, and
//!   the repository surface.
//! - `derive`: the `Entity` derive macro that declares a record type.
//!
//! The `prelude` module carries everything an application needs to declare
//! entities and run repository calls.

pub use sqlmint_core as core;
pub use sqlmint_core::*;
pub use sqlmint_derive::Entity;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use sqlmint_core::prelude::*;
    pub use sqlmint_derive::Entity;
}
