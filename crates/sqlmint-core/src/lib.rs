//! Core runtime for sqlmint: entity traits, values, mapping plans, dialects,
//! the command builder, audit trail, paging, and the repository surface.

extern crate self as sqlmint;

// public exports are one module level down
pub mod audit;
pub mod command;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod mapper;
pub mod model;
pub mod obs;
pub mod paging;
pub mod repository;
pub mod traits;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use config::Config;
pub use error::Error;
pub use mapper::Mapper;
pub use repository::{ReadQuery, Repository};

///
/// Prelude
///
/// Domain vocabulary for callers: the mapper, repositories, keys, and the
/// paging and status enums. Errors and dialect internals stay out.
///

pub mod prelude {
    pub use crate::{
        command::Key,
        config::Config,
        connection::{Connection, ConnectionSignature, DialectKind, Parameter, Row},
        mapper::Mapper,
        paging::{KeysetCursor, Navigation},
        repository::{ReadQuery, Repository},
        traits::{EntityKind as _, FieldValues as _},
        types::{DbType, ObjectKind, Status},
        value::Value,
    };
}
