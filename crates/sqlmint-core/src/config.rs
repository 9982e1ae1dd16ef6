//! Process configuration consumed by the mapper.
//!
//! Built once at startup and handed to [`Mapper`](crate::Mapper); replacing it
//! invalidates every cached mapping plan and dialect.

use crate::{
    error::{Error, ErrorOrigin},
    model::ReservedColumn,
    types::DbType,
};
use serde::Deserialize;

///
/// Config
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Physical names of the six reserved bookkeeping columns.
    pub columns: ReservedColumnNames,

    /// Audit trail layout and storage.
    pub audit: AuditConfig,

    /// Whether updates, deletes, and recovers compare the version column.
    pub concurrency_check: bool,

    /// Feature flags applied to every entity unless it declares otherwise.
    pub defaults: FeatureDefaults,

    /// Dialect tuning.
    pub dialect: DialectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            columns: ReservedColumnNames::default(),
            audit: AuditConfig::default(),
            concurrency_check: true,
            defaults: FeatureDefaults::default(),
            dialect: DialectConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|err| {
            Error::configuration(ErrorOrigin::Config, format!("invalid configuration: {err}"))
        })
    }

    /// Physical column name for a reserved column.
    #[must_use]
    pub fn reserved_name(&self, column: ReservedColumn) -> &str {
        let names = &self.columns;

        match column {
            ReservedColumn::CreatedBy => &names.created_by,
            ReservedColumn::CreatedOn => &names.created_on,
            ReservedColumn::UpdatedBy => &names.updated_by,
            ReservedColumn::UpdatedOn => &names.updated_on,
            ReservedColumn::VersionNo => &names.version_no,
            ReservedColumn::IsActive => &names.is_active,
        }
    }
}

///
/// ReservedColumnNames
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReservedColumnNames {
    pub created_by: String,
    pub created_on: String,
    pub updated_by: String,
    pub updated_on: String,
    pub version_no: String,
    pub is_active: String,
}

impl Default for ReservedColumnNames {
    fn default() -> Self {
        Self {
            created_by: "created_by".to_string(),
            created_on: "created_on".to_string(),
            updated_by: "updated_by".to_string(),
            updated_on: "updated_on".to_string(),
            version_no: "version_no".to_string(),
            is_active: "is_active".to_string(),
        }
    }
}

///
/// AuditLayout
///
/// Physical shape of the audit trail.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuditLayout {
    /// One row per mutation, changed columns serialized as CSV.
    #[default]
    Csv,

    /// One header row per mutation plus one detail row per changed column.
    KeyValue,
}

///
/// AuditConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub layout: AuditLayout,

    /// Header table (CSV rows, or key-value headers).
    pub table: String,

    /// Detail table, key-value layout only.
    pub detail_table: String,

    /// Column type of created-by / updated-by identifiers in audit DDL.
    pub actor_type: DbType,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            layout: AuditLayout::Csv,
            table: "audit_trail".to_string(),
            detail_table: "audit_trail_detail".to_string(),
            actor_type: DbType::Int32,
        }
    }
}

///
/// FeatureDefaults
///

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureDefaults {
    pub needs_history: bool,
}

///
/// DialectConfig
///

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DialectConfig {
    /// SQL Server major version; below 11 offset paging uses ROW_NUMBER().
    pub sql_server_major_version: u32,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            sql_server_major_version: 16,
        }
    }
}
