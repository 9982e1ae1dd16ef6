use crate::{connection::Parameter, types::Status, value::Value};

///
/// ReadQuery
///
/// Shape of a read, count, or paged request. Defaults to every readable
/// column of the table with the active-row filter applied.
///
/// A `source` replaces the table with a caller-supplied base query; the
/// status filter is not applied to it.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadQuery {
    pub columns: Option<Vec<String>>,
    pub filter: Option<String>,
    pub params: Vec<Parameter>,
    pub order_by: Option<String>,
    pub status: Status,
    pub source: Option<String>,
}

impl ReadQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from `sql` instead of the table.
    #[must_use]
    pub fn from_query(sql: impl Into<String>) -> Self {
        Self {
            source: Some(sql.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// `WHERE` text referencing `@name` parameters.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push(Parameter::from_value(name, value));
        self
    }

    #[must_use]
    pub fn params(mut self, params: impl IntoIterator<Item = Parameter>) -> Self {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}
