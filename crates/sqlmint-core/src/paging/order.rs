use crate::error::{Error, ErrorOrigin};
use derive_more::Display;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum Direction {
    #[default]
    #[display("ASC")]
    Asc,
    #[display("DESC")]
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

///
/// OrderTerm
/// One `column [ASC|DESC]` term of an ordering expression.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
}

impl OrderTerm {
    #[must_use]
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Asc)
    }

    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Desc)
    }

    #[must_use]
    pub fn inverted(&self) -> Self {
        Self::new(self.column.clone(), self.direction.invert())
    }
}

/// Parse `"a DESC, b, c asc"`. A term without a direction is ascending.
pub fn parse_order_by(text: &str) -> Result<Vec<OrderTerm>, Error> {
    let mut terms = Vec::new();

    for raw in text.split(',') {
        let mut parts = raw.split_whitespace();
        let Some(column) = parts.next() else {
            return Err(Error::configuration(
                ErrorOrigin::Paging,
                format!("empty term in order by '{text}'"),
            ));
        };

        let direction = match parts.next() {
            None => Direction::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => Direction::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
            Some(other) => {
                return Err(Error::configuration(
                    ErrorOrigin::Paging,
                    format!("unknown sort direction '{other}' in order by '{text}'"),
                ));
            }
        };

        if let Some(extra) = parts.next() {
            return Err(Error::configuration(
                ErrorOrigin::Paging,
                format!("unexpected '{extra}' in order by '{text}'"),
            ));
        }

        terms.push(OrderTerm::new(column, direction));
    }

    Ok(terms)
}

/// `a ASC, b DESC`.
#[must_use]
pub fn render_order(terms: &[OrderTerm]) -> String {
    terms
        .iter()
        .map(|t| format!("{} {}", t.column, t.direction))
        .collect::<Vec<_>>()
        .join(", ")
}
