use crate::{
    connection::Parameter,
    error::{Error, ErrorOrigin},
    model::EntityModel,
    paging::{Direction, OrderTerm, render_order},
    traits::FieldValues,
    value::Value,
};
use derive_more::Display;

///
/// Navigation
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Navigation {
    First,
    Last,
    Next,
    Previous,
}

impl Navigation {
    /// Whether the page is fetched in inverted order and re-sorted after.
    #[must_use]
    pub const fn is_backward(self) -> bool {
        matches!(self, Self::Last | Self::Previous)
    }

    #[must_use]
    pub const fn needs_cursor(self) -> bool {
        matches!(self, Self::Next | Self::Previous)
    }
}

///
/// KeysetCursor
///
/// Boundary row of the current page: its ordering values (one per order
/// term) and its primary key values (one per key column).
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeysetCursor {
    pub values: Vec<Value>,
    pub key: Vec<Value>,
}

impl KeysetCursor {
    #[must_use]
    pub const fn new(values: Vec<Value>, key: Vec<Value>) -> Self {
        Self { values, key }
    }

    /// Take the cursor from a row already mapped into an entity.
    pub fn from_entity<E: FieldValues>(
        model: &EntityModel,
        order: &[OrderTerm],
        entity: &E,
    ) -> Result<Self, Error> {
        let values = order
            .iter()
            .map(|term| {
                let column = model.column(&term.column).ok_or_else(|| {
                    Error::configuration(
                        ErrorOrigin::Paging,
                        format!("order column '{}' is not mapped on {}", term.column, model.table),
                    )
                })?;
                column.read(entity)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            values,
            key: model.key_values(entity)?,
        })
    }
}

///
/// KeysetPlan
///
/// `predicate` filters past the cursor, `exec_order` is the bounded inner
/// ordering, and `display_order` is set when the page must be re-sorted by an
/// outer query.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeysetPlan {
    pub predicate: Option<String>,
    pub params: Vec<Parameter>,
    pub exec_order: String,
    pub display_order: Option<String>,
}

/// Build the keyset predicate and orderings for one page request.
pub fn plan_keyset(
    model: &EntityModel,
    order: &[OrderTerm],
    navigation: Navigation,
    cursor: Option<&KeysetCursor>,
) -> Result<KeysetPlan, Error> {
    let Some(first) = order.first() else {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            "keyset paging needs at least one order column",
        ));
    };

    let keys: Vec<&str> = model.primary_keys().map(|c| c.name.as_str()).collect();
    if keys.is_empty() {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            format!("{} has no primary key to break ties on", model.type_name),
        ));
    }

    // declared order plus any key column not already ordered on
    let mut full: Vec<OrderTerm> = order.to_vec();
    let mut key_positions = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if !order.iter().any(|t| t.column.eq_ignore_ascii_case(key)) {
            full.push(OrderTerm::new(*key, first.direction));
            key_positions.push(i);
        }
    }

    let mut plan = KeysetPlan::default();

    if navigation.needs_cursor() {
        let cursor = validate_cursor(model, order, keys.len(), cursor)?;

        // boundary values aligned with `full`
        let bounds: Vec<&Value> = cursor
            .values
            .iter()
            .chain(key_positions.iter().map(|&i| &cursor.key[i]))
            .collect();

        let (predicate, params) =
            lexicographic_predicate(model, &full, &bounds, navigation == Navigation::Previous);
        plan.predicate = Some(predicate);
        plan.params = params;
    }

    if navigation.is_backward() {
        let inverted: Vec<OrderTerm> = full.iter().map(OrderTerm::inverted).collect();
        plan.exec_order = render_order(&inverted);
        plan.display_order = Some(render_order(&full));
    } else {
        plan.exec_order = render_order(&full);
    }

    Ok(plan)
}

fn validate_cursor<'c>(
    model: &EntityModel,
    order: &[OrderTerm],
    key_count: usize,
    cursor: Option<&'c KeysetCursor>,
) -> Result<&'c KeysetCursor, Error> {
    let Some(cursor) = cursor else {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            "Next/Previous navigation needs the last row's order values and key",
        ));
    };

    if cursor.values.len() != order.len() {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            format!(
                "{} order values supplied for {} order columns",
                cursor.values.len(),
                order.len()
            ),
        ));
    }
    if cursor.key.len() != key_count || cursor.key.iter().any(Value::is_null) {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            format!("Next/Previous on {} needs a primary-key anchor", model.type_name),
        ));
    }
    if let Some(i) = cursor.values.iter().position(Value::is_null) {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            format!("order value for '{}' is NULL; keyset columns must be non-null", order[i].column),
        ));
    }

    Ok(cursor)
}

// (c1 > @k0 OR (c1 = @k0 AND (c2 > @k1 OR (c2 = @k1 AND pk > @k2))))
fn lexicographic_predicate(
    model: &EntityModel,
    terms: &[OrderTerm],
    bounds: &[&Value],
    backward: bool,
) -> (String, Vec<Parameter>) {
    let params: Vec<Parameter> = bounds
        .iter()
        .zip(terms)
        .enumerate()
        .map(|(i, (value, term))| {
            let db_type = model
                .column(&term.column)
                .map_or_else(|| value.db_type(), |c| c.db_type);
            Parameter::new(format!("keyset_{i}"), (*value).clone(), db_type)
        })
        .collect();

    let mut predicate = String::new();
    for (i, term) in terms.iter().enumerate().rev() {
        let ascending = (term.direction == Direction::Asc) != backward;
        let op = if ascending { ">" } else { "<" };
        let placeholder = params[i].placeholder();

        predicate = if predicate.is_empty() {
            format!("{} {op} {placeholder}", term.column)
        } else {
            format!(
                "({col} {op} {placeholder} OR ({col} = {placeholder} AND {predicate}))",
                col = term.column
            )
        };
    }

    (predicate, params)
}
