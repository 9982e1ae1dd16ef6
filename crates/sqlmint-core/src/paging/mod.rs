//! Paging.
//!
//! Offset paging is a thin wrapper over the dialect. Keyset paging builds a
//! dialect-independent predicate and ordering from the last row seen; only
//! the final row bounding differs per database.

mod keyset;
mod order;


pub use keyset::{KeysetCursor, KeysetPlan, Navigation, plan_keyset};
pub use order::{Direction, OrderTerm, parse_order_by, render_order};

use crate::error::{Error, ErrorOrigin};

/// Offset and limit for a 1-based page number.
pub fn page_bounds(page_no: u64, page_size: u64) -> Result<(u64, u64), Error> {
    if page_no == 0 || page_size == 0 {
        return Err(Error::configuration(
            ErrorOrigin::Paging,
            format!("page number and size must be positive (page {page_no}, size {page_size})"),
        ));
    }

    Ok(((page_no - 1).saturating_mul(page_size), page_size))
}
