use proc_macro::TokenStream;

mod entity;
mod util;

/// Derive the entity declaration and field accessors.
///
/// Container attributes (`#[entity(...)]`):
/// `table`, `schema`, `history`, `no_history`, `no_version_no`,
/// `no_is_active`, `no_created`, `no_updated`, and repeated
/// `reference(table, column, key, soft_delete, display)`.
///
/// Field attributes (`#[column(...)]`):
/// `name`, `db_type`, `size`, `precision`, `scale`, `primary_key`,
/// `identity`, `ignore_insert`, `ignore_update`, `ignore_read`, `skip`.
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
