use crate::util::{quote_opt, quote_opt_str};
use darling::{FromDeriveInput, FromField, FromMeta, ast::Data};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Generics, Ident, Type};

///
/// EntityInput
///

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(entity), supports(struct_named))]
struct EntityInput {
    ident: Ident,
    generics: Generics,
    data: Data<(), FieldInput>,

    #[darling(default)]
    table: Option<String>,

    #[darling(default)]
    schema: Option<String>,

    #[darling(default)]
    history: bool,

    #[darling(default)]
    no_history: bool,

    #[darling(default)]
    no_version_no: bool,

    #[darling(default)]
    no_is_active: bool,

    #[darling(default)]
    no_created: bool,

    #[darling(default)]
    no_updated: bool,

    #[darling(multiple, rename = "reference")]
    references: Vec<ReferenceInput>,
}

///
/// ReferenceInput
///

#[derive(Debug, FromMeta)]
struct ReferenceInput {
    table: String,
    column: String,

    #[darling(default)]
    key: Option<String>,

    #[darling(default)]
    soft_delete: bool,

    #[darling(default)]
    display: Option<String>,
}

///
/// FieldInput
///

#[derive(Debug, FromField)]
#[darling(attributes(column))]
struct FieldInput {
    ident: Option<Ident>,
    ty: Type,

    #[darling(default)]
    name: Option<String>,

    #[darling(default)]
    db_type: Option<String>,

    #[darling(default)]
    size: Option<u32>,

    #[darling(default)]
    precision: Option<u8>,

    #[darling(default)]
    scale: Option<u8>,

    #[darling(default)]
    primary_key: bool,

    #[darling(default)]
    identity: bool,

    #[darling(default)]
    ignore_insert: bool,

    #[darling(default)]
    ignore_update: bool,

    #[darling(default)]
    ignore_read: bool,

    #[darling(default)]
    skip: bool,
}

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };
    let input = match EntityInput::from_derive_input(&input) {
        Ok(input) => input,
        Err(err) => return err.write_errors(),
    };

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        )
        .to_compile_error();
    }
    if input.history && input.no_history {
        return syn::Error::new_spanned(
            &input.ident,
            "`history` and `no_history` are mutually exclusive",
        )
        .to_compile_error();
    }

    let Data::Struct(fields) = &input.data else {
        return syn::Error::new_spanned(&input.ident, "Entity requires a struct with named fields")
            .to_compile_error();
    };
    let fields: Vec<&FieldInput> = fields.iter().filter(|f| !f.skip).collect();

    let declaration = declaration_tokens(&input, &fields);
    let accessors = accessor_tokens(&input.ident, &fields);
    let ident = &input.ident;

    quote! {
        impl ::sqlmint::traits::EntityKind for #ident {
            const DECLARATION: &'static ::sqlmint::model::EntityDeclaration = #declaration;
        }

        #accessors
    }
}

fn declaration_tokens(input: &EntityInput, fields: &[&FieldInput]) -> TokenStream {
    let type_name = input.ident.to_string();
    let table = quote_opt_str(input.table.as_ref());
    let schema = quote_opt_str(input.schema.as_ref());

    let needs_history = if input.history {
        quote!(Some(true))
    } else if input.no_history {
        quote!(Some(false))
    } else {
        quote!(None)
    };
    let no_version_no = input.no_version_no;
    let no_is_active = input.no_is_active;
    let no_created = input.no_created;
    let no_updated = input.no_updated;

    let field_decls = fields.iter().map(|field| field_declaration(field));
    let references = input.references.iter().map(|r| {
        let table = &r.table;
        let column = &r.column;
        let key = quote_opt_str(r.key.as_ref());
        let soft_delete = r.soft_delete;
        let display = quote_opt_str(r.display.as_ref());

        quote! {
            ::sqlmint::model::ReferenceDeclaration {
                table: #table,
                column: #column,
                key: #key,
                soft_delete: #soft_delete,
                display: #display,
            }
        }
    });

    quote! {
        &::sqlmint::model::EntityDeclaration {
            type_name: #type_name,
            table: #table,
            schema: #schema,
            flags: ::sqlmint::model::EntityFlags {
                needs_history: #needs_history,
                no_version_no: #no_version_no,
                no_is_active: #no_is_active,
                no_created: #no_created,
                no_updated: #no_updated,
            },
            fields: &[ #(#field_decls),* ],
            references: &[ #(#references),* ],
        }
    }
}

fn field_declaration(field: &FieldInput) -> TokenStream {
    let ident = field.ident.as_ref().expect("named field");
    let name = ident.to_string();
    let ty = &field.ty;
    let column = quote_opt_str(field.name.as_ref());
    let db_type = match &field.db_type {
        Some(db_type) => {
            let variant = format_ident!("{db_type}");
            quote!(Some(::sqlmint::types::DbType::#variant))
        }
        None => quote!(None),
    };
    let size = quote_opt(field.size.as_ref());
    let precision = quote_opt(field.precision.as_ref());
    let scale = quote_opt(field.scale.as_ref());
    let primary_key = field.primary_key;
    let identity = field.identity;
    let ignore_insert = field.ignore_insert;
    let ignore_update = field.ignore_update;
    let ignore_read = field.ignore_read;

    quote! {
        ::sqlmint::model::FieldDeclaration {
            name: #name,
            column: #column,
            db_type: #db_type,
            inferred_type: <#ty as ::sqlmint::traits::FieldValue>::DB_TYPE,
            nullable: <#ty as ::sqlmint::traits::FieldValue>::NULLABLE,
            size: #size,
            precision: #precision,
            scale: #scale,
            primary_key: #primary_key,
            identity: #identity,
            ignore: ::sqlmint::model::IgnoreFlags {
                insert: #ignore_insert,
                update: #ignore_update,
                read: #ignore_read,
            },
        }
    }
}

fn accessor_tokens(ident: &Ident, fields: &[&FieldInput]) -> TokenStream {
    let type_name = ident.to_string();

    let get_arms = fields.iter().map(|field| {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_name = field_ident.to_string();

        quote! {
            #field_name => Some(::sqlmint::traits::FieldValue::to_value(&self.#field_ident)),
        }
    });

    let set_arms = fields.iter().map(|field| {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_name = field_ident.to_string();
        let ty = &field.ty;

        quote! {
            #field_name => {
                self.#field_ident = <#ty as ::sqlmint::traits::FieldValue>::from_value(value)
                    .ok_or_else(|| ::sqlmint::traits::set_value_error(#type_name, field, value))?;
                Ok(())
            }
        }
    });

    quote! {
        impl ::sqlmint::traits::FieldValues for #ident {
            fn get_value(&self, field: &str) -> Option<::sqlmint::value::Value> {
                match field {
                    #(#get_arms)*
                    _ => None,
                }
            }

            fn set_value(
                &mut self,
                field: &str,
                value: &::sqlmint::value::Value,
            ) -> Result<(), ::sqlmint::error::Error> {
                match field {
                    #(#set_arms)*
                    _ => Err(::sqlmint::traits::unknown_field_error(#type_name, field)),
                }
            }
        }
    }
}
