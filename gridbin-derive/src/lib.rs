/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Derive procedural macros for the [`gridbin`](https://crates.io/crates/gridbin) crate.

use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Derives `gridbin::portable::Portable` (and the matching
/// `gridbin::impls::FieldValue`) for a named struct.
///
/// The generated `type_spec()` lists the fields in declaration order with
/// the wire tags of their Rust types; `to_object`/`from_object` convert
/// each field through `FieldValue`. Every field type must implement
/// `FieldValue`, which includes other `#[derive(Portable)]` structs.
#[proc_macro_derive(Portable)]
pub fn derive_portable(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "#[derive(Portable)] does not support generic types",
        )
        .to_compile_error()
        .into();
    }

    let fields = match &input.data {
        Data::Struct(st) => match &st.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    name,
                    "#[derive(Portable)] requires named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "#[derive(Portable)] requires a struct")
                .to_compile_error()
                .into();
        }
    };

    let type_name = name.to_string();

    let spec_fields = fields.iter().map(|f| {
        let field_name = f.ident.as_ref().unwrap().to_string();
        let ty = &f.ty;
        quote! {
            .with_field(#field_name, <#ty as ::gridbin::impls::FieldValue>::tag())
        }
    });

    let put_fields = fields.iter().map(|f| {
        let ident = f.ident.as_ref().unwrap();
        let field_name = ident.to_string();
        let ty = &f.ty;
        quote! {
            inst.put(#field_name, <#ty as ::gridbin::impls::FieldValue>::to_value(&self.#ident));
        }
    });

    let get_fields = fields.iter().map(|f| {
        let ident = f.ident.as_ref().unwrap();
        let field_name = ident.to_string();
        let ty = &f.ty;
        quote! {
            #ident: <#ty as ::gridbin::impls::FieldValue>::from_value(
                inst.get(#field_name).unwrap_or(&::gridbin::value::Value::Null),
            )?,
        }
    });

    let expanded = quote! {
        impl ::gridbin::portable::Portable for #name {
            fn type_spec() -> ::gridbin::descriptor::TypeSpec {
                ::gridbin::descriptor::TypeSpec::new(#type_name)
                    #(#spec_fields)*
            }

            fn to_object(&self) -> ::gridbin::value::ObjInst {
                let mut inst = ::gridbin::value::ObjInst::new(#type_name);
                #(#put_fields)*
                inst
            }

            fn from_object(inst: &::gridbin::value::ObjInst) -> ::gridbin::error::Result<Self> {
                Ok(Self {
                    #(#get_fields)*
                })
            }
        }

        impl ::gridbin::impls::FieldValue for #name {
            fn tag() -> ::gridbin::wire::TypeTag {
                ::gridbin::wire::TypeTag::Obj
            }

            fn to_value(&self) -> ::gridbin::value::Value {
                ::gridbin::value::Value::Obj(::gridbin::value::ObjRef::new(
                    ::gridbin::portable::Portable::to_object(self),
                ))
            }

            fn from_value(value: &::gridbin::value::Value) -> ::gridbin::error::Result<Self> {
                match value {
                    ::gridbin::value::Value::Obj(o) => {
                        <Self as ::gridbin::portable::Portable>::from_object(&o.borrow())
                    }
                    other => Err(::gridbin::error::Error::Unsupported(::std::format!(
                        "cannot convert {:?} field to a {} object",
                        other.tag(),
                        #type_name,
                    ))),
                }
            }
        }
    };
    expanded.into()
}
