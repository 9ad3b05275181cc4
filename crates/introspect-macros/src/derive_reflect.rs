//! Implementation of the `#[derive(Reflect)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, Member, parse_macro_input};

use crate::attrs::{FieldAttrs, TypeAttrs};

pub fn derive_reflect_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_reflect_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_reflect_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types; implement it per instantiation",
        ));
    }

    let name = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;
    let reflect_name = attrs.name.clone().unwrap_or_else(|| name.to_string());

    let fields = collect_fields(input)?;
    let dynamic = fields.iter().find(|f| f.attrs.dynamic);
    if fields.iter().filter(|f| f.attrs.dynamic).count() > 1 {
        return Err(syn::Error::new_spanned(
            name,
            "only one field can carry #[reflect(dynamic)]",
        ));
    }

    let reflect_impl = generate_reflect_impl(name, &reflect_name, &attrs, dynamic);
    let fields_impl = generate_fields_impl(name, &fields)?;

    Ok(quote! {
        #reflect_impl
        #fields_impl
    })
}

/// A struct field with its parsed attributes.
struct ReflectField<'a> {
    member: Member,
    ident: Option<&'a Ident>,
    ty: &'a syn::Type,
    attrs: FieldAttrs,
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<ReflectField<'_>>> {
    let mut result = Vec::new();

    let Data::Struct(data) = &input.data else {
        return Ok(result);
    };
    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        Fields::Unnamed(fields) => &fields.unnamed,
        Fields::Unit => return Ok(result),
    };

    for (index, field) in fields.iter().enumerate() {
        let attrs = FieldAttrs::from_attrs(&field.attrs)?;
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        result.push(ReflectField {
            member,
            ident: field.ident.as_ref(),
            ty: &field.ty,
            attrs,
        });
    }

    Ok(result)
}

/// Generate the `Reflect` trait implementation.
fn generate_reflect_impl(
    name: &Ident,
    reflect_name: &str,
    attrs: &TypeAttrs,
    dynamic: Option<&ReflectField<'_>>,
) -> TokenStream2 {
    let clone_hook = attrs.clone.then(|| {
        quote! {
            fn clone_value(&self) -> ::core::option::Option<Self> {
                ::core::option::Option::Some(::core::clone::Clone::clone(self))
            }
        }
    });

    let eq_hook = attrs.eq.then(|| {
        quote! {
            fn eq_value(&self, other: &Self) -> ::core::option::Option<bool> {
                ::core::option::Option::Some(::core::cmp::PartialEq::eq(self, other))
            }
        }
    });

    let dynamic_hook = dynamic.map(|field| {
        let member = &field.member;
        quote! {
            fn dynamic_type(&self) -> ::core::option::Option<&::introspect::DynamicType> {
                ::core::option::Option::Some(&self.#member)
            }
        }
    });

    quote! {
        impl ::introspect::Reflect for #name {
            fn type_name() -> &'static str {
                #reflect_name
            }

            #clone_hook
            #eq_hook
            #dynamic_hook
        }
    }
}

/// Generate the `ReflectFields` implementation for `get` / `set` fields.
fn generate_fields_impl(name: &Ident, fields: &[ReflectField<'_>]) -> syn::Result<TokenStream2> {
    let mut properties = Vec::new();

    for field in fields.iter().filter(|f| f.attrs.is_property()) {
        if field.attrs.dynamic {
            return Err(syn::Error::new_spanned(
                field.ty,
                "the dynamic type tag cannot be exposed as a property",
            ));
        }
        if !field.attrs.get {
            return Err(syn::Error::new_spanned(
                field.ty,
                "#[reflect(set)] requires #[reflect(get)]",
            ));
        }

        let member = &field.member;
        let ty = field.ty;
        let prop_name = match (&field.attrs.name, field.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => ident.to_string(),
            (None, None) => match member {
                Member::Unnamed(index) => format!("_{}", index.index),
                Member::Named(ident) => ident.to_string(),
            },
        };

        let getter = quote! {
            |this: &#name| -> #ty { ::core::clone::Clone::clone(&this.#member) }
        };
        properties.push(if field.attrs.set {
            quote! {
                let builder = builder.property::<#ty, _, _>(
                    #prop_name,
                    #getter,
                    |this: &mut #name, value: #ty| this.#member = value,
                )?;
            }
        } else {
            quote! {
                let builder = builder.readonly_property::<#ty, _>(#prop_name, #getter)?;
            }
        });
    }

    if properties.is_empty() {
        return Ok(TokenStream2::new());
    }

    Ok(quote! {
        impl ::introspect::ReflectFields for #name {
            fn register_fields<'r>(
                builder: ::introspect::ClassBuilder<'r, Self>,
            ) -> ::core::result::Result<
                ::introspect::ClassBuilder<'r, Self>,
                ::introspect::RegistrationError,
            > {
                #(#properties)*
                ::core::result::Result::Ok(builder)
            }
        }
    })
}
