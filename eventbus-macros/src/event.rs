use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Index, Member, Result as SynResult, Type};

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Interface,
    Parent,
}

struct Declared {
    member: Member,
    ty: Type,
    kind: Kind,
}

fn field_kind(attrs: &[syn::Attribute]) -> SynResult<Option<Kind>> {
    let mut kind = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            let next = if meta.path.is_ident("parent") {
                Kind::Parent
            } else if meta.path.is_ident("interface") {
                Kind::Interface
            } else {
                return Err(meta.error("unknown key in #[event]; expected 'parent' or 'interface'"));
            };
            if kind.is_some() {
                return Err(meta.error("a field can declare only one supertype"));
            }
            kind = Some(next);
            Ok(())
        })?;
    }
    Ok(kind)
}

fn declared_supertypes(fields: &Fields) -> SynResult<Vec<Declared>> {
    let mut declared = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let Some(kind) = field_kind(&field.attrs)? else {
            continue;
        };
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index::from(i)),
        };
        declared.push(Declared {
            member,
            ty: field.ty.clone(),
            kind,
        });
    }

    let parents = declared.iter().filter(|d| d.kind == Kind::Parent).count();
    if parents > 1 {
        return Err(syn::Error::new(
            fields.span(),
            "at most one field can be marked #[event(parent)]",
        ));
    }
    Ok(declared)
}

pub(crate) fn expand(input: DeriveInput) -> SynResult<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let declared = match &input.data {
        Data::Struct(data) => declared_supertypes(&data.fields)?,
        Data::Enum(_) => Vec::new(),
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "#[derive(Event)] does not support unions",
            ));
        }
    };

    if declared.is_empty() {
        return Ok(quote! {
            impl #impl_generics ::eventbus_core::Event for #name #ty_generics #where_clause {}
        });
    }

    let entries = declared.iter().map(|d| {
        let ty = &d.ty;
        match d.kind {
            Kind::Parent => quote! { ::eventbus_core::Supertype::parent::<Self, #ty>() },
            Kind::Interface => quote! { ::eventbus_core::Supertype::interface::<Self, #ty>() },
        }
    });

    let as_refs = declared.iter().map(|d| {
        let ty = &d.ty;
        let member = &d.member;
        quote! {
            impl #impl_generics ::core::convert::AsRef<#ty> for #name #ty_generics #where_clause {
                fn as_ref(&self) -> &#ty {
                    &self.#member
                }
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::eventbus_core::Event for #name #ty_generics #where_clause {
            fn supertypes() -> ::std::vec::Vec<::eventbus_core::Supertype> {
                ::std::vec![#(#entries),*]
            }
        }

        #(#as_refs)*
    })
}
