use crate::utils::{KvType, take_attrs};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, Expr, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitBool, LitStr,
    Result as SynResult, Token, Type,
};

const THREAD_MODES: [&str; 5] = ["Posting", "Main", "MainOrdered", "Background", "Async"];

// 解析 subscriber 宏键值参数：parent = <Type>
pub(crate) struct SubscriberAttrConfig {
    parent: Option<Type>,
}

impl Parse for SubscriberAttrConfig {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut parent: Option<Type> = None;

        if input.is_empty() {
            return Ok(Self { parent });
        }

        let pairs = Punctuated::<KvType, Token![,]>::parse_terminated(input)?;
        for kv in pairs {
            match kv.key.to_string().as_str() {
                "parent" => {
                    if parent.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'parent' in attribute",
                        ));
                    }
                    parent = Some(kv.ty);
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key in attribute; expected 'parent'",
                    ));
                }
            }
        }

        Ok(Self { parent })
    }
}

// #[subscribe(...)] 解析结果
struct SubscribeConfig {
    thread_mode: Option<Ident>,
    priority: Option<Expr>,
    sticky: bool,
}

fn parse_subscribe_attr(attr: &Attribute) -> SynResult<SubscribeConfig> {
    let mut cfg = SubscribeConfig {
        thread_mode: None,
        priority: None,
        sticky: false,
    };

    // 无参数形式：#[subscribe]
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(cfg);
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("thread_mode") {
            let mode: Ident = meta.value()?.parse()?;
            if !THREAD_MODES.iter().any(|m| mode == m) {
                return Err(syn::Error::new(
                    mode.span(),
                    "unknown thread mode; expected one of Posting, Main, MainOrdered, Background, Async",
                ));
            }
            cfg.thread_mode = Some(mode);
            Ok(())
        } else if meta.path.is_ident("priority") {
            cfg.priority = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("sticky") {
            cfg.sticky = if meta.input.peek(Token![=]) {
                let lit: LitBool = meta.value()?.parse()?;
                lit.value
            } else {
                true
            };
            Ok(())
        } else {
            Err(meta.error(
                "unknown key in attribute; expected 'thread_mode', 'priority' or 'sticky'",
            ))
        }
    })?;

    Ok(cfg)
}

// 校验处理器签名并取出事件类型：fn name(&self, event: &E)
fn event_type_of(method: &ImplItemFn) -> SynResult<Type> {
    let sig = &method.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "handler methods cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "handler methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "handler methods must take `&self`",
            ));
        }
    }

    let params: Vec<_> = inputs.collect();
    if params.len() != 1 {
        return Err(syn::Error::new(
            sig.inputs.span(),
            format!(
                "handler method `{}` must have exactly 1 parameter but has {}",
                sig.ident,
                params.len()
            ),
        ));
    }

    match params[0] {
        FnArg::Typed(param) => match &*param.ty {
            Type::Reference(reference) if reference.mutability.is_none() => {
                Ok((*reference.elem).clone())
            }
            other => Err(syn::Error::new(
                other.span(),
                "the event parameter must be a shared reference, e.g. `event: &MyEvent`",
            )),
        },
        FnArg::Receiver(receiver) => Err(syn::Error::new(receiver.span(), "unexpected receiver")),
    }
}

pub(crate) fn expand(cfg: SubscriberAttrConfig, mut item: ItemImpl) -> SynResult<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(
            path.span(),
            "#[subscriber] only on inherent impl blocks",
        ));
    }

    let mut registrations = Vec::new();
    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let attrs = take_attrs(&mut method.attrs, "subscribe");
        let Some(attr) = attrs.first() else {
            continue;
        };
        if attrs.len() > 1 {
            return Err(syn::Error::new(
                attrs[1].span(),
                "duplicate #[subscribe] attribute",
            ));
        }

        let sub_cfg = parse_subscribe_attr(attr)?;
        let event_ty = event_type_of(method)?;
        let ident = &method.sig.ident;
        let name = LitStr::new(&ident.to_string(), ident.span());

        let thread_mode = sub_cfg.thread_mode.map(|mode| {
            quote! { .with_thread_mode(::eventbus_core::ThreadMode::#mode) }
        });
        let priority = sub_cfg
            .priority
            .map(|priority| quote! { .with_priority(#priority) });
        let sticky = sub_cfg.sticky.then(|| quote! { .with_sticky(true) });

        registrations.push(quote! {
            handlers.add(
                ::eventbus_core::HandlerMethod::new::<Self, #event_ty, _, _>(#name, Self::#ident)
                    #thread_mode
                    #priority
                    #sticky
            );
        });
    }

    if registrations.is_empty() && cfg.parent.is_none() {
        return Err(syn::Error::new(
            item.self_ty.span(),
            "#[subscriber] requires at least one #[subscribe] method or a parent",
        ));
    }

    let body = if registrations.is_empty() {
        quote! { let _ = handlers; }
    } else {
        quote! { #(#registrations)* }
    };

    let parent_fn = cfg.parent.map(|parent| {
        quote! {
            fn parent() -> ::std::option::Option<::eventbus_core::ParentLink> {
                ::std::option::Option::Some(::eventbus_core::ParentLink::of::<Self, #parent>())
            }
        }
    });

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        #item

        impl #impl_generics ::eventbus_core::Subscriber for #self_ty #where_clause {
            fn handlers(handlers: &mut ::eventbus_core::Handlers<Self>) {
                #body
            }

            #parent_fn
        }
    })
}
