use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Pat, Path, Token, Type,
    parse::{Parse, ParseStream, Result},
};

// ─── Attribute arguments ──────────────────────────────────────────────────────

/// Parsed `#[controller(…)]` arguments.
pub struct ControllerArgs {
    /// Path of the framework crate the generated code refers to.
    krate: Path,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut krate: Path = syn::parse_quote!(::switchyard::framework);
        while !input.is_empty() {
            if input.peek(Token![crate]) {
                input.parse::<Token![crate]>()?;
                input.parse::<Token![=]>()?;
                krate = input.parse()?;
            } else {
                return Err(input.error("unknown argument; expected `crate = path`"));
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(Self { krate })
    }
}

// ─── Method classification ────────────────────────────────────────────────────

enum Role {
    Action,
    Fallback,
    Middleware,
    Skip,
}

/// Reads and strips the helper attributes of one method.
fn take_role(method: &mut ImplItemFn) -> Result<Role> {
    let mut role = Role::Action;
    let mut seen: Option<&'static str> = None;
    let mut kept: Vec<Attribute> = Vec::with_capacity(method.attrs.len());

    for attr in method.attrs.drain(..) {
        let found = if attr.path().is_ident("fallback") {
            Some(("fallback", Role::Fallback))
        } else if attr.path().is_ident("middleware") {
            Some(("middleware", Role::Middleware))
        } else if attr.path().is_ident("skip") {
            Some(("skip", Role::Skip))
        } else {
            None
        };

        match found {
            Some((name, _)) if seen.is_some() => {
                return Err(syn::Error::new_spanned(
                    attr,
                    format!("`#[{name}]` cannot be combined with `#[{}]`", seen.unwrap_or("")),
                ));
            }
            Some((name, r)) => {
                seen = Some(name);
                role = r;
            }
            None => kept.push(attr),
        }
    }

    method.attrs = kept;
    Ok(role)
}

/// Returns `true` for `&Request`-shaped argument types.
fn is_request_ref(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => match &*reference.elem {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Request"),
            _ => false,
        },
        _ => false,
    }
}

/// Collects `(name, type)` of every non-receiver argument.
fn typed_args(method: &ImplItemFn) -> Result<Vec<(String, Type)>> {
    method
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Receiver(_) => None,
            FnArg::Typed(typed) => Some(typed),
        })
        .map(|typed| match &*typed.pat {
            Pat::Ident(ident) => Ok((ident.ident.to_string(), (*typed.ty).clone())),
            other => Err(syn::Error::new_spanned(
                other,
                "controller action arguments must be plain identifiers",
            )),
        })
        .collect()
}

// ─── Code generation ──────────────────────────────────────────────────────────

pub fn expand(args: ControllerArgs, mut item: ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] must be placed on an inherent impl block",
        ));
    }

    let krate = &args.krate;
    let private = quote! { #krate::__private };

    let mut names: Vec<TokenStream> = Vec::new();
    let mut arms: Vec<TokenStream> = Vec::new();
    let mut middleware_fn = None;

    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let role = take_role(method)?;
        if method.sig.receiver().is_none() {
            if !matches!(role, Role::Action) {
                return Err(syn::Error::new_spanned(
                    &method.sig,
                    "controller helper attributes require a `self` receiver",
                ));
            }
            continue;
        }

        let ident = &method.sig.ident;
        let awaited = method.sig.asyncness.map(|_| quote! { .await });

        match role {
            Role::Skip => {}
            Role::Middleware => {
                if middleware_fn.is_some() {
                    return Err(syn::Error::new_spanned(
                        &method.sig,
                        "only one `#[middleware]` method is allowed",
                    ));
                }
                if method.sig.asyncness.is_some() || method.sig.inputs.len() != 1 {
                    return Err(syn::Error::new_spanned(
                        &method.sig,
                        "`#[middleware]` must be a synchronous method taking only `&self`",
                    ));
                }
                middleware_fn = Some(ident.clone());
            }
            Role::Fallback => {
                let params = typed_args(method)?;
                if params.len() != 2 || params.iter().any(|(_, ty)| is_request_ref(ty)) {
                    return Err(syn::Error::new_spanned(
                        &method.sig,
                        "`#[fallback]` takes exactly two arguments: the action name and the parameters",
                    ));
                }
                names.push(quote! { #private::FALLBACK_ACTION });
                arms.push(quote! {
                    #private::FALLBACK_ACTION => {
                        let (__requested, __params) = __args.into_fallback()?;
                        let __out = self.#ident(
                            ::core::convert::Into::into(__requested),
                            ::core::convert::Into::into(__params),
                        ) #awaited;
                        #private::IntoReply::into_reply(__out)
                    }
                });
            }
            Role::Action => {
                let name = LitStr::new(&ident.to_string(), ident.span());
                let mut binds = Vec::new();
                let mut call_args = Vec::new();
                for (index, (param, ty)) in typed_args(method)?.into_iter().enumerate() {
                    if is_request_ref(&ty) {
                        call_args.push(quote! { __request });
                        continue;
                    }
                    let local = format_ident!("__arg{}", index);
                    let key = LitStr::new(&param, ident.span());
                    binds.push(quote! {
                        let #local: #ty = __args.bind(#key)?;
                    });
                    call_args.push(quote! { #local });
                }
                names.push(quote! { #name });
                arms.push(quote! {
                    #name => {
                        #(#binds)*
                        let __out = self.#ident(#(#call_args),*) #awaited;
                        #private::IntoReply::into_reply(__out)
                    }
                });
            }
        }
    }

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let declares = match middleware_fn {
        Some(ident) => quote! {
            impl #impl_generics #private::DeclaresMiddleware for #self_ty #where_clause {
                fn middleware(&self) -> ::std::vec::Vec<#private::MiddlewareSpec> {
                    <#self_ty>::#ident(self)
                }
            }
        },
        None => quote! {
            impl #impl_generics #private::DeclaresMiddleware for #self_ty #where_clause {}
        },
    };

    Ok(quote! {
        #item

        #declares

        impl #impl_generics #private::Controller for #self_ty #where_clause {
            fn actions(&self) -> &'static [&'static str] {
                &[#(#names),*]
            }

            #[allow(unused_variables)]
            fn call<'__a>(
                &'__a self,
                __action: &'__a str,
                __request: &'__a #private::Request,
                __args: #private::Arguments,
            ) -> #private::BoxFuture<'__a, #private::DispatchResult<#private::Reply>> {
                ::std::boxed::Box::pin(async move {
                    match __action {
                        #(#arms)*
                        _ => ::core::result::Result::Err(
                            #private::DispatchError::method_not_found(
                                ::core::any::type_name::<Self>(),
                                __action,
                            ),
                        ),
                    }
                })
            }
        }
    })
}
