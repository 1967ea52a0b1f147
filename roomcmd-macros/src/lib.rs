use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, Data, DeriveInput, Expr, ExprLit, Fields, GenericArgument, Lit,
    PathArguments, Type,
};

/// Derives `roomcmd::CommandArgs` for a struct with named fields, generating
/// its parameter descriptor and typed extraction.
///
/// # Usage
///
/// ```ignore
/// #[derive(CommandArgs)]
/// struct EchoArgs {
///     text: String,              // required STRING
///     #[arg(default = "plain")]
///     style: Style,              // FLAG with a default literal
///     count: Option<i64>,        // optional NUMBER
/// }
/// ```
///
/// Fields are declared in positional order. Each field type must implement
/// `roomcmd::ArgValue`; `Option<T>` makes the parameter optional.
#[proc_macro_derive(CommandArgs, attributes(arg))]
pub fn derive_command_args(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_command_args(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `roomcmd::FlagEnum` and `roomcmd::ArgValue` for a unit enum.
///
/// Each variant's literal is its name in kebab case (`DryRun` becomes
/// `dry-run`, `HTTPServer` becomes `http-server`) unless overridden with
/// `#[flag(rename = "...")]`. User input must match a literal exactly.
#[proc_macro_derive(FlagEnum, attributes(flag))]
pub fn derive_flag_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_flag_enum(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_command_args(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "CommandArgs needs named fields; parameter names come from field names",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "CommandArgs can only be derived for structs",
            ))
        }
    };

    let mut parameters = Vec::new();
    let mut initializers = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let param_name = ident.unraw().to_string();
        let default = field_default(field)?;

        match (option_inner(&field.ty), default) {
            (Some(_), Some(_)) => {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "an Option field is already optional; drop the default",
                ))
            }
            (Some(inner), None) => {
                parameters.push(quote! {
                    ::roomcmd::Parameter::optional(
                        #param_name,
                        <#inner as ::roomcmd::ArgValue>::KIND,
                    )
                });
                initializers.push(quote! {
                    #ident: bindings.optional::<#inner>(#param_name)?
                });
            }
            (None, default) => {
                let ty = &field.ty;
                let kind = quote! { <#ty as ::roomcmd::ArgValue>::KIND };
                parameters.push(match default {
                    None => quote! { ::roomcmd::Parameter::required(#param_name, #kind) },
                    Some(Expr::Lit(ExprLit {
                        lit: Lit::Str(text),
                        ..
                    })) => quote! {
                        ::roomcmd::Parameter::with_default(
                            #param_name,
                            #kind,
                            #kind.literal_token(#text),
                        )
                    },
                    Some(number) => quote! {
                        ::roomcmd::Parameter::with_default(
                            #param_name,
                            #kind,
                            ::roomcmd::Token::Number((#number) as f64),
                        )
                    },
                });
                initializers.push(quote! {
                    #ident: bindings.required::<#ty>(#param_name)?
                });
            }
        }
    }

    let construct = match &input.data {
        Data::Struct(data) if matches!(data.fields, Fields::Unit) => quote! { Self },
        _ => quote! { Self { #(#initializers),* } },
    };
    let bindings_arg = if initializers.is_empty() {
        quote! { _bindings }
    } else {
        quote! { bindings }
    };

    Ok(quote! {
        impl #impl_generics ::roomcmd::CommandArgs for #name #ty_generics #where_clause {
            fn parameters() -> ::std::vec::Vec<::roomcmd::Parameter> {
                ::std::vec![#(#parameters),*]
            }

            fn from_bindings(
                #bindings_arg: &::roomcmd::Bindings,
            ) -> ::std::result::Result<Self, ::roomcmd::CommandError> {
                ::std::result::Result::Ok(#construct)
            }
        }
    })
}

/// Extract the expression from `#[arg(default = ...)]`.
fn field_default(field: &syn::Field) -> syn::Result<Option<Expr>> {
    let mut default = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("arg") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = Some(meta.value()?.parse::<Expr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported arg attribute; expected `default = ...`"))
            }
        })?;
    }
    Ok(default)
}

/// `T` if `ty` is `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn expand_flag_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "FlagEnum can only be derived for enums",
        ));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "FlagEnum needs at least one variant",
        ));
    }

    let mut variants = Vec::new();
    let mut literals: Vec<String> = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "FlagEnum variants cannot carry data",
            ));
        }
        let literal = variant_literal(variant)?;
        if literals.contains(&literal) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate flag literal `{}`", literal),
            ));
        }
        variants.push(&variant.ident);
        literals.push(literal);
    }

    Ok(quote! {
        impl ::roomcmd::FlagEnum for #name {
            const LITERALS: &'static [&'static str] = &[#(#literals),*];

            fn from_literal(literal: &str) -> ::std::option::Option<Self> {
                match literal {
                    #(#literals => ::std::option::Option::Some(Self::#variants),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn literal(&self) -> &'static str {
                match self {
                    #(Self::#variants => #literals,)*
                }
            }
        }

        impl ::roomcmd::ArgValue for #name {
            const KIND: ::roomcmd::ArgKind =
                ::roomcmd::ArgKind::Flag(<Self as ::roomcmd::FlagEnum>::LITERALS);

            fn from_token(token: &::roomcmd::Token) -> ::std::option::Option<Self> {
                match token {
                    ::roomcmd::Token::Flag(name) => {
                        <Self as ::roomcmd::FlagEnum>::from_literal(name)
                    }
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

/// Literal from `#[flag(rename = "...")]`, else the kebab-cased variant name.
fn variant_literal(variant: &syn::Variant) -> syn::Result<String> {
    let mut rename = None;
    for attr in &variant.attrs {
        if !attr.path().is_ident("flag") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported flag attribute; expected `rename = \"...\"`"))
            }
        })?;
    }
    Ok(rename.unwrap_or_else(|| kebab_case(&variant.ident.unraw().to_string())))
}

/// `DryRun` -> `dry-run`, `HTTPServer` -> `http-server`, `V2Api` -> `v2-api`.
///
/// A run of capitals stays one word; its last capital starts a new word when
/// a lowercase letter follows.
fn kebab_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::new();
    for (index, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && index > 0 {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
