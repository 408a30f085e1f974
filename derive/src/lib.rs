extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Type,
};

/// Field attributes parsed from `#[thrift(...)]` annotations
///
/// * `id` - The Thrift field id (mandatory)
/// * `name` - Name written in the field envelope, defaults to the Rust field name
/// * `required` - Reading fails with `MissingRequired` when the field is absent
#[derive(Debug, Clone)]
struct FieldAttributes {
    id: i16,
    name: String,
    required: bool,
}

/// Extract and parse `#[thrift(...)]` attribute values from field attributes
///
/// Supported forms: `#[thrift(id = 1)]`, `#[thrift(id = 2, name = "abc", required)]`.
fn get_field_attributes(attrs: &[Attribute], field_name: &str, span: Span) -> syn::Result<FieldAttributes> {
    let mut id = None;
    let mut name = None;
    let mut required = false;

    for attr in attrs {
        if !attr.path().is_ident("thrift") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;

                if ident == "id" {
                    input.parse::<syn::Token![=]>()?;
                    let negative = input.peek(syn::Token![-]);
                    if negative {
                        input.parse::<syn::Token![-]>()?;
                    }
                    let lit = input.parse::<syn::LitInt>()?;
                    let value = lit.base10_parse::<i32>()?;
                    let value = if negative { -value } else { value };
                    let value = i16::try_from(value)
                        .map_err(|_| syn::Error::new(lit.span(), "Field id must fit in an i16"))?;
                    id = Some(value);
                } else if ident == "name" {
                    input.parse::<syn::Token![=]>()?;
                    name = Some(input.parse::<LitStr>()?.value());
                } else if ident == "required" {
                    required = true;
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown attribute: {}", ident),
                    ));
                }

                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }

    let id = id.ok_or_else(|| {
        syn::Error::new(
            span,
            format!("Field '{}' needs an id: #[thrift(id = N)]", field_name),
        )
    })?;

    Ok(FieldAttributes {
        id,
        name: name.unwrap_or_else(|| field_name.to_owned()),
        required,
    })
}

/// Struct level `#[thrift(name = "...")]`.
fn get_struct_name(attrs: &[Attribute], default: String) -> syn::Result<String> {
    let mut name = default;
    for attr in attrs {
        if !attr.path().is_ident("thrift") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;
                if ident != "name" {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown attribute: {}", ident),
                    ));
                }
                input.parse::<syn::Token![=]>()?;
                name = input.parse::<LitStr>()?.value();
                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }
    Ok(name)
}

/// Extract the inner type `T` from `Option<T>`
fn extract_inner_type_from_option(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != "Option" {
        return None;
    }
    if let PathArguments::AngleBracketed(args) = &seg.arguments {
        if let Some(GenericArgument::Type(inner_ty)) = args.args.first() {
            return Some(inner_ty);
        }
    }
    None
}

/// Derive macro implementing `TStruct` and `Wire` for a struct with named fields
///
/// Every field needs `#[thrift(id = N)]` and a type implementing `Wire`. `Option<T>` fields are
/// written only when `Some`. Reading starts from `Default::default()`, so the struct must
/// implement `Default`. Unknown ids and fields whose wire type differs are skipped.
///
/// # Examples
///
/// ```rust,ignore
/// use thrift_dyn::ThriftStruct;
///
/// #[derive(ThriftStruct, Default, Debug, PartialEq)]
/// #[thrift(name = "Model")]
/// struct Model {
///     #[thrift(id = 1, name = "abc", required)]
///     abc: String,
///     #[thrift(id = 4)]
///     sd: Option<i64>,
/// }
/// ```
#[proc_macro_derive(ThriftStruct, attributes(thrift))]
pub fn derive_thrift_struct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let struct_name = get_struct_name(&input.attrs, name.to_string())?;

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "ThriftStruct only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "ThriftStruct only supports structs",
            ))
        }
    };

    let mut used_ids = HashSet::new();
    let mut field_write = Vec::new();
    let mut field_read = Vec::new();
    let mut isset_decls = Vec::new();
    let mut required_checks = Vec::new();

    for f in fields {
        let Some(field_ident) = f.ident.as_ref() else {
            continue;
        };
        let field_name_str = field_ident.to_string().trim_start_matches("r#").to_owned();
        let attrs = get_field_attributes(&f.attrs, &field_name_str, field_ident.span())?;

        if !used_ids.insert(attrs.id) {
            return Err(syn::Error::new(
                field_ident.span(),
                format!(
                    "Field id {} is duplicated for struct '{}'",
                    attrs.id, name
                ),
            ));
        }

        let id = attrs.id;
        let wire_name = &attrs.name;
        let isset = format_ident!("isset_{}", field_name_str);

        if let Some(inner) = extract_inner_type_from_option(&f.ty) {
            field_write.push(quote! {
                if let Some(value) = &self.#field_ident {
                    p.write_field_begin(&thrift_dyn::protocol::TFieldIdentifier::new(
                        #wire_name,
                        thrift_dyn::WireType::from(<#inner as thrift_dyn::Wire>::TTYPE),
                        #id,
                    ))?;
                    thrift_dyn::Wire::write_wire(value, p)?;
                    p.write_field_end()?;
                }
            });
            field_read.push(quote! {
                Some(#id) if ident.field_type == thrift_dyn::WireType::from(<#inner as thrift_dyn::Wire>::TTYPE) => {
                    self.#field_ident = Some(<#inner as thrift_dyn::Wire>::read_wire(p)?);
                    #isset = true;
                }
            });
        } else {
            let ty = &f.ty;
            field_write.push(quote! {
                p.write_field_begin(&thrift_dyn::protocol::TFieldIdentifier::new(
                    #wire_name,
                    thrift_dyn::WireType::from(<#ty as thrift_dyn::Wire>::TTYPE),
                    #id,
                ))?;
                thrift_dyn::Wire::write_wire(&self.#field_ident, p)?;
                p.write_field_end()?;
            });
            field_read.push(quote! {
                Some(#id) if ident.field_type == thrift_dyn::WireType::from(<#ty as thrift_dyn::Wire>::TTYPE) => {
                    self.#field_ident = <#ty as thrift_dyn::Wire>::read_wire(p)?;
                    #isset = true;
                }
            });
        }

        isset_decls.push(quote! { let mut #isset = false; });
        if attrs.required {
            required_checks.push(quote! {
                if !#isset {
                    return Err(thrift_dyn::ThriftError::MissingRequired {
                        id: #id,
                        name: ::std::string::String::from(#wire_name),
                    });
                }
            });
        }
    }

    Ok(quote! {
        impl #impl_generics thrift_dyn::TStruct for #name #ty_generics #where_clause {
            fn write(&self, p: &mut dyn thrift_dyn::TOutputProtocol) -> thrift_dyn::Result<()> {
                p.write_struct_begin(&thrift_dyn::protocol::TStructIdentifier::new(#struct_name))?;
                #(#field_write)*
                p.write_field_stop()?;
                p.write_struct_end()?;
                Ok(())
            }

            #[allow(unused_variables, unused_assignments)]
            fn read(&mut self, p: &mut dyn thrift_dyn::TInputProtocol) -> thrift_dyn::Result<()> {
                *self = ::core::default::Default::default();
                #(#isset_decls)*
                p.read_struct_begin()?;
                loop {
                    let ident = p.read_field_begin()?;
                    if ident.field_type == thrift_dyn::WireType::Stop {
                        break;
                    }
                    match ident.id {
                        #(#field_read)*
                        _ => p.skip(ident.field_type)?,
                    }
                    p.read_field_end()?;
                }
                p.read_struct_end()?;
                #(#required_checks)*
                Ok(())
            }
        }

        impl #impl_generics thrift_dyn::Wire for #name #ty_generics #where_clause {
            const TTYPE: thrift_dyn::TType = thrift_dyn::TType::Struct;

            fn write_wire(&self, p: &mut dyn thrift_dyn::TOutputProtocol) -> thrift_dyn::Result<()> {
                thrift_dyn::TStruct::write(self, p)
            }

            fn read_wire(p: &mut dyn thrift_dyn::TInputProtocol) -> thrift_dyn::Result<Self> {
                let mut value: Self = ::core::default::Default::default();
                thrift_dyn::TStruct::read(&mut value, p)?;
                Ok(value)
            }
        }
    })
}
