use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

pub fn expand(input: &DeriveInput) -> TokenStream {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return error(input, "Record can only be derived for structs with named fields");
            }
        },
        _ => return error(input, "Record can only be derived for structs"),
    };

    let arms = fields.iter().map(|field| {
        let ident = field.ident.as_ref().expect("named field");
        let label = field_label(&ident.to_string());
        quote! {
            #label => ::memdex::Value::from(::core::clone::Clone::clone(&self.#ident)),
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    TokenStream::from(quote! {
        impl #impl_generics ::memdex::Record for #name #ty_generics #where_clause {
            fn field(&self, name: &str) -> ::memdex::Value {
                match name {
                    #(#arms)*
                    other => panic!(
                        "record {} has no field named {other:?}",
                        stringify!(#name)
                    ),
                }
            }
        }
    })
}

/// Field names as the schema spells them: raw identifiers like `r#type`
/// index under the bare name.
fn field_label(ident: &str) -> String {
    ident.strip_prefix("r#").unwrap_or(ident).to_string()
}

fn error(input: &DeriveInput, message: &str) -> TokenStream {
    syn::Error::new_spanned(&input.ident, message)
        .to_compile_error()
        .into()
}
