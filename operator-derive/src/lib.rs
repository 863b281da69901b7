use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

const REQUIRED_FIELDS: [&str; 2] = ["conditions", "observed_generation"];

/// Implements `crate::apis::StatusAccessor` for a status struct that carries
/// `conditions: Vec<Condition>` and `observed_generation: i64` fields.
#[proc_macro_derive(Conditions)]
pub fn derive_conditions(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut present: Vec<String> = Vec::new();
    if let Data::Struct(data_struct) = &input.data {
        if let Fields::Named(fields_named) = &data_struct.fields {
            for field in &fields_named.named {
                if let Some(ident) = &field.ident {
                    present.push(ident.to_string());
                }
            }
        }
    }

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|required| !present.iter().any(|p| p == *required))
    {
        return syn::Error::new_spanned(
            &name,
            format!("#[derive(Conditions)] requires a `{missing}` field"),
        )
        .to_compile_error()
        .into();
    }

    let expanded = quote! {
        impl #impl_generics crate::apis::StatusAccessor for #name #ty_generics #where_clause {
            fn conditions(&self) -> &[crate::apis::Condition] {
                &self.conditions
            }
            fn set_conditions(&mut self, conditions: Vec<crate::apis::Condition>) {
                self.conditions = conditions;
            }
            fn observed_generation(&self) -> i64 {
                self.observed_generation
            }
            fn set_observed_generation(&mut self, generation: i64) {
                self.observed_generation = generation;
            }
        }
    };

    TokenStream::from(expanded)
}
