// Portal Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `#[functional_test]` turns an `async fn(Tester) -> Result<(), Error>` into one test per
//! device model, named `<fn>_<model>`.

use proc_macro::TokenStream;

use quote::quote;

use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Ident, ItemFn, LitStr, Token};

use model::Target;

#[derive(Debug, Clone, Default)]
struct Attributes {
    models: Option<Vec<String>>,
}

struct SingleAttr {
    name: Ident,
    _equal: Token![=],
    value: LitStr,
}

impl Parse for SingleAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(SingleAttr {
            name: input.parse()?,
            _equal: input.parse()?,
            value: input.parse()?,
        })
    }
}

impl Parse for Attributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Attributes::default();
        let parsed = Punctuated::<SingleAttr, Token![,]>::parse_terminated(input)?;
        for attr in &parsed {
            match attr.name.to_string().as_str() {
                "models" => {
                    let mut models = vec![];
                    for name in attr.value.value().split(',').map(str::trim) {
                        if Target::from_name(name).is_none() {
                            return Err(syn::Error::new(
                                attr.value.span(),
                                format!("Unknown model {}", name),
                            ));
                        }
                        models.push(name.to_string());
                    }
                    attrs.models = Some(models);
                }
                x => {
                    return Err(syn::Error::new(
                        attr.name.span(),
                        format!("Invalid attr {}", x),
                    ))
                }
            }
        }

        Ok(attrs)
    }
}

#[proc_macro_attribute]
pub fn functional_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = parse_macro_input!(attr as Attributes);

    let mut input = parse_macro_input!(item as ItemFn);
    let original_ident = input.sig.ident.clone();
    let new_ident = Ident::new(&format!("{}_inner", original_ident), original_ident.span());
    input.sig.ident = new_ident.clone();

    let models = attrs
        .models
        .unwrap_or_else(|| Target::ALL.iter().map(|t| t.name().to_string()).collect());

    let tests = models.iter().map(|model| {
        let test_ident = Ident::new(&format!("{}_{}", original_ident, model), original_ident.span());
        let test_name = test_ident.to_string();

        quote! {
            #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
            async fn #test_ident() -> Result<(), crate::Error> {
                #input

                crate::tests::run_functional_test(#test_name, #model, #new_ident).await
            }
        }
    });

    let expanded = quote! {
        #(#tests)*
    };

    TokenStream::from(expanded)
}
