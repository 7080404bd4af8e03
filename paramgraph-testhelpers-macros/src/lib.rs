//! The `#[test]` attribute behind `paramgraph_testhelpers::test`.

use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    // attributes, visibility and qualifiers ahead of `fn`
    struct Prelude {
        tokens: Any<Cons<Except<KFn>, TokenTree>>,
    }

    // generics, arguments and return type, up to the body
    struct Signature {
        tokens: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct Block {
        group: BraceGroup,
    }

    struct TestFn {
        prelude: Prelude, _fn: KFn, name: Ident,
        signature: Signature, block: Block
    }
}

impl quote::ToTokens for Prelude {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.tokens.to_tokens(tokens)
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.tokens.to_tokens(tokens)
    }
}

impl quote::ToTokens for Block {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        tokens.extend(self.group.0.stream())
    }
}

/// Test attribute that installs the tracing subscriber and runs the test
/// inside a `test` span carrying its name.
///
/// ```ignore
/// #[paramgraph_testhelpers::test]
/// fn decodes_nested_params() {
///     // PARAMGRAPH_LOG=paramgraph=trace shows every filled field
/// }
/// ```
///
/// Another test attribute can be passed in, e.g.
/// `#[paramgraph_testhelpers::test(tokio::test)]`.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attr = TokenStream::from(attr);
    let item = TokenStream::from(item);
    match item.to_token_iter().parse::<TestFn>() {
        Ok(test_fn) => expand(attr, test_fn),
        Err(err) => {
            let message = format!("#[test] expects a function: {err}");
            quote::quote! { ::core::compile_error!(#message); }
        }
    }
    .into()
}

fn expand(attr: TokenStream, test_fn: TestFn) -> TokenStream {
    let TestFn {
        prelude,
        name,
        signature,
        block,
        ..
    } = test_fn;

    let harness = if attr.is_empty() {
        quote::quote! { #[::core::prelude::rust_2024::test] }
    } else {
        quote::quote! { #[#attr] }
    };
    let test_name = name.to_string();

    quote::quote! {
        #harness
        #prelude fn #name #signature {
            ::paramgraph_testhelpers::setup();
            let _span = ::paramgraph_testhelpers::__tracing::info_span!("test", test = #test_name).entered();

            #block
        }
    }
}
