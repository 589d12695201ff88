//! # memdex derive macros
//!
//! Procedural macros for the memdex record store. This crate provides the
//! `Record` derive macro, generating the field accessor a collection uses
//! to build index keys.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod generator;

/// Derive macro implementing `memdex::Record` for a struct with named
/// fields.
///
/// Every field type must convert into `memdex::Value` via `Into`; the
/// generated accessor clones the field and converts it. `merge` keeps its
/// trait default, which accepts every write; implement the trait by hand
/// when a veto or a read-modify-write is needed.
///
/// # Examples
///
/// ```ignore
/// use memdex::Record;
///
/// #[derive(Clone, Record)]
/// struct Device {
///     id: u64,
///     label: String,
/// }
/// ```
#[proc_macro_derive(Record)]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    generator::expand(&input)
}
