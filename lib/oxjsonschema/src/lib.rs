#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_favicon_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]

mod constraint;
mod error;
mod factory;
mod limits;
mod loader;
mod meta;
mod model;
mod pointer;
mod reference;
mod report;
mod uri;
mod validator;
mod value;

pub use constraint::{Constraint, FormatKind, ItemsSchema, TypeKind};
pub use error::{
    InvalidValue, JsonSchemaError, PointerError, ReferenceError, SchemaError, UriError, ValueError,
};
pub use factory::SchemaFactory;
pub use limits::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_REFERENCE_CHAIN, DEFAULT_MAX_REGEX_LENGTH, Limits,
};
pub use loader::{DocumentCache, LoadDocumentCallback, RemoteDocument};
pub use meta::meta_schema;
pub use model::{Schema, SchemaBuilder, SchemaId};
pub use pointer::Pointer;
pub use reference::{Document, ReferenceResolver, Target};
pub use report::{DEPTH_KEYWORD, Issue, IssueRenderer, ValidationResult};
pub use uri::{Uri, UriKind, UriReference, UriResolver};
pub use validator::Validator;
pub use value::{Elements, Members, REFERENCE_KEY, RawValue, Value, ValueKind};
