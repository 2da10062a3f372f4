//! PHP-style form trees for `application/x-www-form-urlencoded` and
//! `multipart/form-data` bodies, with uploaded files kept in temporary files.
//!
//! Bracket notation names such as `meta[author]` or `tags[]` are mounted into
//! nested trees the way PHP fills `$_POST` and `$_FILES`.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use form_tree::{Limits, Transformer};
//! use http::{header::CONTENT_TYPE, Request};
//!
//! # fn main() -> Result<(), form_tree::Error> {
//! let transformer = Transformer::new(Limits::default());
//!
//! let req = Request::post("/")
//!     .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
//!     .body(Bytes::from_static(b"full_name=Ada+Lovelace&nested[one]=1&tags[]=a&tags[]=b"))
//!     .unwrap();
//!
//! let mut transformed = transformer.transform_request(req)?;
//!
//! assert!(transformed.parsed);
//! assert_eq!(
//!     transformed.body.as_deref(),
//!     Some(&br#"{"full_name":"Ada Lovelace","nested":{"one":"1"},"tags":["a","b"]}"#[..]),
//! );
//!
//! // always called, also when the request failed later on
//! transformed.release();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod content;
mod error;
mod field;
mod form;
mod limits;
mod path;
mod state;
mod transform;
mod tree;
mod upload;
mod utils;

pub use content::Content;

pub use error::{Error, ErrorKind};

pub use field::Field;

pub use form::FormData;

pub use limits::Limits;

pub use path::parse_key;

pub use state::State;

pub use transform::{Transformed, Transformer};

pub use tree::{DataTree, FileTree, Leaf, Node, Tree};

pub use upload::{ErrorCode, Upload, Uploader, Uploads};

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
