#![deny(missing_docs)]

//! # dev-tool Models
//!
//! Wire types for the Rancher v3 management API, shared by the
//! `devtool-sdk` client and the `mock-rancher` server.
//!
//! ## Resource hierarchy
//!
//! ```text
//! Cluster (c-xxxxx)
//! └── Project (c-xxxxx:p-yyyyy)
//!     └── Namespace (team-x-dev)
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`resource`] | `Cluster`, `Project`, `Namespace` and their identifiers |
//! | [`collection`] | `Collection<T>` list envelope and `ListOpts` filters |
//! | [`token`] | Auth token records, kubeconfig output, API error body |
//! | [`challenge`] | Login challenge alphabet and the public-key / sealed-token codec |

pub mod challenge;
pub mod collection;
pub mod error;
pub mod resource;
pub mod token;

// Re-export all public types at crate root for convenience.
pub use collection::*;
pub use error::*;
pub use resource::*;
pub use token::*;
