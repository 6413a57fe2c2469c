// let's document our code for other/future developers
#![deny(missing_docs)]
#![cfg_attr(docsrs, deny(rustdoc::broken_intra_doc_links))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
//! Please have a look at the documentation of the separate modules for examples on how to use them.

/// **Redis cluster** (prebuilt quick-cluster image) testcontainer
pub mod cluster;
/// PING/SET/GET smoke-test flow against the running cluster
pub mod smoke;

/// Re-exported version of `testcontainers` to avoid version conflicts
pub use testcontainers;
