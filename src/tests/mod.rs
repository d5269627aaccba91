//! # Crate Test Support
//!
//! Shared fixtures used by the module tests, plus end-to-end pipeline
//! scenarios driven through a canned [`crate::source::JsonSource`].
