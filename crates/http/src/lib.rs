//! ut-http: reqwest adapter for the ut client
//!
//! This crate provides the implementation of the Transport trait using
//! reqwest. It is the only crate that directly depends on an HTTP client.

pub mod client;

pub use client::HttpTransport;
