//! HTTP plumbing for provider clients.

mod client;

pub use client::HttpClient;
