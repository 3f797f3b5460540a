#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod provider;
pub mod session;
pub mod web;
