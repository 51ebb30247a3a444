//! Core types and configuration for SiteStack.
//!
//! This crate provides the building blocks shared by every SiteStack crate:
//! the environment-driven [`SiteStackConfig`], the top-level error type, and
//! the AWS identity types ([`AwsRegion`], [`AccountId`]) used to derive
//! resource ARNs and endpoints.

mod config;
mod error;
mod types;

pub use config::SiteStackConfig;
pub use error::{SiteStackError, SiteStackResult};
pub use types::{AccountId, AwsRegion};
