//! # ArgoWatch Argo CD client
//!
//! Reads `GET /api/v1/applications` and reduces every item to
//! name + sync status + health status.

pub mod client;

pub use client::{ArgoCdClient, parse_applications};
