//! # plinth-service
//!
//! Write orchestration and composition layer for plinth.
//!
//! This crate provides:
//! - [`MiniatureService`]: the three-step write sequence (scalars,
//!   types, tags) with validation, temp-tag reconciliation, audit
//!   logging, cache invalidation, and change-feed emission
//! - [`AuditService`]: diff-driven, best-effort history logging
//! - [`TaxonomyService`]: type/category admin with pre-check uniqueness
//! - [`HttpImageStore`]: multipart client for the image endpoint
//! - [`PlinthConfig`]: environment configuration

pub mod audit;
pub mod config;
pub mod images;
pub mod miniatures;
pub mod taxonomy;

pub use audit::AuditService;
pub use config::PlinthConfig;
pub use images::{bucket_for, storage_path, HttpImageStore, ImageStore};
pub use miniatures::{MiniatureService, WriteDefaults};
pub use taxonomy::TaxonomyService;
