//! Bosun Core
//!
//! Core types and abstractions for the Bosun job orchestration system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, JobManifest, etc.)
//! - DTOs: Data transfer objects for the control and callback surfaces

pub mod domain;
pub mod dto;
