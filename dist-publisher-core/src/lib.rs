#![doc = "dist-publisher-core: core logic library for dist-publisher."]

//! This crate contains the deployment pipeline for dist-publisher: project
//! discovery, descriptor and branch resolution, bucket purge and build-output upload.
//! The concrete storage client lives in the binary crate; everything here talks
//! to storage through [`contract::ObjectStorage`].
//!
//! # Usage
//! Add this as a dependency for all shared pipeline, policy, config and sync code.

pub mod branch;
pub mod bucket;
pub mod config;
pub mod content_policy;
pub mod contract;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod purge;
pub mod retry;
pub mod synchronise;
pub mod upload;
