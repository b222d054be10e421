//! Shared test utilities for the remote reconciler workspace.
//!
//! This crate provides standardised fixtures so that crate test suites do
//! not each invent their own fake remote. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`remote`]: [`MemoryRemote`], an in-memory [`recon_client::RemoteClient`]
//! - [`workspace`]: [`TestWorkspace`], a temporary directory for ledger and manifest files

pub mod remote;
pub mod workspace;

pub use remote::MemoryRemote;
pub use workspace::TestWorkspace;
