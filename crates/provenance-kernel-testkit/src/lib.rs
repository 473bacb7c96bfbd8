//! # Provenance Kernel Testkit
//!
//! Testing utilities for the Provenance Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed credentials and a manifest with their expected
//!   digests and signatures
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: a started kernel over an in-memory log with seeded keys
//! - **Faults**: [`FaultyLog`], a log client that fails on demand
//!
//! ## Golden Vectors
//!
//! ```rust
//! use provenance_kernel_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, digest) in verify_all_vectors() {
//!     println!("{name}: {digest} ({})", if matches { "ok" } else { "MISMATCH" });
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use provenance_kernel_testkit::generators::valid_creators;
//!
//! proptest! {
//!     #[test]
//!     fn shares_accepted(creators in valid_creators()) {
//!         prop_assert!(provenance_kernel_core::validate_shares(&creators).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use provenance_kernel_testkit::TestFixture;
//!
//! let fixture = TestFixture::new().await;
//! let artist = fixture.register_artist("Aria").await;
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::FaultyLog;
pub use fixtures::{creators, fast_config, kernel_with, service_identity, TestFixture};
pub use vectors::{credential_from_vector, credential_vectors, verify_all_vectors, CredentialVector};
