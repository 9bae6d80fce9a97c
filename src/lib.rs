//! flowtest: test-support for data-pipeline suites built on DataFusion.
//!
//! This facade re-exports the two workspace crates:
//!
//! - [`common`] — configuration for the engine and the external stores.
//! - [`testkit`] — suite lifecycle harness, store fixtures, and the
//!   row-set comparator.
//!
//! Most users only need the prelude:
//!
//! ```rust,ignore
//! use flowtest::prelude::*;
//!
//! let mut harness = SuiteHarness::builder()
//!     .shared()
//!     .suite_fixture(CassandraFixture::new(
//!         "cassandra.docker",
//!         resource_path!("resources/setup.cql"),
//!         resource_path!("resources/teardown.cql"),
//!     ))
//!     .build();
//! harness.start().await?;
//! ```

pub use common;
pub use testkit;

pub use testkit::prelude;
