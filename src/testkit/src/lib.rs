//! Test-support toolkit for data-pipeline suites built on DataFusion.
//!
//! The pieces, in dependency order:
//!
//! - [`context`] — the engine context abstraction and its local
//!   implementation, plus the factories that build contexts.
//! - [`registry`] — the explicit registry holding the one shared context
//!   a process keeps alive between suites.
//! - [`harness`] — suite lifecycle: start/stop a context around a suite,
//!   load/unload fixtures at suite and per-test scope.
//! - [`fixtures`] — datasets loaded into external stores (wide-column,
//!   search index, relational) before tests and removed afterwards.
//! - [`compare`] — row-set comparison of computed results against
//!   expected rows.

pub mod compare;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod registry;

pub mod prelude {
    pub use crate::compare::{
        CompareOptions, assert_dataframe_eq, assert_rows_eq, check_dataframe, check_rows,
    };
    pub use crate::context::{
        ContextFactory, EngineContext, LocalContextFactory, LocalEngineContext,
    };
    pub use crate::error::{CompareError, EngineError, FixtureError, HarnessError};
    pub use crate::fixtures::{
        CassandraFixture, ElasticFixture, Fixture, MysqlFixture, read_file, with_fixture,
        with_fixtures,
    };
    pub use crate::harness::{ContextPolicy, SuiteHarness, SuiteHarnessBuilder};
    pub use crate::registry::ContextRegistry;
    pub use crate::resource_path;
}
