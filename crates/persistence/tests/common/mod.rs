//! Test infrastructure for the persistence layer.
//!
//! Provides a [`harness::TestContext`] wired to a storage backend with a set
//! of seeded channels, and the [`backend_test!`] macro that runs one test body
//! against every enabled backend.

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;

/// Defines a test that runs against every enabled backend.
///
/// # Example
///
/// ```ignore
/// backend_test!(creates_project, |ctx| {
///     let record = ctx.create("default", EntityKind::Project, json!({})).await;
///     assert!(!record.is_new());
/// });
/// ```
macro_rules! backend_test {
    ($test_name:ident, |$ctx:ident| $body:block) => {
        paste::paste! {
            #[cfg(feature = "sqlite")]
            #[tokio::test]
            async fn [<sqlite_ $test_name>]() {
                let backend = beacon_persistence::backends::sqlite::SqliteBackend::in_memory()
                    .expect("Failed to create SQLite backend");
                backend.init_schema().expect("Failed to initialize schema");
                let $ctx = $crate::common::harness::TestContext::new(backend).await;
                $body
            }

            #[tokio::test]
            async fn [<memory_ $test_name>]() {
                let backend = beacon_persistence::backends::memory::MemoryBackend::new();
                let $ctx = $crate::common::harness::TestContext::new(backend).await;
                $body
            }
        }
    };
}
