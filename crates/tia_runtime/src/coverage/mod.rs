//! Source-to-test coverage data.
//!
//! The [`CoverageIndex`] is the in-memory bidirectional map between sources
//! and the test targets covering them; [`serialize`] owns the deterministic
//! on-disk form.

pub mod index;
pub mod serialize;

pub use index::CoverageIndex;
pub use serialize::{
    deserialize_source_covering_tests_list, serialize_source_covering_tests_list, SerializeError,
    SourceCoveringTests, SourceCoveringTestsList,
};
