//! Testplan data model
//!
//! This crate holds the records a testplan is made of and the rules they
//! obey on their own:
//! - testpoints and covergroups, with tag filtering
//! - test results and their time formatting
//! - `{wildcard}` substitution in test names
//! - the testplan aggregate that owns mapped results

pub mod element;
pub mod error;
pub mod progress;
pub mod result;
pub mod substitution;
pub mod testplan;

pub use element::{
    Covergroup, Element, ElementKind, TagFilter, Testpoint, TestpointRole, COVERGROUP_SUFFIX,
    NO_STAGE, UNMAPPED_MARKER,
};
pub use error::{Result, TestplanError};
pub use progress::{format_percentage, ProgressEntry};
pub use result::{format_time, ResultId, TestResult, TimeValue};
pub use substitution::{SubstValue, Substitutions, RESERVED_KEYWORDS};
pub use testplan::{Testplan, COVERGROUPS_KEY};
