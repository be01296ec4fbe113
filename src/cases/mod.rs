//! Test case model, tabular sources and the registry

pub mod model;
pub mod registry;
pub mod source;

pub use model::{ConditionKind, Row, TestCase};
pub use registry::{CaseList, DynamicGroups, TestCaseRegistry};
pub use source::{InMemorySource, TestCaseSource, YamlFileSource};
