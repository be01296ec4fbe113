//! HTTP plumbing: request description, executor capability, snapshots

pub mod executor;
pub mod method;
pub mod snapshot;
pub mod xml;

pub use executor::{ExecutorOptions, HttpExecutor, HttpRequest, ReqwestExecutor};
pub use method::HttpMethod;
pub use snapshot::ResponseSnapshot;
