//! Request preparation: endpoints, templates, headers

pub mod endpoints;
pub mod headers;
pub mod preparer;
pub mod template;

pub use endpoints::{Endpoint, EndpointCatalog};
pub use preparer::RequestPreparer;
pub use template::{FileTemplateRenderer, InMemoryTemplates, TemplateRenderer};
