//! Request preparer
//!
//! Turns a [`TestCase`] into an [`HttpRequest`]: endpoint lookup, override
//! resolution, template rendering, header parsing and parameter
//! substitution. All resolution happens on local copies; the context store
//! is only read.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::endpoints::EndpointCatalog;
use super::headers::{find_header, parse_headers};
use super::template::TemplateRenderer;
use crate::cases::TestCase;
use crate::common::{Error, Result};
use crate::context::ContextStore;
use crate::http::HttpRequest;
use crate::resolver::DynamicDataResolver;

#[derive(Clone)]
pub struct RequestPreparer {
    endpoints: Arc<EndpointCatalog>,
    templates: Arc<dyn TemplateRenderer>,
    resolver: DynamicDataResolver,
    environment: String,
}

impl RequestPreparer {
    pub fn new(
        endpoints: Arc<EndpointCatalog>,
        templates: Arc<dyn TemplateRenderer>,
        resolver: DynamicDataResolver,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            endpoints,
            templates,
            resolver,
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn endpoints(&self) -> &EndpointCatalog {
        &self.endpoints
    }

    pub fn prepare(&self, case: &TestCase, context: &ContextStore) -> Result<HttpRequest> {
        if case.endpoint_key.trim().is_empty() {
            return Err(Error::request_preparation(&case.id, "Endpoint or method not set"));
        }
        let endpoint = self.endpoints.resolve(&self.environment, &case.endpoint_key)?;
        debug!(case_id = %case.id, url = %endpoint.url, method = %endpoint.method, "Set endpoint");

        let saved = context.saved_fields();

        let body_data = self.resolver.resolve_map(&case.body_override_map(), &saved);
        let body = self.render(case, &case.body_template_key, &body_data)?;

        let header_data = self.resolver.resolve_map(&case.header_override_map(), &saved);
        let mut headers = parse_headers(&self.render(case, &case.headers_template_key, &header_data)?);

        if !body.trim().is_empty() && find_header(&headers, "Content-Type").is_none() {
            if let Some(content_type) = content_type_hint(&case.body_template_key) {
                headers.insert("Content-Type".to_string(), content_type.to_string());
            }
        }

        let query = self.resolver.resolve_map(&case.query_param_map(), &saved);
        let path = self.resolver.resolve_map(&case.path_param_map(), &saved);
        let url = substitute_path_params(&case.id, &endpoint.url, &path);

        Ok(HttpRequest {
            case_id: case.id.clone(),
            method: endpoint.method,
            url,
            headers,
            body: (!body.is_empty()).then_some(body),
            query,
        })
    }

    fn render(
        &self,
        case: &TestCase,
        template_key: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<String> {
        debug!(case_id = %case.id, template = template_key, data = ?data, "Rendering template");
        self.templates.render(template_key, data).inspect_err(|e| {
            error!(case_id = %case.id, template = template_key, error = %e, "Failed to prepare request");
        })
    }
}

/// Content type implied by a body template key
pub fn content_type_hint(template_key: &str) -> Option<&'static str> {
    let key = template_key.to_ascii_lowercase();
    if key.contains("xml") {
        Some("application/xml")
    } else if key.contains("json") {
        Some("application/json")
    } else {
        None
    }
}

fn substitute_path_params(case_id: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut url = url.to_string();
    for (name, value) in params {
        let segment = format!("{{{name}}}");
        if url.contains(&segment) {
            url = url.replace(&segment, value);
        } else {
            warn!(case_id, param = %name, "Path parameter not present in endpoint URL");
        }
    }
    url
}
