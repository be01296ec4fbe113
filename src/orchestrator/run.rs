//! Per-case lifecycle
//!
//! An [`Orchestrator`] holds the shared collaborators. Each logical run is a
//! [`Run`]: its own context store, its own record of executed setups and a
//! teardown queue (private unless one was injected). Setup, pre-validation
//! and teardown cases re-enter the same pipeline; the caller's frame is
//! parked while they execute and restored afterwards.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::{debug, error, info, warn};

use super::teardown::TeardownQueue;
use crate::cases::registry::{dynamic_groups, extract_condition_ids, pre_validation_ids};
use crate::cases::{ConditionKind, TestCase, TestCaseRegistry, YamlFileSource};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::context::ContextStore;
use crate::http::{ExecutorOptions, HttpExecutor, ReqwestExecutor, ResponseSnapshot};
use crate::request::{EndpointCatalog, FileTemplateRenderer, RequestPreparer};
use crate::resolver::{DynamicDataResolver, GeneratorRegistry};
use crate::verify::{check_content, check_status, dynamic};

/// Context key under which a pre-validation snapshot of `id` is stored
pub const PRE_VALIDATION_PREFIX: &str = "preValidationResponse_";

pub fn pre_validation_key(id: &str) -> String {
    format!("{PRE_VALIDATION_PREFIX}{id}")
}

/// Where the current test case is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loaded,
    SetupExecuted,
    PreValidated,
    MainExecuted,
    Verified,
    StoredFields,
    TeardownExecuted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::SetupExecuted => write!(f, "setup executed"),
            Self::PreValidated => write!(f, "pre-validated"),
            Self::MainExecuted => write!(f, "main executed"),
            Self::Verified => write!(f, "verified"),
            Self::StoredFields => write!(f, "stored fields"),
            Self::TeardownExecuted => write!(f, "teardown executed"),
        }
    }
}

/// Collaborators shared by every run
pub struct Orchestrator {
    registry: Arc<TestCaseRegistry>,
    preparer: RequestPreparer,
    executor: Arc<dyn HttpExecutor>,
    shared_teardown: Option<TeardownQueue>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<TestCaseRegistry>,
        preparer: RequestPreparer,
        executor: Arc<dyn HttpExecutor>,
    ) -> Self {
        Self {
            registry,
            preparer,
            executor,
            shared_teardown: None,
        }
    }

    /// Build everything from configuration
    ///
    /// Missing project files and an unknown environment are reported here,
    /// before any request goes out.
    pub fn from_config(config: &Config, environment: &str, relaxed_https: bool) -> Result<Self> {
        let executor = ReqwestExecutor::new(&ExecutorOptions {
            relaxed_https: relaxed_https || config.run.relaxed_https,
            timeout: std::time::Duration::from_secs(config.http.timeout_secs),
            user_agent: config.http.user_agent.clone(),
        })?;
        Self::from_config_with_executor(config, environment, Arc::new(executor))
    }

    /// Like [`Orchestrator::from_config`] but sending through `executor`
    pub fn from_config_with_executor(
        config: &Config,
        environment: &str,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self> {
        let cases = config.cases_path();
        if !cases.is_file() {
            return Err(Error::Config(format!(
                "Test case source not found: {}",
                cases.display()
            )));
        }
        let endpoints_path = config.endpoints_path();
        if !endpoints_path.is_file() {
            return Err(Error::Config(format!(
                "Endpoint configuration not found: {}",
                endpoints_path.display()
            )));
        }
        let endpoints = EndpointCatalog::from_file(&endpoints_path)?;
        endpoints.ensure_environment(environment)?;

        let templates = config.templates_path();
        if !templates.is_dir() {
            warn!(path = %templates.display(), "Template directory does not exist");
        }

        let registry = TestCaseRegistry::new(
            YamlFileSource::new(cases),
            config.project.dataset.clone(),
        );
        let resolver =
            DynamicDataResolver::new(Arc::new(GeneratorRegistry::with_builtins(&config.generators)));
        let preparer = RequestPreparer::new(
            Arc::new(endpoints),
            Arc::new(FileTemplateRenderer::new(templates)),
            resolver,
            environment,
        );
        info!(
            project = %config.project.name,
            environment,
            "Orchestrator ready"
        );
        Ok(Self::new(Arc::new(registry), preparer, executor))
    }

    /// Share one teardown queue across every run started from here
    pub fn with_teardown_queue(mut self, queue: TeardownQueue) -> Self {
        self.shared_teardown = Some(queue);
        self
    }

    pub fn registry(&self) -> &TestCaseRegistry {
        &self.registry
    }

    pub fn preparer(&self) -> &RequestPreparer {
        &self.preparer
    }

    /// Start a run with a fresh context scope
    pub fn start_run(&self) -> Run<'_> {
        self.start_run_with(ContextStore::new())
    }

    pub fn start_run_with(&self, context: ContextStore) -> Run<'_> {
        Run {
            orchestrator: self,
            context,
            executed_setups: HashSet::new(),
            teardown: self.shared_teardown.clone().unwrap_or_default(),
            frame: None,
        }
    }

    /// Execute one case as its own run; teardown always drains
    pub async fn run_case(&self, id: &str) -> Result<()> {
        let mut run = self.start_run();
        let result = run.execute(id).await;
        run.drain_teardown().await;
        result
    }
}

/// A teardown case that failed while draining
#[derive(Debug)]
pub struct TeardownFailure {
    pub case_id: String,
    pub error: Error,
}

struct Frame {
    case: Arc<TestCase>,
    response: Option<Arc<ResponseSnapshot>>,
    stage: Stage,
}

/// One logical run
pub struct Run<'o> {
    orchestrator: &'o Orchestrator,
    context: ContextStore,
    executed_setups: HashSet<String>,
    teardown: TeardownQueue,
    frame: Option<Frame>,
}

impl<'o> Run<'o> {
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn teardown_queue(&self) -> &TeardownQueue {
        &self.teardown
    }

    pub fn has_pending_teardown(&self) -> bool {
        self.teardown.has_pending()
    }

    pub fn stage(&self) -> Option<Stage> {
        self.frame.as_ref().map(|f| f.stage)
    }

    pub fn current_case(&self) -> Option<Arc<TestCase>> {
        self.frame.as_ref().map(|f| Arc::clone(&f.case))
    }

    pub fn current_response(&self) -> Option<Arc<ResponseSnapshot>> {
        self.frame.as_ref().and_then(|f| f.response.clone())
    }

    /// Setup ids already executed in this run
    pub fn executed_setups(&self) -> &HashSet<String> {
        &self.executed_setups
    }

    /// Steps 1 to 7 for `id`; teardown is left queued for [`Run::drain_teardown`]
    pub async fn execute(&mut self, id: &str) -> Result<()> {
        self.pipeline(id.to_string(), true).await
    }

    pub fn load_test_case(&mut self, id: &str) -> Result<Arc<TestCase>> {
        let case = self.orchestrator.registry.find_by_id(id)?;
        info!(case_id = %case.id, name = %case.name, "Loaded test case");
        self.frame = Some(Frame {
            case: Arc::clone(&case),
            response: None,
            stage: Stage::Loaded,
        });
        Ok(case)
    }

    pub async fn execute_setup(&mut self) -> Result<()> {
        let case = self.case()?;
        for id in extract_condition_ids(&case, ConditionKind::Setup.prefix()) {
            if !self.executed_setups.insert(id.clone()) {
                debug!(case_id = %case.id, setup = %id, "Setup already executed in this run");
                continue;
            }
            info!(case_id = %case.id, setup = %id, "Executing setup test case");
            self.execute_nested(id, true).await?;
        }
        self.advance(Stage::SetupExecuted);
        Ok(())
    }

    pub fn register_teardown(&mut self) -> Result<()> {
        let case = self.case()?;
        self.teardown
            .register(extract_condition_ids(&case, ConditionKind::Teardown.prefix()));
        Ok(())
    }

    pub async fn execute_pre_validation(&mut self) -> Result<()> {
        let case = self.case()?;
        for id in pre_validation_ids(&case) {
            info!(case_id = %case.id, reference = %id, "Capturing pre-validation state");
            let reference = self.orchestrator.registry.find_by_id(&id)?;
            let snapshot = self.send(&reference).await?;
            self.context.set_data(pre_validation_key(&id), snapshot);
        }
        self.advance(Stage::PreValidated);
        Ok(())
    }

    pub async fn execute_main(&mut self) -> Result<()> {
        let case = self.case()?;
        let response = self.send(&case).await?;
        if let Some(frame) = self.frame.as_mut() {
            frame.response = Some(response);
        }
        self.advance(Stage::MainExecuted);
        Ok(())
    }

    pub async fn verify(&mut self) -> Result<()> {
        let case = self.case()?;
        let response = self.response()?;

        let mut failures = Vec::new();
        failures.extend(check_status(&case.id, &response, case.expected_status));
        failures.extend(check_content(&case.id, &response, &case.expected_result_map()));
        if !failures.is_empty() {
            return Err(Error::ResponseValidation(failures));
        }

        for (id, changes) in dynamic_groups(&case) {
            let key = pre_validation_key(&id);
            let before = self.context.get_response(&key).ok_or_else(|| {
                error!(case_id = %case.id, key = %key, "Pre-validation snapshot missing");
                Error::MissingContextData(key.clone())
            })?;
            let reference = self.orchestrator.registry.find_by_id(&id)?;
            info!(case_id = %case.id, reference = %id, "Starting dynamic validation");
            let after = self.send(&reference).await?;
            match dynamic::validate(&before, &after, &changes) {
                Ok(()) => {}
                Err(Error::ResponseValidation(found)) => failures.extend(found),
                Err(other) => return Err(other),
            }
        }
        if !failures.is_empty() {
            return Err(Error::ResponseValidation(failures));
        }

        self.advance(Stage::Verified);
        Ok(())
    }

    pub fn store_save_fields(&mut self) -> Result<()> {
        let case = self.case()?;
        let response = self.response()?;
        for key in &case.save_fields {
            let path = key.split_once('.').map_or(key.as_str(), |(_, field)| field);
            let value = response.field(path).ok_or_else(|| {
                error!(case_id = %case.id, key = %key, "Save field not present in response");
                Error::invalid_field_path(&case.id, key)
            })?;
            info!(case_id = %case.id, key = %key, value = %value, "Stored response value");
            self.context.set_data(key.clone(), value);
        }
        self.advance(Stage::StoredFields);
        Ok(())
    }

    /// Execute every queued teardown case, best effort
    ///
    /// Failures are logged and returned; they never stop the remaining ids
    /// from running. Teardown cases do not register teardown of their own.
    pub async fn drain_teardown(&mut self) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        loop {
            let ids = self.teardown.take_all();
            if ids.is_empty() {
                break;
            }
            for id in ids {
                info!(teardown = %id, "Executing teardown test case");
                if let Err(error) = self.execute_nested(id.clone(), false).await {
                    error!(teardown = %id, error = %error, "Teardown test case failed");
                    failures.push(TeardownFailure { case_id: id, error });
                }
            }
        }
        self.advance(Stage::TeardownExecuted);
        failures
    }

    fn pipeline(&mut self, id: String, register_teardown: bool) -> BoxFuture<'_, Result<()>> {
        async move {
            self.load_test_case(&id)?;
            self.execute_setup().await?;
            if register_teardown {
                self.register_teardown()?;
            }
            self.execute_pre_validation().await?;
            self.execute_main().await?;
            self.verify().await?;
            self.store_save_fields()?;
            info!(case_id = %id, "Test case passed");
            Ok(())
        }
        .boxed()
    }

    async fn execute_nested(&mut self, id: String, register_teardown: bool) -> Result<()> {
        let parked = self.frame.take();
        let result = self.pipeline(id, register_teardown).await;
        self.frame = parked;
        result
    }

    async fn send(&self, case: &TestCase) -> Result<Arc<ResponseSnapshot>> {
        let request = self.orchestrator.preparer.prepare(case, &self.context)?;
        request.log();
        let response = self.orchestrator.executor.execute(&request).await.inspect_err(|e| {
            error!(case_id = %case.id, endpoint = %case.endpoint_key, error = %e, "Request failed");
        })?;
        response.log(&case.id);
        Ok(Arc::new(response))
    }

    fn case(&self) -> Result<Arc<TestCase>> {
        self.current_case()
            .ok_or_else(|| Error::Internal("no test case loaded".to_string()))
    }

    fn response(&self) -> Result<Arc<ResponseSnapshot>> {
        self.current_response()
            .ok_or_else(|| Error::Internal("main request has not been executed".to_string()))
    }

    fn advance(&mut self, stage: Stage) {
        if let Some(frame) = self.frame.as_mut() {
            debug!(case_id = %frame.case.id, from = %frame.stage, to = %stage, "Stage transition");
            frame.stage = stage;
        }
    }
}
