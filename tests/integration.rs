//! End-to-end tests for the orchestration pipeline
//!
//! These tests drive whole runs through a scripted HTTP executor:
//! 1. Cases come from an in-memory registry or a project on disk
//! 2. Requests are recorded instead of sent
//! 3. Saved fields, deltas and teardown are checked on the run afterwards

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use apiflow::cases::registry::group_dynamic_expectations;
use apiflow::common::config::Config;
use apiflow::http::{HttpExecutor, HttpMethod, HttpRequest, ResponseSnapshot};
use apiflow::orchestrator::Stage;
use apiflow::request::headers::{parse_headers, serialize_headers};
use apiflow::request::{EndpointCatalog, InMemoryTemplates, RequestPreparer};
use apiflow::resolver::{DynamicDataResolver, GeneratorRegistry};
use apiflow::testing::{self, CaseOutcome, RunOptions};
use apiflow::verify::dynamic;
use apiflow::{Error, Orchestrator, Result, TeardownQueue, TestCase, TestCaseRegistry};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Scripted replies per URL; the last reply of a URL repeats
#[derive(Default)]
struct MockServer {
    replies: Mutex<HashMap<String, Vec<ResponseSnapshot>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockServer {
    fn reply(self, url: &str, status: u16, body: Value) -> Self {
        self.replies
            .lock()
            .entry(url.to_string())
            .or_default()
            .push(ResponseSnapshot::json(status, &body));
        self
    }

    fn xml(self, url: &str, body: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/xml".to_string());
        self.replies
            .lock()
            .entry(url.to_string())
            .or_default()
            .push(ResponseSnapshot::new(200, headers, body));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    fn calls_to(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl HttpExecutor for MockServer {
    async fn execute(&self, request: &HttpRequest) -> Result<ResponseSnapshot> {
        self.requests.lock().push(request.clone());
        let mut replies = self.replies.lock();
        let queue = replies.get_mut(&request.url).ok_or_else(|| {
            Error::request_execution(&request.case_id, &request.url, "connection refused")
        })?;
        if queue.len() > 1 {
            return Ok(queue.remove(0));
        }
        let last = &queue[0];
        Ok(ResponseSnapshot::new(
            last.status(),
            last.headers().clone(),
            last.body().to_string(),
        ))
    }
}

fn case(id: &str, endpoint: &str) -> TestCase {
    TestCase {
        id: id.to_string(),
        name: format!("{id} case"),
        endpoint_key: endpoint.to_string(),
        run: true,
        expected_status: 200,
        ..TestCase::default()
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn build(
    cases: Vec<TestCase>,
    templates: InMemoryTemplates,
    server: Arc<MockServer>,
) -> Orchestrator {
    let mut endpoints = EndpointCatalog::default();
    endpoints.insert("dev", "login", "https://api.test/login", HttpMethod::Post);
    endpoints.insert("dev", "users", "https://api.test/users", HttpMethod::Post);
    endpoints.insert("dev", "count", "https://api.test/users/count", HttpMethod::Get);
    endpoints.insert("dev", "user", "https://api.test/users/{id}", HttpMethod::Get);
    endpoints.insert("dev", "cleanup", "https://api.test/cleanup", HttpMethod::Delete);
    endpoints.insert("dev", "seed", "https://api.test/seed", HttpMethod::Post);

    let preparer = RequestPreparer::new(
        Arc::new(endpoints),
        Arc::new(templates),
        DynamicDataResolver::new(Arc::new(GeneratorRegistry::empty(42))),
        "dev",
    );
    Orchestrator::new(Arc::new(TestCaseRegistry::from_cases(cases)), preparer, server)
}

#[test]
fn test_resolver_is_idempotent_on_resolved_output() {
    let resolver = DynamicDataResolver::new(Arc::new(GeneratorRegistry::empty(9)));
    let mut saved = BTreeMap::new();
    saved.insert("login.token".to_string(), "abc".to_string());

    for template in [
        "Bearer ${login.token}",
        "${unknown.field} and ${noSuchGenerator}",
        "price $5 {not a placeholder}",
        "",
    ] {
        let once = resolver.resolve(template, &saved);
        assert_eq!(resolver.resolve(&once, &saved), once, "template {template:?}");
    }
}

#[test]
fn test_resolver_does_not_expand_substituted_values() {
    let resolver = DynamicDataResolver::new(Arc::new(GeneratorRegistry::empty(9)));
    let mut saved = BTreeMap::new();
    saved.insert("login.token".to_string(), "abc".to_string());
    saved.insert("weird.value".to_string(), "${login.token}".to_string());

    assert_eq!(resolver.resolve("${weird.value}", &saved), "${login.token}");
}

#[test]
fn test_header_block_round_trip() {
    let block = "Authorization: Bearer abc\nContent-Type: application/json\nX-Trace: a:b:c";
    let parsed = parse_headers(block);
    assert_eq!(parsed.get("X-Trace").map(String::as_str), Some("a:b:c"));
    assert_eq!(parse_headers(&serialize_headers(&parsed)), parsed);
}

#[test]
fn test_grouping_of_cross_case_expectations() {
    let mut expected = BTreeMap::new();
    expected.insert("A.x".to_string(), "1".to_string());
    expected.insert("B.y".to_string(), "2".to_string());
    expected.insert("z".to_string(), "3".to_string());

    let groups = group_dynamic_expectations("C", &expected);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups["A"].get("x").map(String::as_str), Some("1"));
    assert_eq!(groups["B"].get("y").map(String::as_str), Some("2"));
    assert!(groups.values().all(|fields| !fields.contains_key("z")));
}

#[test]
fn test_dynamic_delta_three() {
    let before = ResponseSnapshot::json(200, &json!({"count": 10}));
    let after = ResponseSnapshot::json(200, &json!({"count": 13}));

    let mut plus_three = BTreeMap::new();
    plus_three.insert("count".to_string(), "+3".to_string());
    assert!(dynamic::validate(&before, &after, &plus_three).is_ok());

    let mut plus_two = BTreeMap::new();
    plus_two.insert("count".to_string(), "+2".to_string());
    let message = dynamic::validate(&before, &after, &plus_two)
        .unwrap_err()
        .to_string();
    assert!(message.contains("count"), "{message}");
    assert!(message.contains("+2"), "{message}");
    assert!(message.contains("10 -> 13"), "{message}");
}

#[tokio::test]
async fn test_login_saves_token() {
    let server = Arc::new(MockServer::default().reply(
        "https://api.test/login",
        200,
        json!({"token": "abc123"}),
    ));
    let mut login = case("LOGIN-1", "login");
    login.body_template_key = "loginBody".to_string();
    login.body_override = lines(&["user: alice"]);
    login.save_fields = lines(&["token"]);
    let templates = InMemoryTemplates::new().with("loginBody", r#"{"user": "${user}"}"#);
    let orch = build(vec![login], templates, server.clone());

    let mut run = orch.start_run();
    run.execute("LOGIN-1").await.unwrap();

    assert_eq!(run.context().get_text("token").as_deref(), Some("abc123"));
    assert_eq!(run.stage(), Some(Stage::StoredFields));
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].body.as_deref(), Some(r#"{"user": "alice"}"#));
}

#[tokio::test]
async fn test_saved_token_flows_into_next_case() {
    let server = Arc::new(
        MockServer::default()
            .reply("https://api.test/login", 200, json!({"token": "abc123"}))
            .reply("https://api.test/users/7", 200, json!({"id": 7, "name": "alice"})),
    );
    let mut login = case("LOGIN-1", "login");
    login.save_fields = lines(&["auth.token"]);
    let mut get_user = case("USER-GET", "user");
    get_user.conditions = lines(&["[TestSetup]LOGIN-1"]);
    get_user.headers_template_key = "authHeaders".to_string();
    get_user.header_override = lines(&["token: ${auth.token}"]);
    get_user.path_params = lines(&["id=7"]);
    get_user.expected_result = lines(&["name=alice"]);
    let templates =
        InMemoryTemplates::new().with("authHeaders", "Authorization: Bearer ${token}");
    let orch = build(vec![login, get_user], templates, server.clone());

    orch.run_case("USER-GET").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].url, "https://api.test/users/7");
    assert_eq!(
        requests[1].headers.get("Authorization").map(String::as_str),
        Some("Bearer abc123")
    );
}

#[tokio::test]
async fn test_setup_runs_once_per_run() {
    let server = Arc::new(
        MockServer::default()
            .reply("https://api.test/seed", 200, json!({}))
            .reply("https://api.test/users", 200, json!({})),
    );
    let seed = case("A", "seed");
    let mut create = case("B", "users");
    create.conditions = lines(&["[TestSetup]A", "[TestSetup]A"]);
    let orch = build(vec![seed, create], InMemoryTemplates::new(), server.clone());

    let mut run = orch.start_run();
    run.execute("B").await.unwrap();
    run.execute("B").await.unwrap();
    assert_eq!(server.calls_to("https://api.test/seed"), 1);
    assert_eq!(server.calls_to("https://api.test/users"), 2);
    assert!(run.executed_setups().contains("A"));

    let mut fresh = orch.start_run();
    fresh.execute("B").await.unwrap();
    assert_eq!(server.calls_to("https://api.test/seed"), 2);
}

#[tokio::test]
async fn test_teardown_drains_after_failed_verification() {
    let server = Arc::new(
        MockServer::default()
            .reply("https://api.test/users", 500, json!({"error": "boom"}))
            .reply("https://api.test/cleanup", 200, json!({})),
    );
    let mut create = case("X", "users");
    create.conditions = lines(&["[TestTeardown]T"]);
    let orch = build(
        vec![create, case("T", "cleanup")],
        InMemoryTemplates::new(),
        server.clone(),
    );

    let mut run = orch.start_run();
    let err = run.execute("X").await.unwrap_err();
    assert!(err.is_validation_failure());
    assert!(run.has_pending_teardown());

    let failures = run.drain_teardown().await;
    assert!(failures.is_empty());
    assert!(!run.has_pending_teardown());
    assert_eq!(run.stage(), Some(Stage::TeardownExecuted));
    assert_eq!(server.calls_to("https://api.test/cleanup"), 1);
}

#[tokio::test]
async fn test_pre_validation_and_delta_flow() {
    let server = Arc::new(
        MockServer::default()
            .reply("https://api.test/users/count", 200, json!({"count": 10}))
            .reply("https://api.test/users/count", 200, json!({"count": 13}))
            .reply("https://api.test/users", 201, json!({"created": 3})),
    );
    let mut bulk = case("BULK", "users");
    bulk.expected_status = 201;
    bulk.expected_result = lines(&["created=3", "COUNT.count=+3"]);
    let orch = build(
        vec![bulk, case("COUNT", "count")],
        InMemoryTemplates::new(),
        server.clone(),
    );

    let mut run = orch.start_run();
    run.execute("BULK").await.unwrap();

    let snapshot = run
        .context()
        .get_response("preValidationResponse_COUNT")
        .unwrap();
    assert_eq!(snapshot.field("count").as_deref(), Some("10"));
    let urls: Vec<_> = server.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.test/users/count",
            "https://api.test/users",
            "https://api.test/users/count",
        ]
    );
}

#[tokio::test]
async fn test_delta_mismatch_fails_case() {
    let server = Arc::new(
        MockServer::default()
            .reply("https://api.test/users/count", 200, json!({"count": 10}))
            .reply("https://api.test/users/count", 200, json!({"count": 13}))
            .reply("https://api.test/users", 200, json!({})),
    );
    let mut bulk = case("BULK", "users");
    bulk.dynamic_validation_id = Some("COUNT".to_string());
    bulk.dynamic_validation_changes = [("count".to_string(), "+2".to_string())].into();
    let orch = build(
        vec![bulk, case("COUNT", "count")],
        InMemoryTemplates::new(),
        server,
    );

    let err = orch.run_case("BULK").await.unwrap_err();
    let message = err.to_string();
    assert!(err.is_validation_failure());
    assert!(message.contains("10 -> 13"), "{message}");
}

#[tokio::test]
async fn test_xml_response_fields() {
    let server = Arc::new(MockServer::default().xml(
        "https://api.test/users/1",
        "<user><id>1</id><profile><email>a@b.c</email></profile></user>",
    ));
    let mut get_user = case("XML-1", "user");
    get_user.path_params = lines(&["id: 1"]);
    get_user.expected_result = lines(&["XML-1.profile.email=a@b.c"]);
    get_user.save_fields = lines(&["user.id"]);
    let orch = build(vec![get_user], InMemoryTemplates::new(), server);

    let mut run = orch.start_run();
    run.execute("XML-1").await.unwrap();
    assert_eq!(run.context().get_text("user.id").as_deref(), Some("1"));
}

#[tokio::test]
async fn test_shared_teardown_queue_across_runs() {
    let server = Arc::new(
        MockServer::default()
            .reply("https://api.test/users", 200, json!({}))
            .reply("https://api.test/cleanup", 200, json!({})),
    );
    let mut create = case("CREATE", "users");
    create.conditions = lines(&["[TestTeardown]CLEAN"]);
    let queue = TeardownQueue::new();
    let orch = build(
        vec![create, case("CLEAN", "cleanup")],
        InMemoryTemplates::new(),
        server.clone(),
    )
    .with_teardown_queue(queue.clone());

    let mut first = orch.start_run();
    first.execute("CREATE").await.unwrap();
    let mut second = orch.start_run();
    second.execute("CREATE").await.unwrap();
    assert_eq!(queue.len(), 2);

    let failures = second.drain_teardown().await;
    assert!(failures.is_empty());
    assert!(queue.is_empty());
    assert!(!first.has_pending_teardown());
    assert_eq!(server.calls_to("https://api.test/cleanup"), 2);
}

fn write_project(root: &Path) -> Config {
    fs::create_dir_all(root.join("cases")).unwrap();
    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(
        root.join("cases/api_test_cases.yaml"),
        r#"
API:
  - TCID: LOGIN-1
    Name: login
    Endpoint Key: login
    Body Template Key: loginBody
    Body Override: "user: alice"
    Run: Y
    Exp Status: "200.0"
    Save Fields: auth.token
  - TCID: PROFILE-1
    Name: profile
    Conditions: "[TestSetup]LOGIN-1"
    Endpoint Key: profile
    Headers Template Key: authHeaders
    Header Override: "token: ${auth.token}"
    Run: Y
    Exp Status: 200
    Exp Result: "name=alice"
  - TCID: BROKEN-1
    Name: broken
    Endpoint Key: profile
    Run: N
    Exp Status: 200
    Exp Result: "name=bob"
"#,
    )
    .unwrap();
    fs::write(
        root.join("config/api-endpoint-config.yaml"),
        r#"
staging:
  base_url: https://staging.test
  endpoints:
    login: { url: /login, method: POST }
    profile: { url: /profile }
"#,
    )
    .unwrap();
    fs::write(root.join("templates/loginBody.json"), r#"{"user": "${user}"}"#).unwrap();
    fs::write(
        root.join("templates/authHeaders.txt"),
        "Authorization: Bearer ${token}",
    )
    .unwrap();

    let config_path = root.join("apiflow.toml");
    fs::write(
        &config_path,
        "[project]\nname = \"demo\"\n\n[run]\nenvironment = \"staging\"\n",
    )
    .unwrap();
    Config::from_file(&config_path).unwrap()
}

fn project_server() -> Arc<MockServer> {
    Arc::new(
        MockServer::default()
            .reply("https://staging.test/login", 200, json!({"token": "tok-1"}))
            .reply("https://staging.test/profile", 200, json!({"name": "alice"})),
    )
}

#[tokio::test]
async fn test_project_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let server = project_server();
    let orch = Orchestrator::from_config_with_executor(&config, "staging", server.clone()).unwrap();

    orch.run_case("PROFILE-1").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].url, "https://staging.test/login");
    assert_eq!(requests[0].body.as_deref(), Some(r#"{"user": "alice"}"#));
    assert_eq!(
        requests[1].headers.get("Authorization").map(String::as_str),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn test_unknown_environment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let err = Orchestrator::from_config_with_executor(&config, "prod", project_server())
        .err()
        .unwrap();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_suite_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_project(dir.path());
    let server = project_server();
    let orch = Orchestrator::from_config_with_executor(&config, "staging", server.clone()).unwrap();

    let suite = testing::parse_suite(
        r#"
name: profile suite
parallel: true
scenarios:
  - name: happy path
    cases: [LOGIN-1, PROFILE-1]
  - name: wrong name is reported
    cases: [PROFILE-1, BROKEN-1]
    expect:
      success: false
      error_contains: "expected name to be 'bob'"
  - name: unknown case
    cases: [NOPE]
    expect:
      success: false
      error_contains: "NOPE"
"#,
    )
    .unwrap();

    let results = testing::run_suite(&suite, &orch, RunOptions::default()).await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.passed), "{results:?}");
    assert_eq!(results[0].cases_run, 2);
    assert_eq!(results[1].cases[0].outcome, CaseOutcome::Passed);
    assert!(matches!(results[1].cases[1].outcome, CaseOutcome::Failed(_)));

    // LOGIN-1 as a main case does not count as an executed setup, and the
    // second scenario starts a fresh run
    assert_eq!(server.calls_to("https://staging.test/login"), 3);
}
