//! Test case registry
//!
//! Loads datasets from a [`TestCaseSource`], drops invalid records, caches
//! the result per dataset and answers lookups and dependency queries.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::model::TestCase;
use super::source::{InMemorySource, TestCaseSource};
use crate::common::{Error, Result};

/// Dataset loaded when a lookup happens before any explicit load
pub const DEFAULT_DATASET: &str = "API";

/// Loaded dataset; repeated loads hand out the same list
pub type CaseList = Arc<Vec<Arc<TestCase>>>;

/// Dynamic expectations grouped by the test case they reference
pub type DynamicGroups = BTreeMap<String, BTreeMap<String, String>>;

pub struct TestCaseRegistry {
    source: Box<dyn TestCaseSource>,
    default_dataset: String,
    cache: Mutex<HashMap<String, CaseList>>,
    index: RwLock<HashMap<String, Arc<TestCase>>>,
}

impl TestCaseRegistry {
    pub fn new(source: impl TestCaseSource + 'static, default_dataset: impl Into<String>) -> Self {
        Self {
            source: Box::new(source),
            default_dataset: default_dataset.into(),
            cache: Mutex::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Registry preloaded with already-built test cases
    pub fn from_cases(cases: impl IntoIterator<Item = TestCase>) -> Self {
        let registry = Self::new(InMemorySource::new(), DEFAULT_DATASET);
        let list = registry.admit(cases);
        registry
            .cache
            .lock()
            .insert(DEFAULT_DATASET.to_string(), list);
        registry
    }

    pub fn default_dataset(&self) -> &str {
        &self.default_dataset
    }

    /// Load a dataset, reusing the cached list when it was loaded before
    pub fn load(&self, dataset: &str) -> Result<CaseList> {
        let mut cache = self.cache.lock();
        if let Some(list) = cache.get(dataset) {
            debug!(dataset, "Returning cached test cases");
            return Ok(Arc::clone(list));
        }

        let rows = self.source.rows(dataset)?;
        let list = self.admit(rows.iter().map(TestCase::from_row));
        info!(
            dataset,
            source = %self.source.describe(),
            count = list.len(),
            "Loaded test cases"
        );
        cache.insert(dataset.to_string(), Arc::clone(&list));
        Ok(list)
    }

    /// Test cases of the default dataset
    pub fn cases(&self) -> Result<CaseList> {
        self.load(&self.default_dataset)
    }

    /// Look a test case up by identifier across every loaded dataset
    ///
    /// The default dataset is loaded on demand, even when other datasets
    /// were loaded first.
    pub fn find_by_id(&self, id: &str) -> Result<Arc<TestCase>> {
        if let Some(case) = self.index.read().get(id) {
            return Ok(Arc::clone(case));
        }
        let default_loaded = self.cache.lock().contains_key(&self.default_dataset);
        if !default_loaded {
            self.cases()?;
        }
        self.index
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TestCaseNotFound(id.to_string()))
    }

    fn admit(&self, cases: impl IntoIterator<Item = TestCase>) -> CaseList {
        let mut index = self.index.write();
        let mut list = Vec::new();
        for case in cases {
            if !case.is_valid() {
                warn!(case = %case, "Invalid test case found, skipping");
                continue;
            }
            let case = Arc::new(case);
            if index.contains_key(&case.id) {
                warn!(case_id = %case.id, "Duplicate TCID, keeping the first definition");
            } else {
                index.insert(case.id.clone(), Arc::clone(&case));
            }
            list.push(case);
        }
        Arc::new(list)
    }
}

/// Ids named by condition tags starting with `prefix`, in encounter order
pub fn extract_condition_ids(case: &TestCase, prefix: &str) -> Vec<String> {
    case.conditions
        .iter()
        .filter_map(|tag| tag.trim().strip_prefix(prefix))
        .flat_map(|rest| rest.split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Split a dynamic expected-result key into `(case id, field)`
///
/// Keys without a `.` and keys prefixed by the current case's own id are
/// static and yield `None`.
pub fn split_dynamic_key<'k>(key: &'k str, current_id: &str) -> Option<(&'k str, &'k str)> {
    let (id, field) = key.split_once('.')?;
    (id != current_id).then_some((id, field))
}

pub fn is_dynamic_key(key: &str, current_id: &str) -> bool {
    split_dynamic_key(key, current_id).is_some()
}

/// Distinct case ids referenced by dynamic expected-result keys
pub fn extract_cross_case_ids(
    current_id: &str,
    expected: &BTreeMap<String, String>,
) -> HashSet<String> {
    expected
        .keys()
        .filter_map(|key| split_dynamic_key(key, current_id))
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Group dynamic keys by referenced id, stripping the id from the field
pub fn group_dynamic_expectations(
    current_id: &str,
    expected: &BTreeMap<String, String>,
) -> DynamicGroups {
    let mut groups = DynamicGroups::new();
    for (key, value) in expected {
        if let Some((id, field)) = split_dynamic_key(key, current_id) {
            groups
                .entry(id.to_string())
                .or_default()
                .insert(field.to_string(), value.clone());
        }
    }
    groups
}

/// Every dynamic expectation of a case
///
/// The dotted expected-result keys are the general mechanism; the
/// `Dynamic Validation TCID` column and its expected changes are merged in
/// as one more group.
pub fn dynamic_groups(case: &TestCase) -> DynamicGroups {
    let mut groups = group_dynamic_expectations(&case.id, &case.expected_result_map());
    if let Some(reference) = &case.dynamic_validation_id {
        if !case.dynamic_validation_changes.is_empty() {
            groups
                .entry(reference.clone())
                .or_default()
                .extend(case.dynamic_validation_changes.clone());
        }
    }
    groups
}

/// Ids whose state must be captured before the main request
pub fn pre_validation_ids(case: &TestCase) -> Vec<String> {
    let mut ids = extract_cross_case_ids(&case.id, &case.expected_result_map());
    if let Some(reference) = &case.dynamic_validation_id {
        if !case.dynamic_validation_changes.is_empty() {
            ids.insert(reference.clone());
        }
    }
    let mut ids: Vec<_> = ids.into_iter().collect();
    ids.sort();
    ids
}
