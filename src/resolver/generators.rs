//! Named synthetic data generators
//!
//! All randomness flows through one seeded `StdRng` so a run can be
//! replayed by pinning `[generators] seed` in the configuration.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::common::config::GeneratorConfig;

/// A generator is a function of nothing but its randomness source
pub type Generator = Box<dyn Fn(&mut StdRng) -> String + Send + Sync>;

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chen", "Dana", "Elif", "Farah", "Goran", "Hana", "Ivan", "Jonas", "Keiko",
    "Lena", "Mateo", "Nadia", "Omar", "Priya",
];

const LAST_NAMES: &[&str] = &[
    "Anders", "Baker", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Huang", "Ito",
    "Jensen", "Kowalski", "Larsen", "Moreau", "Novak", "Okafor", "Petrov",
];

const MAIL_DOMAINS: &[&str] = &["example.com", "example.org", "test.example.net"];

pub struct GeneratorRegistry {
    generators: HashMap<String, Generator>,
    rng: Mutex<StdRng>,
    seed: u64,
}

impl GeneratorRegistry {
    /// Registry with no generators; `seed` 0 picks a random seed
    pub fn empty(seed: u64) -> Self {
        let seed = if seed == 0 {
            rand::thread_rng().gen()
        } else {
            seed
        };
        debug!("Generator seed: 0x{:016x}", seed);
        Self {
            generators: HashMap::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            seed,
        }
    }

    /// Registry with the built-in generators
    pub fn with_builtins(config: &GeneratorConfig) -> Self {
        let mut registry = Self::empty(config.seed);

        let environments = if config.environments.is_empty() {
            vec!["dev".to_string()]
        } else {
            config.environments.clone()
        };
        registry.register("env", move |rng| {
            environments
                .choose(rng)
                .cloned()
                .unwrap_or_default()
        });
        registry.register("status", |_| "Active".to_string());
        registry.register("randomName", |rng| random_name(rng));
        registry.register("randomEmail", |rng| random_email(rng));
        registry.register("randomNumber", |rng| rng.gen_range(1..1000).to_string());
        registry.register("timestamp", |_| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
                .to_string()
        });
        registry
    }

    /// Add or replace a generator
    pub fn register<F>(&mut self, name: impl Into<String>, generator: F)
    where
        F: Fn(&mut StdRng) -> String + Send + Sync + 'static,
    {
        self.generators.insert(name.into(), Box::new(generator));
    }

    /// Run the generator called `name`, if one is registered
    pub fn generate(&self, name: &str) -> Option<String> {
        let generator = self.generators.get(name)?;
        let mut rng = self.rng.lock();
        Some(generator(&mut *rng))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins(&GeneratorConfig::default())
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn random_name(rng: &mut StdRng) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

fn random_email(rng: &mut StdRng) -> String {
    format!(
        "{}.{}{}@{}",
        pick(rng, FIRST_NAMES).to_lowercase(),
        pick(rng, LAST_NAMES).to_lowercase(),
        rng.gen_range(1..100),
        pick(rng, MAIL_DOMAINS)
    )
}
