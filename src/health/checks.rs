//! Health-check matching rules and predicates.
//!
//! # Responsibilities
//! - Decide whether a request is a health probe (user agent or path match)
//! - Hold the ordered list of application health predicates
//!
//! # Design Decisions
//! - Matching sets are normalized `BTreeSet<String>`; the string-or-list form
//!   only exists on the config surface
//! - Predicates may be sync or async; all are awaited in order

use axum::http::{HeaderMap, Method};
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use crate::config::HealthCheckSettings;

/// Type-erased health predicate.
pub type HealthPredicate = Arc<dyn Fn(HealthProbe) -> BoxFuture<'static, bool> + Send + Sync>;

/// The parts of an inbound request a health predicate may inspect.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    pub method: Method,
    pub path: String,
    pub user_agent: Option<String>,
    pub headers: HeaderMap,
}

/// Live health-check configuration, swapped atomically on update.
#[derive(Clone, Default)]
pub struct HealthCheckConfig {
    pub match_user_agents: BTreeSet<String>,
    pub match_paths: BTreeSet<String>,
    pub checks: Vec<HealthPredicate>,
}

impl HealthCheckConfig {
    /// True if the request should be answered with the health response.
    pub fn matches(&self, user_agent: Option<&str>, path: &str) -> bool {
        user_agent.is_some_and(|ua| self.match_user_agents.contains(ua)) || self.match_paths.contains(path)
    }

    /// Append a predicate. Sync predicates can return `std::future::ready(..)`
    /// or be wrapped in an `async move` block.
    pub fn add_check<F, Fut>(&mut self, check: F)
    where
        F: Fn(HealthProbe) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.checks.push(Arc::new(move |probe: HealthProbe| check(probe).boxed()));
    }

    /// Run every application predicate in order; true only if all pass.
    pub async fn run_checks(&self, probe: &HealthProbe) -> bool {
        for check in &self.checks {
            if !check(probe.clone()).await {
                return false;
            }
        }
        true
    }
}

impl From<&HealthCheckSettings> for HealthCheckConfig {
    fn from(settings: &HealthCheckSettings) -> Self {
        Self {
            match_user_agents: settings.user_agent.to_set(),
            match_paths: settings.endpoint.to_set(),
            checks: Vec::new(),
        }
    }
}

impl std::fmt::Debug for HealthCheckConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheckConfig")
            .field("match_user_agents", &self.match_user_agents)
            .field("match_paths", &self.match_paths)
            .field("checks", &self.checks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(path: &str) -> HealthProbe {
        HealthProbe {
            method: Method::GET,
            path: path.to_string(),
            user_agent: None,
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn default_settings_match_known_probes() {
        let config = HealthCheckConfig::from(&HealthCheckSettings::default());
        assert!(config.matches(Some("GoogleHC/1.0"), "/anything"));
        assert!(!config.matches(Some("curl/8.0"), "/"));
        assert!(!config.matches(None, "/"));
    }

    #[test]
    fn path_match_is_exact() {
        let mut config = HealthCheckConfig::default();
        config.match_paths.insert("/healthz".into());
        assert!(config.matches(None, "/healthz"));
        assert!(!config.matches(None, "/healthz/deep"));
    }

    #[tokio::test]
    async fn checks_run_in_order_and_all_must_pass() {
        let mut config = HealthCheckConfig::default();
        assert!(config.run_checks(&probe("/")).await);

        config.add_check(|_| std::future::ready(true));
        config.add_check(|probe| async move { probe.path != "/broken" });
        assert!(config.run_checks(&probe("/")).await);
        assert!(!config.run_checks(&probe("/broken")).await);
    }
}
