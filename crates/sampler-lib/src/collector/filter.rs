//! Namespace filtering

use crate::models::{NodeSummary, PodStats};

/// Keeps only pods from a single namespace
#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    namespace: String,
}

impl NamespaceFilter {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Exact, case-sensitive match
    pub fn matches(&self, pod: &PodStats) -> bool {
        pod.namespace() == self.namespace
    }

    /// Pods in the configured namespace, in source order
    pub fn select<'a>(
        &'a self,
        summary: &'a NodeSummary,
    ) -> impl Iterator<Item = &'a PodStats> + 'a {
        summary.pods.iter().filter(move |pod| self.matches(pod))
    }
}
