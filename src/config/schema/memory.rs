use serde::{Deserialize, Serialize};

/// Tuning for the conversation memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Upper bound on messages handed to the completion provider
    #[serde(default = "default_max_context_size")]
    pub max_context_size: usize,
    /// Whether system messages appear in the context window by default
    #[serde(default = "default_true")]
    pub include_system_prompts: bool,
    /// Create summary snapshots automatically as history grows
    #[serde(default = "default_true")]
    pub long_term_memory_enabled: bool,
    /// Un-summarized message count that triggers an automatic snapshot
    #[serde(default = "default_summarization_threshold")]
    pub summarization_threshold: usize,
    /// Model used when asking the provider for a summary
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
}

fn default_max_context_size() -> usize {
    20
}
fn default_true() -> bool {
    true
}
fn default_summarization_threshold() -> usize {
    10
}
fn default_summary_model() -> String {
    "llama-3.1-8b-instant".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_context_size: default_max_context_size(),
            include_system_prompts: true,
            long_term_memory_enabled: true,
            summarization_threshold: default_summarization_threshold(),
            summary_model: default_summary_model(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.max_context_size >= 1,
            "memory.max_context_size must be at least 1"
        );
        anyhow::ensure!(
            !self.summary_model.trim().is_empty(),
            "memory.summary_model must not be empty"
        );
        Ok(())
    }
}
