use crate::agent::{AgentConfig, RetrievalAugmentation};
use crate::shared::validate_identifier_value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
}

pub const DEFAULT_MODEL: &str = "o3-2025-04-16";
pub const DEFAULT_WRITER_AGENT: &str = "writer";
pub const DEFAULT_CRITIC_AGENT: &str = "critic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSettings {
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default = "default_completion_api_key_env")]
    pub api_key_env: String,
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key_env: default_completion_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalServiceSettings {
    #[serde(default = "default_retrieval_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_retrieval_base_url() -> String {
    "http://127.0.0.1:8087".to_string()
}

impl Default for RetrievalServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_retrieval_base_url(),
            api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationSettings {
    /// Iteration budget for the critique-refine loop.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Bound on the wait for a delegated step's response.
    #[serde(default = "default_response_timeout_seconds")]
    pub response_timeout_seconds: u64,
    /// Per-step retry budget. Zero preserves the no-retry behavior.
    #[serde(default)]
    pub max_step_retries: u32,
    /// Terminal workflows beyond this count are evicted oldest-first.
    #[serde(default = "default_max_retained_workflows")]
    pub max_retained_workflows: usize,
    #[serde(default = "default_writer_agent")]
    pub writer_agent: String,
    #[serde(default = "default_critic_agent")]
    pub critic_agent: String,
    /// Engine decision log root; disabled when absent.
    #[serde(default)]
    pub log_root: Option<PathBuf>,
}

fn default_max_iterations() -> u32 {
    3
}

fn default_response_timeout_seconds() -> u64 {
    30
}

fn default_max_retained_workflows() -> usize {
    256
}

fn default_writer_agent() -> String {
    DEFAULT_WRITER_AGENT.to_string()
}

fn default_critic_agent() -> String {
    DEFAULT_CRITIC_AGENT.to_string()
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            response_timeout_seconds: default_response_timeout_seconds(),
            max_step_retries: 0,
            max_retained_workflows: default_max_retained_workflows(),
            writer_agent: default_writer_agent(),
            critic_agent: default_critic_agent(),
            log_root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Overrides the specialist's built-in system prompt when present.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub retrieval: RetrievalAugmentation,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            retrieval: RetrievalAugmentation::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub completion: CompletionSettings,
    #[serde(default)]
    pub retrieval: RetrievalServiceSettings,
    #[serde(default)]
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentSettings>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestration.max_iterations == 0 {
            return Err(ConfigError::Settings(
                "orchestration.maxIterations must be at least 1".to_string(),
            ));
        }
        if self.orchestration.response_timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "orchestration.responseTimeoutSeconds must be at least 1".to_string(),
            ));
        }
        if self.orchestration.max_retained_workflows == 0 {
            return Err(ConfigError::Settings(
                "orchestration.maxRetainedWorkflows must be at least 1".to_string(),
            ));
        }
        validate_identifier_value("orchestration.writerAgent", &self.orchestration.writer_agent)
            .map_err(ConfigError::Settings)?;
        validate_identifier_value("orchestration.criticAgent", &self.orchestration.critic_agent)
            .map_err(ConfigError::Settings)?;

        for (name, agent) in &self.agents {
            validate_identifier_value("agent name", name).map_err(ConfigError::Settings)?;
            if agent.model.trim().is_empty() {
                return Err(ConfigError::Settings(format!(
                    "agent `{name}` model must be non-empty"
                )));
            }
            if !(0.0..=2.0).contains(&agent.temperature) {
                return Err(ConfigError::Settings(format!(
                    "agent `{name}` temperature must be within [0, 2]"
                )));
            }
            if agent.max_tokens == 0 {
                return Err(ConfigError::Settings(format!(
                    "agent `{name}` maxTokens must be at least 1"
                )));
            }
            if !(0.0..=1.0).contains(&agent.retrieval.min_score) {
                return Err(ConfigError::Settings(format!(
                    "agent `{name}` retrieval.minScore must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Resolves the runtime [`AgentConfig`] for `name`, falling back to
    /// `default_system_prompt` when the settings carry no override.
    pub fn agent_config(&self, name: &str, default_system_prompt: &str) -> AgentConfig {
        let agent = self.agents.get(name).cloned().unwrap_or_default();
        AgentConfig {
            name: name.to_string(),
            system_prompt: agent
                .system_prompt
                .unwrap_or_else(|| default_system_prompt.to_string()),
            model: agent.model,
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
            retrieval: agent.retrieval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        Settings::default().validate().expect("defaults valid");
    }

    #[test]
    fn yaml_round_trip_with_partial_agent_table() {
        let settings: Settings = serde_yaml::from_str(
            r#"
orchestration:
  maxIterations: 5
  responseTimeoutSeconds: 10
agents:
  writer:
    temperature: 0.1
  answer:
    retrieval:
      enabled: true
      includeQa: true
"#,
        )
        .expect("parse settings");
        settings.validate().expect("valid settings");
        assert_eq!(settings.orchestration.max_iterations, 5);
        assert_eq!(settings.agents["writer"].temperature, 0.1);
        assert!(settings.agents["answer"].retrieval.include_qa);
        assert_eq!(settings.agents["writer"].model, DEFAULT_MODEL);
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let mut settings = Settings::default();
        settings.agents.insert(
            "writer".to_string(),
            AgentSettings {
                temperature: 3.5,
                ..AgentSettings::default()
            },
        );
        let err = settings.validate().expect_err("temperature");
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn invalid_agent_name_is_rejected() {
        let mut settings = Settings::default();
        settings
            .agents
            .insert("bad name".to_string(), AgentSettings::default());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn agent_config_prefers_settings_prompt() {
        let mut settings = Settings::default();
        settings.agents.insert(
            "critic".to_string(),
            AgentSettings {
                system_prompt: Some("be harsh".to_string()),
                ..AgentSettings::default()
            },
        );
        let config = settings.agent_config("critic", "default prompt");
        assert_eq!(config.system_prompt, "be harsh");
        let fallback = settings.agent_config("writer", "default prompt");
        assert_eq!(fallback.system_prompt, "default prompt");
    }
}
