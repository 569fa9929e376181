//! Convenience endpoint/model resolution for the bundled OpenAI-compatible provider.
//!
//! Resolves both base URL and model name for a handful of well-known local
//! servers (LM Studio, Ollama, vLLM, llama.cpp). The provider-agnostic core
//! has no opinion on backends, so this module exists purely to support
//! [`crate::providers::openai_compat::OpenAiCompatProvider`] construction;
//! the `Client`/`Runner` types never reference it directly.

use std::env;
use std::str::FromStr;

/// A well-known local OpenAI-compatible server, each with a default URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPreset {
    LMStudio,
    Ollama,
    LlamaCpp,
    VLLM,
}

impl ServerPreset {
    pub fn default_url(&self) -> &'static str {
        match self {
            ServerPreset::LMStudio => "http://localhost:1234/v1",
            ServerPreset::Ollama => "http://localhost:11434/v1",
            ServerPreset::LlamaCpp => "http://localhost:8080/v1",
            ServerPreset::VLLM => "http://localhost:8000/v1",
        }
    }
}

impl FromStr for ServerPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(ServerPreset::LMStudio),
            "ollama" => Ok(ServerPreset::Ollama),
            "llamacpp" | "llama-cpp" | "llama_cpp" | "llama.cpp" => Ok(ServerPreset::LlamaCpp),
            "vllm" => Ok(ServerPreset::VLLM),
            _ => Err(format!("unknown server preset: {s}")),
        }
    }
}

/// Resolves a base URL: `OPEN_AGENT_BASE_URL` env var, then `preset`'s
/// default, then `fallback`, then LM Studio's default.
pub fn get_base_url(preset: Option<ServerPreset>, fallback: Option<&str>) -> String {
    if let Ok(url) = env::var("OPEN_AGENT_BASE_URL") {
        return url;
    }
    if let Some(p) = preset {
        return p.default_url().to_string();
    }
    fallback.unwrap_or(ServerPreset::LMStudio.default_url()).to_string()
}

/// Resolves a model name: optionally checks `OPEN_AGENT_MODEL` first, then `fallback`.
pub fn get_model(fallback: Option<&str>, prefer_env: bool) -> Option<String> {
    if prefer_env {
        if let Ok(model) = env::var("OPEN_AGENT_MODEL") {
            return Some(model);
        }
    }
    fallback.map(|s| s.to_string())
}
