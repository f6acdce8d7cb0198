//! Concrete block library for weave.
//!
//! Every block the engine ships lives here: the trivial transforms,
//! the HTTP fetchers, the LLM/audio blocks with their keyless
//! fallbacks, object-storage output, the tool shims and the ReAct
//! agent. Registration is explicit: the server calls [`install`] (or
//! [`default_registry`]) once at startup and freezes the registry
//! behind an `Arc` afterwards.

use std::sync::Arc;

use weave_core::BlockRegistry;

pub mod agent;
pub mod audio;
pub mod file_save;
pub mod http;
pub mod llm_simple;
pub mod media;
pub mod start;
pub mod tools;
pub mod transform;

/// Register the full block library.
pub fn install(registry: &mut BlockRegistry) {
    registry.register(Arc::new(start::StartBlock));
    registry.register(Arc::new(start::ShowBlock));

    registry.register(Arc::new(transform::TemplateBlock));
    registry.register(Arc::new(transform::UppercaseBlock));
    registry.register(Arc::new(transform::JsonGetBlock));
    registry.register(Arc::new(transform::MathAddBlock));
    registry.register(Arc::new(transform::SleepBlock));
    registry.register(Arc::new(transform::BranchBlock));

    registry.register(Arc::new(http::HttpRequestBlock));
    registry.register(Arc::new(http::WebGetBlock));

    registry.register(Arc::new(llm_simple::LlmSimpleBlock));
    registry.register(Arc::new(audio::AudioTtsBlock));
    registry.register(Arc::new(audio::AudioSttBlock));
    registry.register(Arc::new(file_save::FileSaveBlock));

    registry.register(Arc::new(tools::calculator::CalculatorBlock));
    registry.register(Arc::new(tools::HttpRequestToolBlock));
    registry.register(Arc::new(tools::WebSearchToolBlock));
    registry.register(Arc::new(tools::CodeInterpreterToolBlock));
    registry.register(Arc::new(tools::composio::ComposioToolBlock));

    registry.register(Arc::new(agent::AgentReactBlock::new()));
}

/// A fresh registry with the full library installed.
pub fn default_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();
    install(&mut registry);
    registry
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use weave_core::context::NullLogSink;
    use weave_core::{BlockRegistry, RunContext};
    use weave_llm::OfflineChatModel;

    /// Context for unit tests: offline model, no store, null log sink.
    pub fn ctx() -> RunContext {
        ctx_with_registry(BlockRegistry::new())
    }

    pub fn ctx_with_registry(registry: BlockRegistry) -> RunContext {
        RunContext::new(
            1,
            None,
            reqwest::Client::new(),
            Arc::new(registry),
            Arc::new(OfflineChatModel::new()),
            false,
            Arc::new(NullLogSink),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contains_the_library() {
        let registry = default_registry();
        for expected in [
            "start",
            "show",
            "transform.template",
            "transform.uppercase",
            "json.get",
            "math.add",
            "util.sleep",
            "control.branch",
            "http.request",
            "web.get",
            "llm.simple",
            "audio.tts",
            "audio.stt",
            "file.save",
            "tool.calculator",
            "tool.http_request",
            "tool.websearch",
            "tool.code_interpreter",
            "tool.composio",
            "agent.react",
        ] {
            assert!(registry.contains(expected), "missing block {expected}");
        }
    }

    #[test]
    fn specs_expose_schemas() {
        let registry = default_registry();
        let specs = registry.specs();
        let uppercase = specs
            .iter()
            .find(|s| s.block_type == "transform.uppercase")
            .unwrap();
        assert!(uppercase.settings_schema["properties"]["text"].is_object());
        assert!(uppercase.output_schema.is_some());

        let calc = specs
            .iter()
            .find(|s| s.block_type == "tool.calculator")
            .unwrap();
        assert!(calc.tool_compatible);
    }
}
