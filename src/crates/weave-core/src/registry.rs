//! The block registry: `type` string → block implementation.
//!
//! The registry is populated once at startup by an explicit install
//! function and is read-only afterwards; it is the only process-wide
//! state in the engine. Settings validation compiles each block's
//! declared JSON Schema on demand (validation happens at workflow
//! write time, not on the execution hot path).

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;

use crate::block::{Block, BlockInput, BlockKind};
use crate::context::RunContext;
use crate::error::BlockError;

/// Catalog entry describing a registered block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockSpec {
    #[serde(rename = "type")]
    pub block_type: String,
    pub kind: BlockKind,
    pub summary: String,
    pub tool_compatible: bool,
    pub settings_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

/// Map of block type names to implementations.
#[derive(Default)]
pub struct BlockRegistry {
    blocks: BTreeMap<String, Arc<dyn Block>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block. Later registrations of the same type replace
    /// earlier ones; registration only happens during startup.
    pub fn register(&mut self, block: Arc<dyn Block>) {
        self.blocks.insert(block.type_name().to_string(), block);
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Block>> {
        self.blocks.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.blocks.contains_key(type_name)
    }

    /// Sorted list of registered type names.
    pub fn types(&self) -> Vec<String> {
        self.blocks.keys().cloned().collect()
    }

    /// Full catalog, sorted by type name.
    pub fn specs(&self) -> Vec<BlockSpec> {
        self.blocks
            .values()
            .map(|block| BlockSpec {
                block_type: block.type_name().to_string(),
                kind: block.kind(),
                summary: block.summary().to_string(),
                tool_compatible: block.tool_compatible(),
                settings_schema: block.settings_schema(),
                output_schema: block.output_schema(),
                extras: block.extras(),
            })
            .collect()
    }

    /// Whether a type may be attached to an agent as a tool: either the
    /// block declares the flag or the type carries the `tool.` prefix.
    pub fn is_tool_compatible(&self, type_name: &str) -> bool {
        match self.blocks.get(type_name) {
            Some(block) => block.tool_compatible() || type_name.starts_with("tool."),
            None => false,
        }
    }

    /// Validate a settings object against the block's declared schema.
    pub fn validate_settings(&self, type_name: &str, settings: &Value) -> Result<(), String> {
        let block = self
            .blocks
            .get(type_name)
            .ok_or_else(|| format!("unknown block type: {type_name}"))?;
        let schema = block.settings_schema();
        let compiled = JSONSchema::compile(&schema)
            .map_err(|e| format!("schema for {type_name} failed to compile: {e}"))?;
        if let Err(errors) = compiled.validate(settings) {
            let details: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(details.join("; "));
        }
        Ok(())
    }

    /// Invoke a block by type name.
    pub async fn run(
        &self,
        type_name: &str,
        input: &BlockInput,
        ctx: &RunContext,
    ) -> Result<Value, BlockError> {
        let block = self
            .blocks
            .get(type_name)
            .ok_or_else(|| BlockError::Config(format!("unknown block type: {type_name}")))?;
        block.run(input, ctx).await
    }
}

impl std::fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("types", &self.types())
            .finish()
    }
}
