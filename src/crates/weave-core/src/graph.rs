//! Workflow graph document: nodes, typed edges, validation and ordering.
//!
//! A graph is a set of typed nodes joined by two kinds of edges:
//!
//! - **control** edges drive scheduling — the subgraph they induce must
//!   be acyclic and yields the topological order the executor walks
//! - **tool** edges attach tool nodes to an agent node; they are
//!   invisible to the scheduler and may form any shape
//!
//! Ordering is deterministic: ties are resolved by node insertion order,
//! so two runs of the same graph observe the identical visit order. This
//! is a contract, not an implementation detail.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;
use crate::registry::BlockRegistry;

/// Optional editor canvas coordinates; ignored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single computation node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique id within the graph.
    pub id: String,

    /// Block type, resolved through the registry at validation time.
    #[serde(rename = "type")]
    pub node_type: String,

    /// Block settings; validated against the block's settings schema.
    #[serde(default = "empty_object")]
    pub settings: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Edge kind; defaults to `control` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Control,
    Tool,
}

/// A directed edge between two nodes.
///
/// The wire name for the source is `from`; `from_node` is accepted on
/// input for compatibility with older documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,

    #[serde(rename = "from", alias = "from_node")]
    pub from: String,

    pub to: String,

    #[serde(default)]
    pub kind: EdgeKind,
}

/// The workflow graph document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Structural validation: unique node ids, resolvable edge
    /// endpoints, acyclic control subgraph. Does not consult the block
    /// registry, so it can run wherever a graph document is parsed.
    pub fn validate_structure(&self) -> Result<Vec<String>, GraphError> {
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }
        for edge in &self.edges {
            if !seen.contains(edge.from.as_str()) || !seen.contains(edge.to.as_str()) {
                return Err(GraphError::UnknownEndpoint {
                    edge_id: edge.id.clone(),
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            }
        }
        self.toposort()
    }

    /// Full validation against a block registry: structure plus known
    /// block types, settings schemas and agent tool declarations.
    /// Returns the topological order of control edges.
    pub fn validate(&self, registry: &BlockRegistry) -> Result<Vec<String>, GraphError> {
        let order = self.validate_structure()?;

        for node in &self.nodes {
            let block = registry.get(&node.node_type).ok_or_else(|| {
                GraphError::UnknownBlockType {
                    node_id: node.id.clone(),
                    block_type: node.node_type.clone(),
                }
            })?;

            if let Err(message) = registry.validate_settings(&node.node_type, &node.settings) {
                return Err(GraphError::InvalidSettings {
                    node_id: node.id.clone(),
                    message,
                });
            }

            let is_agent = block.kind() == crate::block::BlockKind::Agent
                || node.node_type.starts_with("agent.");
            if is_agent {
                self.validate_agent_tools(node, registry)?;
            }
        }

        Ok(order)
    }

    fn validate_agent_tools(
        &self,
        node: &Node,
        registry: &BlockRegistry,
    ) -> Result<(), GraphError> {
        let tools = match node.settings.get("tools").and_then(Value::as_array) {
            Some(tools) => tools,
            None => return Ok(()),
        };

        let mut seen = std::collections::HashSet::new();
        for tool in tools {
            let name = tool.get("name").and_then(Value::as_str).ok_or_else(|| {
                GraphError::InvalidAgentTools {
                    node_id: node.id.clone(),
                    message: "tool missing valid 'name'".to_string(),
                }
            })?;
            if !seen.insert(name.to_string()) {
                return Err(GraphError::InvalidAgentTools {
                    node_id: node.id.clone(),
                    message: format!("duplicate tool name '{name}'"),
                });
            }
            let tool_type = tool.get("type").and_then(Value::as_str).ok_or_else(|| {
                GraphError::InvalidAgentTools {
                    node_id: node.id.clone(),
                    message: format!("tool '{name}' missing valid 'type'"),
                }
            })?;
            if !registry.is_tool_compatible(tool_type) {
                return Err(GraphError::InvalidAgentTools {
                    node_id: node.id.clone(),
                    message: format!("tool '{name}' type '{tool_type}' is not tool-compatible"),
                });
            }
            let settings = tool.get("settings").cloned().unwrap_or_else(empty_object);
            if let Err(message) = registry.validate_settings(tool_type, &settings) {
                return Err(GraphError::InvalidAgentTools {
                    node_id: node.id.clone(),
                    message: format!("tool '{name}' settings invalid: {message}"),
                });
            }
        }
        Ok(())
    }

    /// Stable topological order of the control subgraph (Kahn's
    /// algorithm, FIFO queue seeded in node insertion order). Tool
    /// edges are ignored entirely.
    pub fn toposort(&self) -> Result<Vec<String>, GraphError> {
        let mut indegree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        let mut children: HashMap<&str, Vec<&str>> =
            self.nodes.iter().map(|n| (n.id.as_str(), Vec::new())).collect();

        for edge in &self.edges {
            if edge.kind == EdgeKind::Tool {
                continue;
            }
            if let Some(list) = children.get_mut(edge.from.as_str()) {
                list.push(edge.to.as_str());
            }
            if let Some(deg) = indegree.get_mut(edge.to.as_str()) {
                *deg += 1;
            }
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .filter(|n| indegree[n.id.as_str()] == 0)
            .map(|n| n.id.as_str())
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for child in &children[id] {
                let deg = indegree.get_mut(child).expect("child indexed above");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(child);
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(GraphError::Cycle);
        }
        Ok(order)
    }

    /// Control-edge parents per node, in edge insertion order.
    pub fn parent_map(&self) -> HashMap<String, Vec<String>> {
        let mut parents: HashMap<String, Vec<String>> = self
            .nodes
            .iter()
            .map(|n| (n.id.clone(), Vec::new()))
            .collect();
        for edge in &self.edges {
            if edge.kind == EdgeKind::Tool {
                continue;
            }
            if let Some(list) = parents.get_mut(&edge.to) {
                list.push(edge.from.clone());
            }
        }
        parents
    }

    /// Tool-edge children per agent node, in edge insertion order.
    pub fn tool_children(&self) -> HashMap<String, Vec<String>> {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &self.edges {
            if edge.kind == EdgeKind::Tool {
                children
                    .entry(edge.from.clone())
                    .or_default()
                    .push(edge.to.clone());
            }
        }
        children
    }
}
