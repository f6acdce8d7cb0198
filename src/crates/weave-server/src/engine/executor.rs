//! The run executor.
//!
//! Executes a run's graph sequentially in stable topological order:
//! per node, commit a running NodeRun, invoke the block with its input
//! envelope, commit the terminal NodeRun state, then move on. Blocks
//! fail-stop: the first failing node fails the run with the outputs
//! buffered so far, and later nodes are never attempted. Tool nodes
//! are skipped in the main pass — agents invoke them.

use serde_json::{json, Map, Value};
use tracing::error;

use weave_core::{BlockError, BlockInput, Graph, Node, RunContext, ToolSpec};

use crate::db::models::Run;
use crate::db::repositories::{NodeRunRepository, RunRepository};
use crate::engine::context::build_run_context;
use crate::engine::EngineError;
use crate::state::AppState;

/// Execute a run to a terminal state. Infrastructure failures mark the
/// run failed best-effort; block failures are handled inside.
pub async fn execute_run(state: AppState, run_id: i64) {
    if let Err(e) = execute_run_inner(&state, run_id).await {
        error!(run_id, error = %e, "run execution aborted");
        let _ = RunRepository::mark_finished(&state.pool, run_id, "failed", None).await;
    }
}

async fn execute_run_inner(state: &AppState, run_id: i64) -> Result<(), EngineError> {
    let Some(run) = RunRepository::get_by_id(&state.pool, run_id).await? else {
        return Ok(());
    };
    let workflow = crate::db::repositories::WorkflowRepository::get_by_id(
        &state.pool,
        run.workflow_id,
    )
    .await?
    .ok_or_else(|| EngineError::NotFound(format!("workflow {}", run.workflow_id)))?;

    RunRepository::mark_running(&state.pool, run_id).await?;

    // Snapshot semantics: the graph value loaded here is what executes.
    let graph: Graph = serde_json::from_str(&workflow.graph)?;
    let order = graph.toposort()?;
    let parents = graph.parent_map();
    let tool_children = graph.tool_children();
    let trigger = run.trigger_payload_value();

    let ctx = build_run_context(state, &run)?;
    let mut outputs: Map<String, Value> = Map::new();

    for node_id in order {
        let node = graph
            .node(&node_id)
            .ok_or_else(|| EngineError::Internal(format!("node {node_id} vanished from graph")))?;

        if node.node_type.starts_with("tool.") {
            ctx.log(
                &format!(
                    "Skipping tool node {} in main execution (invoked via agent tools)",
                    node.id
                ),
                None,
                Some(&node.id),
            )
            .await;
            continue;
        }

        ctx.log(&format!("Starting node {}", node.id), None, Some(&node.id))
            .await;

        let input = build_node_input(&graph, node, &parents, &tool_children, &outputs, &trigger, &run);
        let input_json = serde_json::to_string(&input)?;

        NodeRunRepository::insert_running(&state.pool, run_id, &node.id, &node.node_type).await?;

        match run_node(state, &ctx, node, &input).await {
            Ok(output) => {
                NodeRunRepository::mark_succeeded(
                    &state.pool,
                    run_id,
                    &node.id,
                    &input_json,
                    &output.to_string(),
                )
                .await?;
                ctx.log(&format!("Finished node {}", node.id), None, Some(&node.id))
                    .await;
                outputs.insert(node.id.clone(), output);
            }
            Err(err) => {
                NodeRunRepository::mark_failed(
                    &state.pool,
                    run_id,
                    &node.id,
                    &input_json,
                    &json!({"kind": err.kind(), "message": err.to_string()}).to_string(),
                )
                .await?;
                ctx.error(
                    &format!("Node {} failed: {err}", node.id),
                    Some(json!({"error": err.to_string()})),
                    Some(&node.id),
                )
                .await;
                // Fail-stop: partial outputs, no further nodes.
                RunRepository::mark_finished(
                    &state.pool,
                    run_id,
                    "failed",
                    Some(&Value::Object(outputs).to_string()),
                )
                .await?;
                return Ok(());
            }
        }
    }

    RunRepository::mark_finished(
        &state.pool,
        run_id,
        "succeeded",
        Some(&Value::Object(outputs).to_string()),
    )
    .await?;
    Ok(())
}

fn build_node_input(
    graph: &Graph,
    node: &Node,
    parents: &std::collections::HashMap<String, Vec<String>>,
    tool_children: &std::collections::HashMap<String, Vec<String>>,
    outputs: &Map<String, Value>,
    trigger: &Value,
    run: &Run,
) -> BlockInput {
    let mut upstream = Map::new();
    if let Some(parent_ids) = parents.get(&node.id) {
        for parent_id in parent_ids {
            if let Some(output) = outputs.get(parent_id) {
                upstream.insert(parent_id.clone(), output.clone());
            }
        }
    }

    let mut input = BlockInput {
        settings: node.settings.clone(),
        upstream,
        trigger: trigger.clone(),
        node_id: node.id.clone(),
        user_id: run.user_id.clone(),
        derived_tools: Vec::new(),
    };

    if is_agent(node) {
        if let Some(children) = tool_children.get(&node.id) {
            for child_id in children {
                let Some(child) = graph.node(child_id) else {
                    continue;
                };
                let name = child
                    .settings
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(&child.id)
                    .to_string();
                input.derived_tools.push(ToolSpec {
                    id: child.id.clone(),
                    name,
                    tool_type: child.node_type.clone(),
                    settings: child.settings.clone(),
                });
            }
        }
    }

    input
}

fn is_agent(node: &Node) -> bool {
    node.node_type.starts_with("agent.")
}

/// Invoke the block, honoring a declared `timeout_seconds` with an
/// external deadline.
async fn run_node(
    state: &AppState,
    ctx: &RunContext,
    node: &Node,
    input: &BlockInput,
) -> Result<Value, BlockError> {
    let registry = state.registry.clone();
    let fut = registry.run(&node.node_type, input, ctx);

    match node
        .settings
        .get("timeout_seconds")
        .and_then(Value::as_f64)
        .filter(|secs| *secs > 0.0)
    {
        Some(secs) => tokio::time::timeout(std::time::Duration::from_secs_f64(secs), fut)
            .await
            .map_err(|_| {
                BlockError::Timeout(format!("node {} exceeded {secs} seconds", node.id))
            })?,
        None => fut.await,
    }
}
