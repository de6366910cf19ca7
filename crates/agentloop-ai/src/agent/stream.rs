use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use agentloop_traits::Values;

use super::AgentAction;

/// Progress of one executor invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    // Lifecycle
    Started {
        execution_id: String,
    },
    IterationBegin {
        iteration: usize,
    },
    // Planning
    ActionPlanned {
        iteration: usize,
        action: AgentAction,
    },
    ParseErrorRecovered {
        iteration: usize,
        error: String,
        observation: String,
    },
    // Tool execution
    ToolStart {
        iteration: usize,
        tool: String,
        input: String,
    },
    ToolEnd {
        iteration: usize,
        tool: String,
        observation: String,
    },
    ToolError {
        iteration: usize,
        tool: String,
        error: String,
    },
    // Completion
    Finished {
        iteration: usize,
        return_values: Values,
    },
}

#[async_trait]
pub trait ExecutionEmitter: Send + Sync {
    async fn emit(&self, event: ExecutionEvent);
}

pub struct NullEmitter;

#[async_trait]
impl ExecutionEmitter for NullEmitter {
    async fn emit(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an mpsc channel; a closed receiver is ignored.
pub struct ChannelEmitter {
    tx: mpsc::Sender<ExecutionEvent>,
}

impl ChannelEmitter {
    pub fn new(tx: mpsc::Sender<ExecutionEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ExecutionEmitter for ChannelEmitter {
    async fn emit(&self, event: ExecutionEvent) {
        let _ = self.tx.send(event).await;
    }
}
