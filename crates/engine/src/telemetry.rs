//! Workflow telemetry: active-instance tracking and per-type metrics.
//!
//! All state is process-local and in-memory; it does not survive a
//! restart. Success/failure accounting happens only at `end_workflow` —
//! `error` logs without touching the counters.

use adflow_types::{WorkflowContext, WorkflowId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

#[derive(Clone, Debug)]
struct ActiveEntry {
    workflow_type: String,
    started_at: DateTime<Utc>,
    started_instant: Instant,
}

/// One in-flight workflow, for stuck-transition detection.
#[derive(Clone, Debug)]
pub struct ActiveWorkflow {
    pub id: WorkflowId,
    pub workflow_type: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Rolling metrics for one workflow type.
#[derive(Clone, Debug, Default)]
pub struct WorkflowMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Incremental mean over all executions
    pub average_duration_ms: f64,
    pub last_execution: Option<DateTime<Utc>>,
}

impl WorkflowMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.failed_executions as f64 / self.total_executions as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkflowTelemetry {
    active: Mutex<HashMap<WorkflowId, ActiveEntry>>,
    metrics: Mutex<HashMap<String, WorkflowMetrics>>,
}

impl WorkflowTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow as in-flight and return its start instant,
    /// to be passed back to [`end_workflow`](Self::end_workflow).
    pub fn start_workflow(&self, id: &WorkflowId, workflow_type: &str) -> Instant {
        let now = Instant::now();
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.clone(),
                ActiveEntry {
                    workflow_type: workflow_type.to_string(),
                    started_at: Utc::now(),
                    started_instant: now,
                },
            );
        tracing::info!(workflow_id = %id, workflow_type, "workflow started");
        now
    }

    /// Close out a workflow: update the type's rolling metrics and drop
    /// it from the active set.
    pub fn end_workflow(&self, id: &WorkflowId, workflow_type: &str, start: Instant, success: bool) {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = metrics.entry(workflow_type.to_string()).or_default();
        entry.total_executions += 1;
        if success {
            entry.successful_executions += 1;
        } else {
            entry.failed_executions += 1;
        }
        entry.average_duration_ms +=
            (elapsed_ms as f64 - entry.average_duration_ms) / entry.total_executions as f64;
        entry.last_execution = Some(Utc::now());

        tracing::info!(
            workflow_id = %id,
            workflow_type,
            elapsed_ms,
            success,
            "workflow finished"
        );
    }

    /// Log a workflow error with the transition context it occurred in.
    /// Accounting is untouched; only `end_workflow` decides success or
    /// failure.
    pub fn error(
        &self,
        id: &WorkflowId,
        workflow_type: &str,
        err: &dyn std::fmt::Display,
        ctx: &WorkflowContext,
    ) {
        tracing::error!(
            workflow_id = %id,
            workflow_type,
            entity_id = %ctx.entity_id,
            entity_type = ?ctx.entity_type,
            tenant_id = %ctx.tenant_id,
            actor_id = %ctx.actor_id,
            error = %err,
            "workflow error"
        );
    }

    pub fn metrics_for(&self, workflow_type: &str) -> Option<WorkflowMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(workflow_type)
            .cloned()
    }

    pub fn active_workflows(&self) -> Vec<ActiveWorkflow> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, entry)| ActiveWorkflow {
                id: id.clone(),
                workflow_type: entry.workflow_type.clone(),
                started_at: entry.started_at,
                elapsed_ms: entry.started_instant.elapsed().as_millis() as u64,
            })
            .collect()
    }
}
