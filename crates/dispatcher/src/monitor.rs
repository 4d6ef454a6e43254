//! Master-side registry of slaves and lifecycle tracker of tasks.
//!
//! All state lives in one [`MonitorState`] behind a single lock. Task
//! records are kept in an append-only arena and referenced by [`TaskKey`],
//! so slave churn and moves to history never invalidate a reference.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use conveyor_domain::{
    JobStatus, Slave, SlaveOverview, Task, TaskConfig, TaskKey, TaskStatus,
};
use conveyor_errors::{SchedulerError, SchedulerResult};
use conveyor_infrastructure::RunnerMetrics;

use crate::strategies::SlaveSelectionStrategy;

/// Where a scheduled task was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: String,
    pub slave_index: usize,
    pub slave_id: String,
    /// `host:port` of the chosen slave.
    pub endpoint: String,
}

/// Effect of a status update on the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The update was terminal and the task moved to history.
    Completed,
    /// The task was already in history; nothing changed.
    Ignored,
}

#[derive(Debug, Default)]
pub struct MonitorState {
    slaves: Vec<Slave>,
    tasks: Vec<Task>,
    active: Vec<TaskKey>,
    history: Vec<TaskKey>,
    /// Newest record for every task ID.
    by_id: HashMap<String, TaskKey>,
    last_used: Option<usize>,
}

enum Location {
    Active(TaskKey),
    History(TaskKey),
}

impl MonitorState {
    fn locate(&self, task_id: &str) -> Option<Location> {
        let key = *self.by_id.get(task_id)?;
        if self.active.contains(&key) {
            Some(Location::Active(key))
        } else {
            Some(Location::History(key))
        }
    }

    fn task(&self, key: TaskKey) -> &Task {
        &self.tasks[key.0]
    }

    fn move_to_history(&mut self, key: TaskKey) {
        self.active.retain(|k| *k != key);
        self.history.push(key);

        let slave_id = self.tasks[key.0].assigned_slave_id.clone();
        match self.slaves.iter_mut().find(|slave| slave.id == slave_id) {
            Some(slave) => {
                slave.retire_task(key);
            }
            None => debug!(slave_id = %slave_id, "Slave of finished task is no longer registered"),
        }
    }

    fn overview(&self, slave: &Slave) -> SlaveOverview {
        SlaveOverview {
            id: slave.id.clone(),
            address: slave.address.clone(),
            port: slave.port,
            current_tasks: slave
                .current_execute_tasks
                .iter()
                .map(|key| self.task(*key).clone())
                .collect(),
            history_tasks: slave
                .history_tasks
                .iter()
                .map(|key| self.task(*key).clone())
                .collect(),
        }
    }
}

pub struct Monitor {
    state: Mutex<MonitorState>,
    strategy: Box<dyn SlaveSelectionStrategy>,
    metrics: RunnerMetrics,
}

impl Monitor {
    pub fn new(strategy: Box<dyn SlaveSelectionStrategy>, metrics: RunnerMetrics) -> Self {
        Self {
            state: Mutex::new(MonitorState::default()),
            strategy,
            metrics,
        }
    }

    /// Adds `candidate` unless a slave with the same ID is already known.
    /// Returns whether it was added.
    pub async fn register_or_ignore(&self, candidate: Slave) -> bool {
        let mut state = self.state.lock().await;
        if state.slaves.iter().any(|slave| slave.id == candidate.id) {
            return false;
        }

        info!(
            slave_id = %candidate.id,
            endpoint = %candidate.endpoint(),
            "Registered new slave"
        );
        state.slaves.push(candidate);
        self.metrics.set_active_slaves(state.slaves.len());
        true
    }

    /// Drops every slave whose ID is not in `healthy_ids` and returns the
    /// removed IDs.
    pub async fn reconcile(&self, healthy_ids: &HashSet<String>) -> Vec<String> {
        let mut state = self.state.lock().await;
        let mut removed = Vec::new();
        state.slaves.retain(|slave| {
            let keep = healthy_ids.contains(&slave.id);
            if !keep {
                removed.push(slave.id.clone());
            }
            keep
        });

        for slave_id in &removed {
            warn!(slave_id = %slave_id, "Slave is no longer healthy, removed from registry");
        }
        self.metrics.set_active_slaves(state.slaves.len());
        removed
    }

    /// Picks a slave for `config` and records a QUEUED task for it.
    pub async fn assign(&self, config: &TaskConfig) -> SchedulerResult<Assignment> {
        let mut state = self.state.lock().await;

        if let Some(Location::Active(_)) = state.locate(&config.task_id) {
            return Err(SchedulerError::TaskAlreadyActive {
                id: config.task_id.clone(),
            });
        }

        let index = match self.strategy.select(&state.slaves, state.last_used) {
            Ok(index) => index,
            Err(e) => {
                self.metrics.record_assignment_rejected();
                warn!(task_id = %config.task_id, error = %e, "Task could not be assigned");
                return Err(e);
            }
        };
        state.last_used = Some(index);

        let key = TaskKey(state.tasks.len());
        let slave = &mut state.slaves[index];
        slave.current_execute_tasks.push(key);
        let assignment = Assignment {
            task_id: config.task_id.clone(),
            slave_index: index,
            slave_id: slave.id.clone(),
            endpoint: slave.endpoint(),
        };

        state.tasks.push(Task::queued(
            config.task_id.clone(),
            index,
            assignment.slave_id.clone(),
        ));
        state.active.push(key);
        state.by_id.insert(config.task_id.clone(), key);

        self.metrics.record_task_assigned(&assignment.slave_id);
        info!(
            task_id = %assignment.task_id,
            slave_id = %assignment.slave_id,
            strategy = self.strategy.name(),
            "Task assigned"
        );
        Ok(assignment)
    }

    pub async fn apply_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        stage: &str,
    ) -> SchedulerResult<UpdateOutcome> {
        let mut state = self.state.lock().await;
        let key = match state.locate(task_id) {
            Some(Location::Active(key)) => key,
            Some(Location::History(_)) => {
                debug!(task_id = %task_id, status = %status, "Ignoring late status for finished task");
                return Ok(UpdateOutcome::Ignored);
            }
            None => return Err(SchedulerError::task_not_found(task_id)),
        };

        state.tasks[key.0].apply_status(status, stage);
        self.metrics.record_status_update();
        debug!(task_id = %task_id, status = %status, stage = %stage, "Task status updated");

        if status.is_terminal() {
            state.move_to_history(key);
            self.metrics.record_task_finished();
            info!(task_id = %task_id, status = %status, "Task finished");
            return Ok(UpdateOutcome::Completed);
        }
        Ok(UpdateOutcome::Applied)
    }

    pub async fn apply_job_status(
        &self,
        task_id: &str,
        job_status: JobStatus,
    ) -> SchedulerResult<UpdateOutcome> {
        let mut state = self.state.lock().await;
        match state.locate(task_id) {
            Some(Location::Active(key)) => {
                debug!(
                    task_id = %task_id,
                    job = %job_status.job_name,
                    status = %job_status.status,
                    "Job status updated"
                );
                state.tasks[key.0].upsert_job_status(job_status);
                self.metrics.record_status_update();
                Ok(UpdateOutcome::Applied)
            }
            Some(Location::History(_)) => Ok(UpdateOutcome::Ignored),
            None => Err(SchedulerError::task_not_found(task_id)),
        }
    }

    /// The newest record for `task_id`, active or finished.
    pub async fn lookup(&self, task_id: &str) -> SchedulerResult<Task> {
        let state = self.state.lock().await;
        match state.locate(task_id) {
            Some(Location::Active(key)) | Some(Location::History(key)) => {
                Ok(state.task(key).clone())
            }
            None => Err(SchedulerError::task_not_found(task_id)),
        }
    }

    pub async fn slaves_overview(&self) -> Vec<SlaveOverview> {
        let state = self.state.lock().await;
        state
            .slaves
            .iter()
            .map(|slave| state.overview(slave))
            .collect()
    }

    pub async fn slave_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.slaves.iter().map(|slave| slave.id.clone()).collect()
    }

    pub async fn active_task_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .active
            .iter()
            .map(|key| state.task(*key).id.clone())
            .collect()
    }

    pub async fn history_task_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .history
            .iter()
            .map(|key| state.task(*key).id.clone())
            .collect()
    }
}
