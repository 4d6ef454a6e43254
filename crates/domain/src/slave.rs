use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKey};

/// A registered worker node as tracked by the master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slave {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub current_execute_tasks: Vec<TaskKey>,
    pub history_tasks: Vec<TaskKey>,
}

impl Slave {
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
            current_execute_tasks: Vec::new(),
            history_tasks: Vec::new(),
        }
    }

    /// `host:port` used to reach the slave's HTTP surface.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn active_task_count(&self) -> usize {
        self.current_execute_tasks.len()
    }

    /// Moves `key` from the current list to history. Returns false if the
    /// key was not current.
    pub fn retire_task(&mut self, key: TaskKey) -> bool {
        match self.current_execute_tasks.iter().position(|k| *k == key) {
            Some(pos) => {
                self.current_execute_tasks.remove(pos);
                self.history_tasks.push(key);
                true
            }
            None => false,
        }
    }
}

/// A slave together with the records of its current and past tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveOverview {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub current_tasks: Vec<Task>,
    pub history_tasks: Vec<Task>,
}
