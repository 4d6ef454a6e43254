use std::collections::BTreeMap;

use conveyor_domain::{Job, Slave, TaskConfig};

pub fn create_test_slave(n: usize) -> Slave {
    Slave::new(
        format!("slave-executor#{n}"),
        format!("10.0.0.{}", n + 10),
        8081,
    )
}

pub fn create_test_slaves(count: usize) -> Vec<Slave> {
    (0..count).map(create_test_slave).collect()
}

pub fn create_test_config(task_id: &str) -> TaskConfig {
    TaskConfig {
        task_id: task_id.to_string(),
        stages: vec!["build".to_string()],
        jobs: BTreeMap::from([(
            "compile".to_string(),
            Job {
                stage: "build".to_string(),
                image: vec!["FROM alpine:3.19".to_string()],
                shell_commands: vec!["echo ok".to_string()],
                reports: BTreeMap::new(),
                timeout: 0,
            },
        )]),
    }
}
