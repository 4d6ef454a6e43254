use tracing::debug;

use conveyor_domain::Slave;
use conveyor_errors::{SchedulerError, SchedulerResult};

/// Picks the slave that receives the next task.
///
/// `last_used` is the index chosen by the previous successful selection,
/// `None` before the first one. Implementations must not mutate anything;
/// the caller owns the cursor.
pub trait SlaveSelectionStrategy: Send + Sync {
    fn select(&self, slaves: &[Slave], last_used: Option<usize>) -> SchedulerResult<usize>;

    fn name(&self) -> &str;
}

/// Cyclic selection over the registry order, optionally skipping slaves
/// that already run `capacity` tasks.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinStrategy {
    capacity: Option<usize>,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self { capacity: None }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self { capacity }
    }
}

impl SlaveSelectionStrategy for RoundRobinStrategy {
    fn select(&self, slaves: &[Slave], last_used: Option<usize>) -> SchedulerResult<usize> {
        if slaves.is_empty() {
            debug!("没有可用的Slave节点");
            return Err(SchedulerError::NoExecutorsAvailable);
        }

        let count = slaves.len();
        let start = last_used.map_or(0, |last| (last + 1) % count);

        let Some(limit) = self.capacity else {
            debug!("轮询策略选择Slave: {} (索引: {}/{})", slaves[start].id, start, count);
            return Ok(start);
        };

        (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&index| slaves[index].active_task_count() < limit)
            .map(|index| {
                debug!(
                    "轮询策略选择Slave: {} (索引: {}/{}, 容量: {})",
                    slaves[index].id, index, count, limit
                );
                index
            })
            .ok_or(SchedulerError::SlavesAtCapacity { limit })
    }

    fn name(&self) -> &str {
        "RoundRobin"
    }
}
