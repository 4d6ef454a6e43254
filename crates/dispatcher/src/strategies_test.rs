#[cfg(test)]
mod strategies_tests {
    use crate::strategies::*;
    use crate::test_utils::create_test_slaves;
    use conveyor_domain::TaskKey;
    use conveyor_errors::SchedulerError;

    #[test]
    fn test_round_robin_strategy() {
        let strategy = RoundRobinStrategy::new();
        let slaves = create_test_slaves(3);

        let mut last_used = None;
        let mut picks = Vec::new();
        for _ in 0..4 {
            let index = strategy.select(&slaves, last_used).unwrap();
            picks.push(index);
            last_used = Some(index);
        }

        assert_eq!(picks, vec![0, 1, 2, 0]);
        assert_eq!(strategy.name(), "RoundRobin");
    }

    #[test]
    fn test_round_robin_never_repeats_back_to_back() {
        let strategy = RoundRobinStrategy::new();
        let slaves = create_test_slaves(2);

        let mut last_used = None;
        for _ in 0..10 {
            let index = strategy.select(&slaves, last_used).unwrap();
            assert_ne!(Some(index), last_used);
            last_used = Some(index);
        }
    }

    #[test]
    fn test_round_robin_cursor_beyond_shrunk_registry() {
        let strategy = RoundRobinStrategy::new();
        let slaves = create_test_slaves(2);

        // cursor left over from a larger registry wraps instead of panicking
        assert_eq!(strategy.select(&slaves, Some(4)).unwrap(), 1);
    }

    #[test]
    fn test_round_robin_no_slaves() {
        let strategy = RoundRobinStrategy::new();
        assert!(matches!(
            strategy.select(&[], None),
            Err(SchedulerError::NoExecutorsAvailable)
        ));
    }

    #[test]
    fn test_unlimited_capacity_ignores_load() {
        let strategy = RoundRobinStrategy::with_capacity(None);
        let mut slaves = create_test_slaves(2);
        slaves[1].current_execute_tasks = (0..50).map(TaskKey).collect();

        assert_eq!(strategy.select(&slaves, Some(0)).unwrap(), 1);
    }

    #[test]
    fn test_capacity_skips_full_slaves() {
        let strategy = RoundRobinStrategy::with_capacity(Some(1));
        let mut slaves = create_test_slaves(3);
        slaves[1].current_execute_tasks.push(TaskKey(0));

        assert_eq!(strategy.select(&slaves, Some(0)).unwrap(), 2);
    }

    #[test]
    fn test_capacity_all_full() {
        let strategy = RoundRobinStrategy::with_capacity(Some(1));
        let mut slaves = create_test_slaves(2);
        slaves[0].current_execute_tasks.push(TaskKey(0));
        slaves[1].current_execute_tasks.push(TaskKey(1));

        assert!(matches!(
            strategy.select(&slaves, None),
            Err(SchedulerError::SlavesAtCapacity { limit: 1 })
        ));
    }
}
