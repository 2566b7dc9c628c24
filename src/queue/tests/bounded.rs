//! Tests for the bounded FIFO queue primitive and backpressure policy

#[cfg(test)]
mod tests {
    use crate::queue::api::{BoundedQueue, QueueError, Task};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = BoundedQueue::new(Some(16));
        for i in 0..10 {
            queue
                .offer(Task::new(format!("task-{i}")), false, Duration::ZERO)
                .await
                .unwrap();
        }

        for i in 0..10 {
            let task = queue.poll(Some(Duration::from_millis(10))).await.unwrap();
            assert_eq!(task.unwrap().payload, format!("task-{i}"));
        }
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test]
    async fn size_never_exceeds_capacity() {
        let queue = BoundedQueue::new(Some(3));
        for i in 0..3 {
            queue
                .offer(Task::new(format!("{i}")), false, Duration::ZERO)
                .await
                .unwrap();
            assert!(queue.size() <= 3);
        }
        assert!(queue
            .offer(Task::new("overflow"), false, Duration::ZERO)
            .await
            .is_err());
        assert_eq!(queue.size(), 3);
    }

    #[tokio::test]
    async fn full_queue_rejects_immediately_when_not_blocking() {
        let queue = BoundedQueue::new(Some(1));
        queue
            .offer(Task::new("first"), false, Duration::ZERO)
            .await
            .unwrap();

        match queue
            .offer(Task::new("second"), false, Duration::from_secs(5))
            .await
        {
            Err(QueueError::QueueFull { capacity }) => assert_eq!(capacity, 1),
            other => panic!("expected QueueFull, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocking_offer_times_out_when_no_slot_opens() {
        let queue = BoundedQueue::new(Some(1));
        queue
            .offer(Task::new("first"), true, Duration::from_millis(100))
            .await
            .unwrap();

        let start = std::time::Instant::now();
        match queue
            .offer(Task::new("second"), true, Duration::from_millis(100))
            .await
        {
            Err(QueueError::QueueFullTimeout { capacity, waited_ms }) => {
                assert_eq!(capacity, 1);
                assert_eq!(waited_ms, 100);
            }
            other => panic!("expected QueueFullTimeout, got: {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn blocking_offer_succeeds_when_poll_frees_a_slot() {
        let queue = Arc::new(BoundedQueue::new(Some(1)));
        queue
            .offer(Task::new("first"), false, Duration::ZERO)
            .await
            .unwrap();

        let offering = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .offer(Task::new("second"), true, Duration::from_secs(2))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        let freed = queue.poll(Some(Duration::from_millis(10))).await.unwrap();
        assert_eq!(freed.unwrap().payload, "first");

        offering.await.unwrap().unwrap();
        let second = queue.poll(Some(Duration::from_millis(10))).await.unwrap();
        assert_eq!(second.unwrap().payload, "second");
    }

    #[tokio::test]
    async fn poll_returns_none_on_timeout() {
        let queue = BoundedQueue::new(Some(4));
        let start = std::time::Instant::now();
        let polled = queue.poll(Some(Duration::from_millis(50))).await.unwrap();
        assert!(polled.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn poll_wakes_up_for_a_late_offer() {
        let queue = Arc::new(BoundedQueue::new(Some(4)));
        let polling = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.poll(Some(Duration::from_secs(2))).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        queue
            .offer(Task::new("late"), false, Duration::ZERO)
            .await
            .unwrap();

        let polled = polling.await.unwrap().unwrap();
        assert_eq!(polled.unwrap().payload, "late");
    }

    #[tokio::test]
    async fn drain_all_purges_and_reports_count() {
        let queue = BoundedQueue::new(Some(8));
        for i in 0..5 {
            queue
                .offer(Task::new(format!("{i}")), false, Duration::ZERO)
                .await
                .unwrap();
        }

        assert_eq!(queue.drain_all().unwrap(), 5);
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.drain_all().unwrap(), 0);
    }

    #[tokio::test]
    async fn drain_all_unblocks_a_waiting_offer() {
        let queue = Arc::new(BoundedQueue::new(Some(1)));
        queue
            .offer(Task::new("first"), false, Duration::ZERO)
            .await
            .unwrap();

        let offering = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .offer(Task::new("second"), true, Duration::from_secs(2))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        queue.drain_all().unwrap();

        offering.await.unwrap().unwrap();
        assert_eq!(queue.size(), 1);
    }

    #[tokio::test]
    async fn peek_range_browses_without_removing() {
        let queue = BoundedQueue::new(Some(8));
        for i in 0..4 {
            queue
                .offer(Task::new(format!("task-{i}")), false, Duration::ZERO)
                .await
                .unwrap();
        }

        let snapshots = queue.peek_range(1, 3, true).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].payload.as_deref(), Some("task-1"));
        assert_eq!(snapshots[1].payload.as_deref(), Some("task-2"));
        assert_eq!(queue.size(), 4);

        // past-the-end indices clamp, inverted ranges are empty
        assert_eq!(queue.peek_range(2, 100, false).unwrap().len(), 2);
        assert!(queue.peek_range(3, 1, true).unwrap().is_empty());
    }

    #[test]
    fn zero_or_absent_capacity_means_unbounded() {
        assert_eq!(BoundedQueue::new(None).capacity(), None);
        assert_eq!(BoundedQueue::new(Some(0)).capacity(), None);
        assert_eq!(BoundedQueue::new(Some(7)).capacity(), Some(7));
    }
}
