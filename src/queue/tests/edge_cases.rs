//! Edge cases: sentinels, empty sets, zero-capacity hints and handle misuse

#[cfg(test)]
mod tests {
    use crate::queue::api::{
        BoundedQueue, DefaultQueueFactory, EndpointConfig, Processor, QueueEndpoint,
        QueueFactory, QueueRegistry, QueueResult, Task,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct Noop;

    #[async_trait]
    impl Processor for Noop {
        async fn process(&self, _task: Task) -> QueueResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unbounded_queue_accepts_many_offers_without_blocking() {
        let queue = BoundedQueue::new(None);
        for i in 0..10_000 {
            queue
                .offer(Task::new(format!("{i}")), false, Duration::ZERO)
                .await
                .unwrap();
        }
        assert_eq!(queue.size(), 10_000);
    }

    #[test]
    fn default_factory_honours_the_capacity_hint() {
        let factory = DefaultQueueFactory;
        assert_eq!(factory.create(Some(12)).capacity(), Some(12));
        assert_eq!(factory.create(None).capacity(), None);
    }

    #[test]
    fn custom_factories_control_the_physical_queue() {
        struct Doubling;

        impl QueueFactory for Doubling {
            fn create(&self, capacity: Option<usize>) -> BoundedQueue {
                BoundedQueue::new(capacity.map(|n| n * 2))
            }
        }

        let endpoint = QueueEndpoint::with_factory(
            "doubled",
            EndpointConfig {
                size: Some(4),
                ..EndpointConfig::default()
            },
            None,
            Arc::new(Doubling),
        );
        let queue = endpoint.get_queue().unwrap();
        assert_eq!(queue.capacity(), Some(8));
    }

    #[test]
    fn peek_on_an_empty_queue_is_empty() {
        let queue = BoundedQueue::new(Some(4));
        assert!(queue.peek_range(0, 10, true).unwrap().is_empty());
        assert!(queue.pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wait_reply_on_a_slotless_task_is_an_error() {
        let task = Task::new("no-slot");
        assert!(task.wait_reply(Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn consumer_count_zero_keeps_multicast_dispatcher_absent() {
        let endpoint = QueueEndpoint::new(
            "no-dispatch",
            EndpointConfig {
                multiple_consumers: true,
                poll_timeout_ms: 20,
                ..EndpointConfig::default()
            },
        );
        let consumer = endpoint.create_consumer(Arc::new(Noop)).unwrap();
        consumer.start().unwrap();
        consumer.stop().await;

        // the dispatcher was torn down with the last consumer; a send now
        // just parks in the queue
        let producer = endpoint.create_producer().unwrap();
        producer.send(Task::new("parked")).await.unwrap();
        assert_eq!(endpoint.current_queue_size(), 1);
    }

    #[test]
    fn registry_keys_collapse_equivalent_addresses() {
        let registry = QueueRegistry::new();
        let factory = DefaultQueueFactory;
        let via_address = registry
            .get_or_create(
                &QueueRegistry::queue_key("sedaq://jobs?blockWhenFull=true"),
                None,
                false,
                &factory,
            )
            .unwrap();
        let via_name = registry
            .get_or_create(&QueueRegistry::queue_key("jobs"), None, false, &factory)
            .unwrap();
        assert!(Arc::ptr_eq(&via_address.queue, &via_name.queue));
    }

    #[tokio::test]
    async fn concurrent_consumers_config_of_zero_still_spawns_one_loop() {
        let endpoint = QueueEndpoint::new(
            "min-loops",
            EndpointConfig {
                concurrent_consumers: 0,
                poll_timeout_ms: 20,
                ..EndpointConfig::default()
            },
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        struct Forward(tokio::sync::mpsc::UnboundedSender<String>);

        #[async_trait]
        impl Processor for Forward {
            async fn process(&self, task: Task) -> QueueResult<Option<String>> {
                let _ = self.0.send(task.payload.clone());
                Ok(None)
            }
        }

        let consumer = endpoint.create_consumer(Arc::new(Forward(tx))).unwrap();
        consumer.start().unwrap();

        let producer = endpoint.create_producer().unwrap();
        producer.send(Task::new("still-works")).await.unwrap();
        let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no delivery with clamped loop count")
            .unwrap();
        assert_eq!(payload, "still-works");

        consumer.stop().await;
    }
}
