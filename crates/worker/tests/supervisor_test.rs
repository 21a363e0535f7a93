use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pickup_core::config::AppConfig;
use pickup_core::PickupResult;
use pickup_dispatcher::provision;
use pickup_domain::entities::PickupStatus;
use pickup_domain::events::LifecycleEventKind;
use pickup_domain::messaging::{EventBus, Topology};
use pickup_domain::notification::EmailTransport;
use pickup_infrastructure::InMemoryEventBus;
use pickup_testing_utils::{
    business_fixture, collector_fixture, seeded_store, test_config, wait_until,
    PickupRequestBuilder, RecordingEmailTransport,
};
use pickup_worker::{
    EventSubscriber, LifecycleEventHandler, ListenerSupervisor, NotificationDispatcher,
    ShutdownManager,
};

struct Setup {
    config: AppConfig,
    topology: Topology,
    bus: Arc<InMemoryEventBus>,
    handler: Arc<LifecycleEventHandler>,
}

async fn setup(transport: Arc<dyn EmailTransport>) -> Setup {
    let config = test_config();
    let topology = Topology::from_config(&config.message_queue);
    let bus = Arc::new(InMemoryEventBus::new());
    provision(bus.as_ref(), &topology).await.unwrap();

    let notifier = Arc::new(NotificationDispatcher::new(transport));
    let handler = Arc::new(LifecycleEventHandler::new(
        Arc::new(seeded_store()),
        notifier,
        config.notification.signature.clone(),
    ));
    Setup {
        config,
        topology,
        bus,
        handler,
    }
}

fn supervisor_for(setup: &Setup, shutdown: ShutdownManager) -> ListenerSupervisor {
    ListenerSupervisor::new(
        setup.bus.clone(),
        setup.handler.clone(),
        setup.topology.clone(),
        Duration::from_millis(setup.config.listener.receive_retry_delay_ms),
        shutdown,
    )
}

/// 发送很慢的邮件通道，用来观察关闭时正在处理的消息
#[derive(Default)]
struct SlowTransport {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl EmailTransport for SlowTransport {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> PickupResult<()> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        self.sent.lock().await.push(to.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_start_runs_one_task_per_subscription_and_drains() {
    let setup = setup(Arc::new(RecordingEmailTransport::new())).await;
    let shutdown = ShutdownManager::new();
    let supervisor = supervisor_for(&setup, shutdown.clone());

    supervisor.start().await.unwrap();
    assert_eq!(supervisor.running_count().await, 7);
    assert!(supervisor.start().await.is_err());

    supervisor.shutdown(Duration::from_secs(2)).await.unwrap();
    assert_eq!(supervisor.running_count().await, 0);
    assert!(shutdown.is_shutdown().await);
}

#[tokio::test]
async fn test_delivery_event_reaches_both_parties_and_is_acked() {
    let transport = RecordingEmailTransport::new();
    let setup = setup(Arc::new(transport.clone())).await;
    let supervisor = supervisor_for(&setup, ShutdownManager::new());
    supervisor.start().await.unwrap();

    let request = PickupRequestBuilder::new()
        .with_status(PickupStatus::Completed)
        .with_assignment(9, 4)
        .build();
    setup
        .bus
        .publish("DELIVERY", &request.to_payload().unwrap())
        .await
        .unwrap();

    // DELIVERY 主题上有开始和结束两个订阅，各自发送两封
    let delivered = wait_until(Duration::from_secs(2), || {
        let transport = transport.clone();
        async move { transport.sent().len() == 4 }
    })
    .await;
    assert!(delivered);

    let bus = setup.bus.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            let bus = bus.clone();
            async move {
                bus.is_drained("start-delivery-subscription-id").await
                    && bus.is_drained("end-delivery-subscription-id").await
            }
        })
        .await
    );

    let subjects: Vec<String> = transport
        .sent_to(&business_fixture(1).email)
        .into_iter()
        .map(|email| email.subject)
        .collect();
    assert!(subjects.contains(&"Delivery Started for Pickup Request ID: 1".to_string()));
    assert!(subjects.contains(&"Delivery Completed for Pickup Request ID: 1".to_string()));

    supervisor.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nacked_message_is_redelivered_and_duplicates_first_notice() {
    let transport = RecordingEmailTransport::new();
    let business_email = business_fixture(1).email;
    let collector_email = collector_fixture(2).email;
    transport.fail_for(&business_email);

    let setup = setup(Arc::new(transport.clone())).await;
    let subscription = LifecycleEventKind::RequestAccepted
        .subscription(&setup.config.message_queue.subscriptions)
        .to_string();
    let subscriber = EventSubscriber::new(
        LifecycleEventKind::RequestAccepted,
        subscription.clone(),
        setup.bus.clone(),
        setup.handler.clone(),
        Duration::from_millis(10),
    );
    let shutdown = ShutdownManager::new();
    let task = tokio::spawn(subscriber.run(shutdown.subscribe().await));

    let request = PickupRequestBuilder::new()
        .with_status(PickupStatus::Accepted)
        .build();
    setup
        .bus
        .publish("PICKUP-REQUESTS", &request.to_payload().unwrap())
        .await
        .unwrap();

    let attempted = wait_until(Duration::from_secs(2), || {
        let transport = transport.clone();
        async move { transport.sent_to("collector2@example.com").len() >= 1 }
    })
    .await;
    assert!(attempted);

    transport.recover(&business_email);
    let bus = setup.bus.clone();
    let sub = subscription.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            let bus = bus.clone();
            let sub = sub.clone();
            async move { bus.is_drained(&sub).await }
        })
        .await
    );

    // 商户只在最后一次投递成功时收到一封，收运商在每次投递时都收到
    assert_eq!(transport.sent_to(&business_email).len(), 1);
    assert!(transport.sent_to(&collector_email).len() >= 2);

    shutdown.shutdown().await;
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_shared_topic_delivers_to_every_bound_subscription() {
    let transport = RecordingEmailTransport::new();
    let setup = setup(Arc::new(transport.clone())).await;
    let supervisor = supervisor_for(&setup, ShutdownManager::new());
    supervisor.start().await.unwrap();

    // 载荷中没有事件类型，创建/接受/拒绝三个订阅都会处理同一条消息
    let request = PickupRequestBuilder::new().build();
    setup
        .bus
        .publish("PICKUP-REQUESTS", &request.to_payload().unwrap())
        .await
        .unwrap();

    let collector_email = collector_fixture(2).email;
    assert!(
        wait_until(Duration::from_secs(2), || {
            let transport = transport.clone();
            let email = collector_email.clone();
            async move { transport.sent_to(&email).len() == 3 }
        })
        .await
    );

    let mut subjects: Vec<String> = transport
        .sent_to(&collector_email)
        .into_iter()
        .map(|email| email.subject)
        .collect();
    subjects.sort();
    assert_eq!(
        subjects,
        vec![
            "New Request Received",
            "Pickup Request Accepted",
            "Pickup Request Rejected"
        ]
    );

    supervisor.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_message_finish() {
    let transport = Arc::new(SlowTransport::default());
    let setup = setup(transport.clone()).await;
    let supervisor = supervisor_for(&setup, ShutdownManager::new());
    supervisor.start().await.unwrap();

    let request = PickupRequestBuilder::new()
        .with_status(PickupStatus::Assigned)
        .with_assignment(9, 4)
        .build();
    setup
        .bus
        .publish("ASSIGNMENTS", &request.to_payload().unwrap())
        .await
        .unwrap();

    let bus = setup.bus.clone();
    assert!(
        wait_until(Duration::from_secs(1), || {
            let bus = bus.clone();
            async move { bus.in_flight_count("assign-driver-subscription-id").await == 1 }
        })
        .await
    );

    supervisor.shutdown(Duration::from_secs(3)).await.unwrap();

    assert!(setup.bus.is_drained("assign-driver-subscription-id").await);
    assert!(setup.bus.is_drained("unassign-driver-subscription-id").await);
    assert_eq!(transport.sent.lock().await.len(), 4);
}
