//! Mock implementations of the store, transport and bus traits
//!
//! All mocks are cheap to clone and share their state between clones, so a
//! test can hand one copy to the code under test and inspect another.

use async_trait::async_trait;
use pickup_core::{PickupError, PickupResult};
use pickup_domain::entities::{
    Business, Collector, DriverAssignment, NewPickupRequest, PickupRequest, PickupStatus,
};
use pickup_domain::messaging::{Delivery, EventBus};
use pickup_domain::notification::EmailTransport;
use pickup_domain::repositories::EntityStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory `EntityStore`
#[derive(Debug, Clone)]
pub struct MockEntityStore {
    businesses: Arc<Mutex<HashMap<i64, Business>>>,
    collectors: Arc<Mutex<HashMap<i64, Collector>>>,
    requests: Arc<Mutex<HashMap<i64, PickupRequest>>>,
    next_id: Arc<Mutex<i64>>,
    fail_writes: Arc<AtomicBool>,
    fail_lookups: Arc<AtomicBool>,
}

impl MockEntityStore {
    pub fn new() -> Self {
        Self {
            businesses: Arc::new(Mutex::new(HashMap::new())),
            collectors: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_lookups: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add_business(&self, business: Business) {
        self.businesses
            .lock()
            .unwrap()
            .insert(business.user_id, business);
    }

    pub fn add_collector(&self, collector: Collector) {
        self.collectors
            .lock()
            .unwrap()
            .insert(collector.user_id, collector);
    }

    /// Stores a request as-is, bypassing id assignment
    pub fn insert_request(&self, request: PickupRequest) {
        let mut next_id = self.next_id.lock().unwrap();
        if request.request_id >= *next_id {
            *next_id = request.request_id + 1;
        }
        self.requests
            .lock()
            .unwrap()
            .insert(request.request_id, request);
    }

    pub fn request(&self, id: i64) -> Option<PickupRequest> {
        self.requests.lock().unwrap().get(&id).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every write fails with a persistence error while set
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Business and collector lookups fail with a database-style error while set
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> PickupResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PickupError::Persistence("injected write failure".to_string()));
        }
        Ok(())
    }

    fn check_lookup(&self) -> PickupResult<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(PickupError::Persistence("injected lookup failure".to_string()));
        }
        Ok(())
    }

    fn update<F>(&self, id: i64, change: F) -> PickupResult<bool>
    where
        F: FnOnce(&mut PickupRequest),
    {
        self.check_writable()?;
        let mut requests = self.requests.lock().unwrap();
        match requests.get_mut(&id) {
            Some(request) => {
                change(request);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for MockEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MockEntityStore {
    async fn get_business_by_id(&self, id: i64) -> PickupResult<Option<Business>> {
        self.check_lookup()?;
        Ok(self.businesses.lock().unwrap().get(&id).cloned())
    }

    async fn get_collector_by_id(&self, id: i64) -> PickupResult<Option<Collector>> {
        self.check_lookup()?;
        Ok(self.collectors.lock().unwrap().get(&id).cloned())
    }

    async fn create_pickup_request(&self, request: &NewPickupRequest) -> PickupResult<i64> {
        self.check_writable()?;
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;

        let created = request.clone().into_pending(id);
        self.requests.lock().unwrap().insert(id, created);
        Ok(id)
    }

    async fn get_pickup_request_by_id(&self, id: i64) -> PickupResult<Option<PickupRequest>> {
        Ok(self.request(id))
    }

    async fn update_pickup_request_status(
        &self,
        id: i64,
        status: PickupStatus,
    ) -> PickupResult<bool> {
        self.update(id, |request| request.status = status)
    }

    async fn assign_driver(&self, id: i64, assignment: DriverAssignment) -> PickupResult<bool> {
        self.update(id, |request| {
            request.assigned_driver = Some(assignment.driver_id);
            request.assigned_vehicle = Some(assignment.vehicle_id);
            request.status = PickupStatus::Assigned;
        })
    }

    async fn clear_assigned_driver(&self, id: i64) -> PickupResult<bool> {
        self.update(id, |request| request.assigned_driver = None)
    }
}

/// A notification that reached its recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// `EmailTransport` that records every successful send
#[derive(Debug, Clone, Default)]
pub struct RecordingEmailTransport {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingEmailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `address` fail until `recover` is called
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn recover(&self, address: &str) {
        self.failing.lock().unwrap().remove(address);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<SentEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|email| email.to == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EmailTransport for RecordingEmailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PickupResult<()> {
        if self.failing.lock().unwrap().contains(to) {
            return Err(PickupError::Notification(format!("mailbox {to} unavailable")));
        }

        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Delegates to an inner bus but can be told to reject publishes
pub struct FailingEventBus {
    inner: Arc<dyn EventBus>,
    fail_publishes: AtomicBool,
}

impl FailingEventBus {
    pub fn new(inner: Arc<dyn EventBus>) -> Self {
        Self {
            inner,
            fail_publishes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventBus for FailingEventBus {
    async fn topic_exists(&self, topic: &str) -> PickupResult<bool> {
        self.inner.topic_exists(topic).await
    }

    async fn create_topic(&self, topic: &str) -> PickupResult<()> {
        self.inner.create_topic(topic).await
    }

    async fn subscription_exists(&self, subscription: &str) -> PickupResult<bool> {
        self.inner.subscription_exists(subscription).await
    }

    async fn create_subscription(&self, subscription: &str, topic: &str) -> PickupResult<()> {
        self.inner.create_subscription(subscription, topic).await
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> PickupResult<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(PickupError::MessageQueue(format!(
                "publish to {topic} rejected by broker"
            )));
        }
        self.inner.publish(topic, payload).await
    }

    async fn receive(&self, subscription: &str) -> PickupResult<Delivery> {
        self.inner.receive(subscription).await
    }

    async fn ack(&self, delivery: &Delivery) -> PickupResult<()> {
        self.inner.ack(delivery).await
    }

    async fn nack(&self, delivery: &Delivery) -> PickupResult<()> {
        self.inner.nack(delivery).await
    }

    async fn close(&self) -> PickupResult<()> {
        self.inner.close().await
    }
}
