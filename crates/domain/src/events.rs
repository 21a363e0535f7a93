//! 取件请求生命周期事件
//!
//! 七种事件共享三个主题，每种事件对应一个独立订阅。

use std::fmt;

use pickup_core::config::{SubscriptionsConfig, TopicsConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEventKind {
    RequestCreated,
    RequestAccepted,
    RequestRejected,
    AssignmentMade,
    AssignmentCleared,
    DeliveryStarted,
    DeliveryEnded,
}

impl LifecycleEventKind {
    pub const ALL: [LifecycleEventKind; 7] = [
        LifecycleEventKind::RequestCreated,
        LifecycleEventKind::RequestAccepted,
        LifecycleEventKind::RequestRejected,
        LifecycleEventKind::AssignmentMade,
        LifecycleEventKind::AssignmentCleared,
        LifecycleEventKind::DeliveryStarted,
        LifecycleEventKind::DeliveryEnded,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEventKind::RequestCreated => "request_created",
            LifecycleEventKind::RequestAccepted => "request_accepted",
            LifecycleEventKind::RequestRejected => "request_rejected",
            LifecycleEventKind::AssignmentMade => "assignment_made",
            LifecycleEventKind::AssignmentCleared => "assignment_cleared",
            LifecycleEventKind::DeliveryStarted => "delivery_started",
            LifecycleEventKind::DeliveryEnded => "delivery_ended",
        }
    }

    /// 事件发布到的主题
    pub fn topic<'a>(&self, topics: &'a TopicsConfig) -> &'a str {
        match self {
            LifecycleEventKind::RequestCreated
            | LifecycleEventKind::RequestAccepted
            | LifecycleEventKind::RequestRejected => &topics.pickup_requests,
            LifecycleEventKind::AssignmentMade | LifecycleEventKind::AssignmentCleared => {
                &topics.assignments
            }
            LifecycleEventKind::DeliveryStarted | LifecycleEventKind::DeliveryEnded => {
                &topics.delivery
            }
        }
    }

    /// 处理该事件的订阅
    pub fn subscription<'a>(&self, subscriptions: &'a SubscriptionsConfig) -> &'a str {
        match self {
            LifecycleEventKind::RequestCreated => &subscriptions.request_created,
            LifecycleEventKind::RequestAccepted => &subscriptions.request_accepted,
            LifecycleEventKind::RequestRejected => &subscriptions.request_rejected,
            LifecycleEventKind::AssignmentMade => &subscriptions.assignment_made,
            LifecycleEventKind::AssignmentCleared => &subscriptions.assignment_cleared,
            LifecycleEventKind::DeliveryStarted => &subscriptions.delivery_started,
            LifecycleEventKind::DeliveryEnded => &subscriptions.delivery_ended,
        }
    }
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing() {
        let topics = TopicsConfig::default();
        let subscriptions = SubscriptionsConfig::default();

        assert_eq!(
            LifecycleEventKind::RequestRejected.topic(&topics),
            "PICKUP-REQUESTS"
        );
        assert_eq!(
            LifecycleEventKind::AssignmentCleared.topic(&topics),
            "ASSIGNMENTS"
        );
        assert_eq!(LifecycleEventKind::DeliveryEnded.topic(&topics), "DELIVERY");
        assert_eq!(
            LifecycleEventKind::AssignmentMade.subscription(&subscriptions),
            "assign-driver-subscription-id"
        );
        assert_eq!(
            LifecycleEventKind::DeliveryStarted.subscription(&subscriptions),
            "start-delivery-subscription-id"
        );
    }

    #[test]
    fn test_every_kind_has_distinct_subscription() {
        let subscriptions = SubscriptionsConfig::default();
        let mut ids: Vec<&str> = LifecycleEventKind::ALL
            .iter()
            .map(|kind| kind.subscription(&subscriptions))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }
}
