//! 通知文案
//!
//! 每种事件的收件人顺序固定：先收运商后商户。新请求只通知收运商。

use pickup_domain::entities::{Collector, PickupRequest, UNASSIGNED_ID};
use pickup_domain::events::LifecycleEventKind;

/// 通知对象角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Collector,
    Business,
}

impl Audience {
    fn salutation(&self) -> &'static str {
        match self {
            Audience::Collector => "Dear Collector,",
            Audience::Business => "Dear Business,",
        }
    }
}

/// 渲染好的一封通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

pub fn audiences(kind: LifecycleEventKind) -> &'static [Audience] {
    match kind {
        LifecycleEventKind::RequestCreated => &[Audience::Collector],
        _ => &[Audience::Collector, Audience::Business],
    }
}

pub fn render(
    kind: LifecycleEventKind,
    audience: Audience,
    request: &PickupRequest,
    collector: &Collector,
    signature: &str,
) -> Notice {
    let id = request.request_id;
    let summary = format!(
        "Business ID: {}\nWaste Type: {}\nQuantity: {:.2}",
        request.business_id, request.waste_type, request.quantity
    );
    let driver = request.assigned_driver.unwrap_or(UNASSIGNED_ID);
    let vehicle = request.assigned_vehicle.unwrap_or(UNASSIGNED_ID);

    let (subject, message) = match (kind, audience) {
        (LifecycleEventKind::RequestCreated, _) => (
            "New Request Received".to_string(),
            format!("You have a new pickup request (ID: {id}).\n{summary}"),
        ),
        (LifecycleEventKind::RequestAccepted, Audience::Collector) => (
            "Pickup Request Accepted".to_string(),
            format!("You have accepted a pickup request (ID: {id}).\n{summary}"),
        ),
        (LifecycleEventKind::RequestAccepted, Audience::Business) => (
            "Pickup Request Accepted".to_string(),
            format!(
                "Your pickup request (ID: {id}) has been accepted by collector {}.",
                collector.full_name
            ),
        ),
        (LifecycleEventKind::RequestRejected, Audience::Collector) => (
            "Pickup Request Rejected".to_string(),
            format!("You have rejected a pickup request (ID: {id}).\n{summary}"),
        ),
        (LifecycleEventKind::RequestRejected, Audience::Business) => (
            "Pickup Request Rejected".to_string(),
            format!("Your pickup request (ID: {id}) has been rejected by the collector.\n{summary}"),
        ),
        (LifecycleEventKind::AssignmentMade, _) => (
            "Driver Assigned to Pickup Request".to_string(),
            format!("Driver (ID: {driver}) has been assigned to your pickup request (ID: {id})."),
        ),
        (LifecycleEventKind::AssignmentCleared, _) => (
            "Driver Unassigned from Pickup Request".to_string(),
            format!("Driver has been unassigned from your pickup request (ID: {id})."),
        ),
        (LifecycleEventKind::DeliveryStarted, _) => (
            format!("Delivery Started for Pickup Request ID: {id}"),
            format!(
                "Delivery Started for Pickup Request ID: {id}, by the Driver {driver} - with the vehicle {vehicle}"
            ),
        ),
        (LifecycleEventKind::DeliveryEnded, _) => (
            format!("Delivery Completed for Pickup Request ID: {id}"),
            format!(
                "Delivery Completed for Pickup Request ID: {id}, by the Driver {driver} - with the vehicle {vehicle}"
            ),
        ),
    };

    Notice {
        subject,
        body: format!(
            "{}\n\n{}\n\nRegards,\n{}",
            audience.salutation(),
            message,
            signature
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pickup_domain::entities::PickupStatus;

    fn request() -> PickupRequest {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        PickupRequest {
            request_id: 12,
            business_id: 1,
            collector_id: 2,
            waste_type: "plastic".to_string(),
            quantity: 50.0,
            pickup_date: at,
            status: PickupStatus::Pending,
            handling_requirements: String::new(),
            assigned_driver: None,
            assigned_vehicle: None,
            created_at: at,
        }
    }

    fn collector() -> Collector {
        Collector {
            user_id: 2,
            email: "ops@cleancycle.example".to_string(),
            full_name: "Mina Park".to_string(),
            company_name: "Clean Cycle".to_string(),
        }
    }

    #[test]
    fn test_new_request_notice() {
        let notice = render(
            LifecycleEventKind::RequestCreated,
            Audience::Collector,
            &request(),
            &collector(),
            "Xphora AI",
        );
        assert_eq!(notice.subject, "New Request Received");
        assert_eq!(
            notice.body,
            "Dear Collector,\n\nYou have a new pickup request (ID: 12).\nBusiness ID: 1\nWaste Type: plastic\nQuantity: 50.00\n\nRegards,\nXphora AI"
        );
    }

    #[test]
    fn test_accept_notice_names_collector_for_business() {
        let notice = render(
            LifecycleEventKind::RequestAccepted,
            Audience::Business,
            &request(),
            &collector(),
            "Ops",
        );
        assert!(notice.body.starts_with("Dear Business,"));
        assert!(notice.body.contains("accepted by collector Mina Park"));
        assert!(notice.body.ends_with("Regards,\nOps"));
    }

    #[test]
    fn test_delivery_notice_uses_sentinel_when_unassigned() {
        let notice = render(
            LifecycleEventKind::DeliveryStarted,
            Audience::Collector,
            &request(),
            &collector(),
            "Ops",
        );
        assert_eq!(notice.subject, "Delivery Started for Pickup Request ID: 12");
        assert!(notice.body.contains("by the Driver -1 - with the vehicle -1"));
    }

    #[test]
    fn test_audiences() {
        assert_eq!(
            audiences(LifecycleEventKind::RequestCreated),
            &[Audience::Collector]
        );
        for kind in LifecycleEventKind::ALL.iter().skip(1) {
            assert_eq!(
                audiences(*kind),
                &[Audience::Collector, Audience::Business]
            );
        }
    }
}
