//! Test data builders for creating test entities
//!
//! Builders come with sensible defaults: business 1 orders 50.0 units of
//! plastic from collector 2.

use chrono::{NaiveDate, NaiveDateTime};
use pickup_domain::entities::{Business, Collector, NewPickupRequest, PickupRequest, PickupStatus};

pub fn default_pickup_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .unwrap()
}

pub fn business_fixture(user_id: i64) -> Business {
    Business {
        user_id,
        email: format!("business{user_id}@example.com"),
        full_name: format!("Business Owner {user_id}"),
        business_name: format!("Green Goods {user_id}"),
    }
}

pub fn collector_fixture(user_id: i64) -> Collector {
    Collector {
        user_id,
        email: format!("collector{user_id}@example.com"),
        full_name: format!("Collector Manager {user_id}"),
        company_name: format!("Clean Cycle {user_id}"),
    }
}

/// Builder for `NewPickupRequest`
pub struct NewPickupRequestBuilder {
    request: NewPickupRequest,
}

impl NewPickupRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: NewPickupRequest {
                business_id: 1,
                collector_id: 2,
                waste_type: "plastic".to_string(),
                quantity: 50.0,
                pickup_date: default_pickup_date(),
                handling_requirements: String::new(),
            },
        }
    }

    pub fn with_business(mut self, business_id: i64) -> Self {
        self.request.business_id = business_id;
        self
    }

    pub fn with_collector(mut self, collector_id: i64) -> Self {
        self.request.collector_id = collector_id;
        self
    }

    pub fn with_waste(mut self, waste_type: &str, quantity: f64) -> Self {
        self.request.waste_type = waste_type.to_string();
        self.request.quantity = quantity;
        self
    }

    pub fn with_handling_requirements(mut self, requirements: &str) -> Self {
        self.request.handling_requirements = requirements.to_string();
        self
    }

    pub fn build(self) -> NewPickupRequest {
        self.request
    }
}

impl Default for NewPickupRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for already-persisted `PickupRequest` snapshots
pub struct PickupRequestBuilder {
    request: PickupRequest,
}

impl PickupRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: NewPickupRequestBuilder::new().build().into_pending(1),
        }
    }

    pub fn with_id(mut self, request_id: i64) -> Self {
        self.request.request_id = request_id;
        self
    }

    pub fn with_parties(mut self, business_id: i64, collector_id: i64) -> Self {
        self.request.business_id = business_id;
        self.request.collector_id = collector_id;
        self
    }

    pub fn with_status(mut self, status: PickupStatus) -> Self {
        self.request.status = status;
        self
    }

    pub fn with_assignment(mut self, driver_id: i64, vehicle_id: i64) -> Self {
        self.request.assigned_driver = Some(driver_id);
        self.request.assigned_vehicle = Some(vehicle_id);
        self
    }

    pub fn build(self) -> PickupRequest {
        self.request
    }
}

impl Default for PickupRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
