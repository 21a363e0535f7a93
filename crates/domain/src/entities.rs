use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::EmailRecipient;

/// 未分配司机或车辆时在消息中使用的占位值
pub const UNASSIGNED_ID: i64 = -1;

/// 消息与数据库中统一使用的时间格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 取件请求状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PickupStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Accepted")]
    Accepted,
    #[serde(alias = "Rejected")]
    Rejected,
    #[serde(alias = "Assigned")]
    Assigned,
    #[serde(alias = "Completed")]
    Completed,
}

impl PickupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "pending",
            PickupStatus::Accepted => "accepted",
            PickupStatus::Rejected => "rejected",
            PickupStatus::Assigned => "assigned",
            PickupStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PickupStatus::Rejected | PickupStatus::Completed)
    }
}

impl fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PickupStatus::Pending),
            "accepted" => Ok(PickupStatus::Accepted),
            "rejected" => Ok(PickupStatus::Rejected),
            "assigned" => Ok(PickupStatus::Assigned),
            "completed" => Ok(PickupStatus::Completed),
            _ => Err(format!("无效的取件请求状态: {s}")),
        }
    }
}

/// 取件请求
///
/// 该结构同时是事件消息的载荷，字段名即线上JSON字段名。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickupRequest {
    pub request_id: i64,
    pub business_id: i64,
    pub collector_id: i64,
    pub waste_type: String,
    pub quantity: f64,
    #[serde(with = "datetime_format")]
    pub pickup_date: NaiveDateTime,
    pub status: PickupStatus,
    #[serde(default)]
    pub handling_requirements: String,
    #[serde(with = "sentinel_id", default)]
    pub assigned_driver: Option<i64>,
    #[serde(with = "sentinel_id", default)]
    pub assigned_vehicle: Option<i64>,
    #[serde(with = "datetime_format")]
    pub created_at: NaiveDateTime,
}

impl PickupRequest {
    pub fn is_assigned(&self) -> bool {
        self.assigned_driver.is_some()
    }

    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// 创建取件请求时由调用方提供的字段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPickupRequest {
    pub business_id: i64,
    pub collector_id: i64,
    pub waste_type: String,
    pub quantity: f64,
    #[serde(with = "datetime_format")]
    pub pickup_date: NaiveDateTime,
    #[serde(default)]
    pub handling_requirements: String,
}

impl NewPickupRequest {
    /// 以待处理状态生成持久化前的快照，创建时间精确到秒
    pub fn into_pending(self, request_id: i64) -> PickupRequest {
        PickupRequest {
            request_id,
            business_id: self.business_id,
            collector_id: self.collector_id,
            waste_type: self.waste_type,
            quantity: self.quantity,
            pickup_date: self.pickup_date,
            status: PickupStatus::Pending,
            handling_requirements: self.handling_requirements,
            assigned_driver: None,
            assigned_vehicle: None,
            created_at: now_seconds(),
        }
    }
}

/// 司机与车辆分配
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverAssignment {
    pub driver_id: i64,
    pub vehicle_id: i64,
}

/// 企业用户，取件请求的发起方
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Business {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub business_name: String,
}

/// 回收商用户，取件请求的承接方
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collector {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub company_name: String,
}

impl EmailRecipient for Business {
    fn email(&self) -> &str {
        &self.email
    }

    fn display_name(&self) -> &str {
        &self.business_name
    }
}

impl EmailRecipient for Collector {
    fn email(&self) -> &str {
        &self.email
    }

    fn display_name(&self) -> &str {
        &self.company_name
    }
}

/// 当前UTC时间，去掉秒以下部分，保证写入与读取一致
pub fn now_seconds() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// `YYYY-MM-DD HH:MM:SS` 格式的时间序列化
pub mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::DATETIME_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(de::Error::custom)
    }
}

/// 司机/车辆ID：内部为 `Option<i64>`，线上以 -1 表示未分配
pub mod sentinel_id {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::UNASSIGNED_ID;

    pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.unwrap_or(UNASSIGNED_ID))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<i64>::deserialize(deserializer)?;
        Ok(raw.filter(|id| *id > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_request() -> PickupRequest {
        PickupRequest {
            request_id: 42,
            business_id: 1,
            collector_id: 2,
            waste_type: "plastic".to_string(),
            quantity: 50.0,
            pickup_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            status: PickupStatus::Pending,
            handling_requirements: String::new(),
            assigned_driver: None,
            assigned_vehicle: None,
            created_at: NaiveDate::from_ymd_opt(2024, 4, 30)
                .unwrap()
                .and_hms_opt(12, 0, 5)
                .unwrap(),
        }
    }

    #[test]
    fn test_unassigned_ids_serialize_as_minus_one() {
        let value = serde_json::to_value(sample_request()).unwrap();
        assert_eq!(value["assigned_driver"], -1);
        assert_eq!(value["assigned_vehicle"], -1);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["pickup_date"], "2024-05-01 09:30:00");
        assert_eq!(value["created_at"], "2024-04-30 12:00:05");
    }

    #[test]
    fn test_assigned_ids_survive_payload() {
        let mut request = sample_request();
        request.assigned_driver = Some(9);
        request.assigned_vehicle = Some(4);
        request.status = PickupStatus::Assigned;

        let payload = request.to_payload().unwrap();
        let decoded = PickupRequest::from_payload(&payload).unwrap();
        assert_eq!(decoded, request);
        assert!(decoded.is_assigned());
    }

    #[test]
    fn test_legacy_payload_is_accepted() {
        let payload = br#"{
            "request_id": 7,
            "business_id": 1,
            "collector_id": 2,
            "waste_type": "glass",
            "quantity": 12.5,
            "pickup_date": "2024-05-01 09:30:00",
            "status": "Completed",
            "assigned_driver": 0,
            "created_at": "2024-04-30 12:00:05"
        }"#;
        let decoded = PickupRequest::from_payload(payload).unwrap();
        assert_eq!(decoded.status, PickupStatus::Completed);
        assert_eq!(decoded.assigned_driver, None);
        assert_eq!(decoded.assigned_vehicle, None);
        assert_eq!(decoded.handling_requirements, "");
    }

    #[test]
    fn test_invalid_payload_is_rejected() {
        assert!(PickupRequest::from_payload(b"not json").is_err());

        let bad_date = br#"{
            "request_id": 7, "business_id": 1, "collector_id": 2,
            "waste_type": "glass", "quantity": 1.0,
            "pickup_date": "2024-05-01T09:30:00Z", "status": "pending",
            "created_at": "2024-04-30 12:00:05"
        }"#;
        assert!(PickupRequest::from_payload(bad_date).is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Accepted".parse::<PickupStatus>().unwrap(), PickupStatus::Accepted);
        assert_eq!("assigned".parse::<PickupStatus>().unwrap(), PickupStatus::Assigned);
        assert!("cancelled".parse::<PickupStatus>().is_err());
        assert!(PickupStatus::Completed.is_terminal());
        assert!(!PickupStatus::Accepted.is_terminal());
    }

    #[test]
    fn test_new_request_starts_pending() {
        let new_request = NewPickupRequest {
            business_id: 1,
            collector_id: 2,
            waste_type: "plastic".to_string(),
            quantity: 50.0,
            pickup_date: sample_request().pickup_date,
            handling_requirements: "gloves".to_string(),
        };
        let request = new_request.into_pending(3);
        assert_eq!(request.request_id, 3);
        assert_eq!(request.status, PickupStatus::Pending);
        assert_eq!(request.created_at.nanosecond(), 0);
        assert!(!request.is_assigned());
    }
}
