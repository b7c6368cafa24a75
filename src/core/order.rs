//! The order document and its value types
//!
//! An [`Order`] is the unit of mutation: every field listed here is persisted
//! exactly as serialized (camelCase keys, status strings as the shop writes
//! them) and nothing else is stored with it.

use crate::core::error::ValidationError;
use crate::core::timeline::Timeline;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    #[serde(rename = "Pending_Approval")]
    PendingApproval,
    #[serde(rename = "PAYMENT_PENDING")]
    PaymentPending,
    #[serde(rename = "ADVANCE_PAID")]
    AdvancePaid,
    #[serde(rename = "CUTTING_READY")]
    CuttingReady,
    #[serde(rename = "CUTTING_COMPLETED")]
    CuttingCompleted,
    #[serde(rename = "Quality_Check")]
    QualityCheck,
    #[serde(rename = "Alteration_Needed")]
    AlterationNeeded,
    #[serde(rename = "Ready_To_Deliver")]
    ReadyToDeliver,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 11] = [
        OrderStatus::Pending,
        OrderStatus::PendingApproval,
        OrderStatus::PaymentPending,
        OrderStatus::AdvancePaid,
        OrderStatus::CuttingReady,
        OrderStatus::CuttingCompleted,
        OrderStatus::QualityCheck,
        OrderStatus::AlterationNeeded,
        OrderStatus::ReadyToDeliver,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::PendingApproval => "Pending_Approval",
            OrderStatus::PaymentPending => "PAYMENT_PENDING",
            OrderStatus::AdvancePaid => "ADVANCE_PAID",
            OrderStatus::CuttingReady => "CUTTING_READY",
            OrderStatus::CuttingCompleted => "CUTTING_COMPLETED",
            OrderStatus::QualityCheck => "Quality_Check",
            OrderStatus::AlterationNeeded => "Alteration_Needed",
            OrderStatus::ReadyToDeliver => "Ready_To_Deliver",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Terminal statuses have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses where the order waits for a manager's decision
    pub fn awaits_approval(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PendingApproval)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Garment types the shop produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DressType {
    Shirt,
    Pant,
    Suit,
    Kurta,
    Safari,
    Sherwani,
}

impl fmt::Display for DressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DressType::Shirt => "Shirt",
            DressType::Pant => "Pant",
            DressType::Suit => "Suit",
            DressType::Kurta => "Kurta",
            DressType::Safari => "Safari",
            DressType::Sherwani => "Sherwani",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FabricSource {
    Customer,
    Shop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    #[serde(rename = "UPI")]
    Upi,
    Card,
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Upi => "UPI",
            PaymentMode::Card => "Card",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Advance,
    Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub dress_type: DressType,
    pub material: String,
    pub fabric_color: String,
    pub fabric_source: FabricSource,
    /// Fabric consumption in meters
    pub consumption: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Specs {
    /// Named measurements in inches, in the order they were taken
    pub measurements: IndexMap<String, Decimal>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default)]
    pub trial_date: Option<NaiveDate>,
    pub delivery_date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
}

/// One collected payment; never edited after it is appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount: Decimal,
    pub mode: PaymentMode,
    #[serde(rename = "type")]
    pub kind: PaymentType,
    pub collected_by: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financial {
    pub total_price: Decimal,
    pub advance_amount: Decimal,
    pub balance_amount: Decimal,
    pub is_paid: bool,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// The order aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub customer: Customer,
    pub product: Product,
    pub specs: Specs,
    pub workflow: Workflow,
    pub financial: Financial,
    pub timeline: Timeline,
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether a manager has ever priced this order
    ///
    /// Derived from the audit trail so the rate card can never be applied
    /// twice, even to an order explicitly priced at zero.
    pub fn is_priced(&self) -> bool {
        self.timeline.has_approval()
    }
}

/// Input of `CreateOrder`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: Customer,
    pub product: Product,
    #[serde(default)]
    pub specs: Specs,
    pub workflow: Workflow,
}

impl NewOrder {
    /// Check every field, collecting all failures
    ///
    /// `required_measurements` comes from the measurement template of the
    /// garment type; an empty slice accepts any measurement set.
    pub fn validate(&self, required_measurements: &[String]) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.customer.name.trim().is_empty() {
            errors.push("customer.name is required".to_string());
        }
        if self.customer.phone.trim().is_empty() {
            errors.push("customer.phone is required".to_string());
        }
        if self.product.material.trim().is_empty() {
            errors.push("product.material is required".to_string());
        }
        if self.product.consumption <= Decimal::ZERO {
            errors.push("product.consumption must be positive".to_string());
        }

        for name in required_measurements {
            if !self.specs.measurements.contains_key(name) {
                errors.push(format!("specs.measurements.{} is required", name));
            }
        }
        for (name, value) in &self.specs.measurements {
            if *value <= Decimal::ZERO {
                errors.push(format!("specs.measurements.{} must be positive", name));
            }
        }

        if let Some(trial) = self.workflow.trial_date
            && trial > self.workflow.delivery_date
        {
            errors.push("workflow.trialDate must not be after workflow.deliveryDate".to_string());
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(ValidationError::field(
                "order",
                errors.pop().unwrap_or_default(),
            )),
            _ => Err(ValidationError::FieldErrors(errors)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::shirt_order;
    use super::*;

    fn shirt_template() -> Vec<String> {
        ["Collar", "Chest", "Sleeve Length", "Shoulder", "Shirt Length"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_status_serializes_as_persisted_string() {
        let json = serde_json::to_string(&OrderStatus::PaymentPending).unwrap();
        assert_eq!(json, "\"PAYMENT_PENDING\"");

        let parsed: OrderStatus = serde_json::from_str("\"Quality_Check\"").unwrap();
        assert_eq!(parsed, OrderStatus::QualityCheck);

        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Delivered, OrderStatus::Cancelled]);
    }

    #[test]
    fn test_payment_layout() {
        let payment = Payment {
            amount: Decimal::from(2500),
            mode: PaymentMode::Upi,
            kind: PaymentType::Advance,
            collected_by: "cashier-1".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["mode"], "UPI");
        assert_eq!(json["type"], "advance");
        assert_eq!(json["collectedBy"], "cashier-1");
    }

    #[test]
    fn test_valid_order_passes() {
        assert!(shirt_order().validate(&shirt_template()).is_ok());
    }

    #[test]
    fn test_missing_measurement_rejected() {
        let mut order = shirt_order();
        order.specs.measurements.shift_remove("Collar");

        let err = order.validate(&shirt_template()).unwrap_err();
        assert!(err.to_string().contains("specs.measurements.Collar is required"));
    }

    #[test]
    fn test_multiple_failures_collected() {
        let mut order = shirt_order();
        order.customer.name = "  ".to_string();
        order.customer.phone = String::new();
        order.product.consumption = Decimal::ZERO;

        match order.validate(&[]) {
            Err(ValidationError::FieldErrors(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("Expected FieldErrors, got {:?}", other),
        }
    }

    #[test]
    fn test_trial_after_delivery_rejected() {
        let mut order = shirt_order();
        order.workflow.trial_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        assert!(order.validate(&[]).is_err());
    }

    #[test]
    fn test_measurements_keep_insertion_order() {
        let order = shirt_order();
        let json = serde_json::to_string(&order.specs).unwrap();
        let collar = json.find("Collar").unwrap();
        let length = json.find("Shirt Length").unwrap();
        assert!(collar < length);
    }
}
