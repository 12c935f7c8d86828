//! Host data contract: contracts and their installments.
//!
//! The host application exports camelCase JSON and mixes in Portuguese field
//! names (`parcels`, `advogadoResponsavel`, status `Pendente`/`Pago`); both
//! spellings deserialize into the same types.
//!
//! A malformed installment is dropped with a warning instead of failing the
//! whole contract, so one bad row never hides the rest of the dataset.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// A client contract owned by the host application. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawContract")]
pub struct Contract {
    pub client_name: String,
    pub client_contact: Option<String>,
    pub is_deleted: bool,
    pub owner_attorney: Option<String>,
    pub service_types: Vec<ServiceType>,
    pub installments: Vec<Installment>,
}

/// Wire shape of [`Contract`] with installments still undecoded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContract {
    client_name: String,
    #[serde(default)]
    client_contact: Option<String>,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default, alias = "advogadoResponsavel")]
    owner_attorney: Option<String>,
    #[serde(default)]
    service_types: Vec<ServiceType>,
    #[serde(default, alias = "parcels")]
    installments: Vec<Value>,
}

impl From<RawContract> for Contract {
    fn from(raw: RawContract) -> Self {
        let installments = raw
            .installments
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match Installment::deserialize(item) {
                Ok(i) => Some(i),
                Err(error) => {
                    warn!(client = %raw.client_name, index, %error, "skipping malformed installment");
                    None
                }
            })
            .collect();
        Self {
            client_name: raw.client_name,
            client_contact: raw.client_contact,
            is_deleted: raw.is_deleted,
            owner_attorney: raw.owner_attorney,
            service_types: raw.service_types,
            installments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceType {
    pub name: String,
}

/// One scheduled payment of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub value: f64,
    #[serde(deserialize_with = "local_date")]
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    #[serde(alias = "Pendente")]
    Pending,
    #[serde(alias = "Pago")]
    Paid,
    /// Anything else the host may use (cancelled, renegotiated, ...).
    #[serde(other)]
    Other,
}

impl Contract {
    /// Service names joined for display, e.g. `"Civil, Labor"`.
    pub fn services_label(&self) -> String {
        self.service_types
            .iter()
            .map(|s| s.name.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or a timestamp without offset.
///
/// Timestamps with an offset are moved to local time before taking the date,
/// so `2024-03-10T02:00:00Z` is March 9 in UTC-3.
fn local_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Local).date_naive());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(at.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_json_with_portuguese_aliases() {
        let raw = r#"{
            "clientName": "Ana Souza",
            "clientContact": null,
            "advogadoResponsavel": "Dr. Lima",
            "serviceTypes": [{"name": "Civil"}, {"name": "Trabalhista"}],
            "parcels": [
                {"value": 1500.0, "dueDate": "2024-03-10T03:00:00.000Z", "status": "Pendente"},
                {"value": 200, "dueDate": "2024-04-10", "status": "Pago"},
                {"value": 10, "dueDate": "2024-05-10", "status": "Cancelado"}
            ]
        }"#;
        let c: Contract = serde_json::from_str(raw).unwrap();
        assert!(!c.is_deleted);
        assert_eq!(c.owner_attorney.as_deref(), Some("Dr. Lima"));
        assert_eq!(c.services_label(), "Civil, Trabalhista");
        assert_eq!(c.installments.len(), 3);
        assert_eq!(c.installments[1].due_date, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
        assert_eq!(c.installments[0].status, InstallmentStatus::Pending);
        assert_eq!(c.installments[1].status, InstallmentStatus::Paid);
        assert_eq!(c.installments[2].status, InstallmentStatus::Other);
    }

    #[test]
    fn contract_serializes_with_iso_dates() {
        let c = Contract {
            client_name: "Ana".into(),
            client_contact: None,
            is_deleted: false,
            owner_attorney: None,
            service_types: Vec::new(),
            installments: vec![Installment {
                value: 10.0,
                due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
                status: InstallmentStatus::Paid,
            }],
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["installments"][0]["dueDate"], "2024-04-10");
        assert_eq!(serde_json::from_value::<Contract>(json).unwrap(), c);
    }

    #[test]
    fn bad_date_is_rejected() {
        let raw = r#"{"value": 1, "dueDate": "10/03/2024", "status": "Pending"}"#;
        assert!(serde_json::from_str::<Installment>(raw).is_err());
    }

    #[test]
    fn timestamps_use_the_local_calendar_day() {
        use chrono::{TimeZone, Utc};

        let raw = r#"{"value": 1, "dueDate": "2024-03-10T02:00:00Z", "status": "Pending"}"#;
        let i: Installment = serde_json::from_str(raw).unwrap();
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 10, 2, 0, 0)
            .unwrap()
            .with_timezone(&Local)
            .date_naive();
        assert_eq!(i.due_date, expected);

        let offset = r#"{"value": 1, "dueDate": "2024-03-09T23:00:00-03:00", "status": "Pending"}"#;
        let j: Installment = serde_json::from_str(offset).unwrap();
        assert_eq!(j.due_date, expected);
    }

    #[test]
    fn malformed_installments_are_skipped() {
        let raw = r#"{
            "clientName": "Carlos",
            "installments": [
                {"value": 300, "dueDate": null, "status": "Pending"},
                {"value": null, "dueDate": "2024-06-01", "status": "Pending"},
                {"value": "abc", "dueDate": "2024-06-01", "status": "Pending"},
                {"value": 700, "dueDate": "2024-06-01", "status": "Pending"}
            ]
        }"#;
        let c: Contract = serde_json::from_str(raw).unwrap();
        assert_eq!(c.client_name, "Carlos");
        assert_eq!(c.installments.len(), 1);
        assert_eq!(c.installments[0].value, 700.0);
    }
}
