//! Financial snapshot assembly.
//!
//! [`ContextBuilder::build`] is a pure function of the contracts and the
//! reference date. The payload is rebuilt for every question and never cached.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::{
    cfg::ContextLimits,
    correction::{LateFeeCorrection, ValueCorrection},
    error::ContextError,
    model::{Contract, InstallmentStatus},
    source::ContractSource,
};

/// Placeholder sent to the model when the host data cannot be read.
pub const DATA_UNAVAILABLE: &str = "DATA_UNAVAILABLE";

/// Phone text used when a contract has no contact.
pub const NO_CONTACT: &str = "No contact";

/// Snapshot sent with each prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextPayload {
    pub summary: FinancialSummary,
    /// Sorted by corrected value, largest first.
    pub top_overdue: Vec<OverdueEntry>,
    pub clients: Vec<ClientSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub active_contracts: usize,
    /// Pending installments not yet due.
    #[serde(serialize_with = "money")]
    pub total_receivable: f64,
    /// Corrected value of pending installments already overdue.
    #[serde(serialize_with = "money")]
    pub total_overdue: f64,
    #[serde(serialize_with = "br_date")]
    pub reference_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueEntry {
    pub client: String,
    #[serde(serialize_with = "money")]
    pub original_value: f64,
    #[serde(serialize_with = "money")]
    pub corrected_value: f64,
    #[serde(serialize_with = "br_date")]
    pub due_date: NaiveDate,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_attorney: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client: String,
    pub services: String,
    pub status: ClientStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientStatus {
    /// At least one pending installment is past due.
    Overdue,
    /// Every installment is paid.
    Settled,
    Active,
}

/// Result of reading the host store and building the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSnapshot {
    Available(ContextPayload),
    /// Degraded mode: the store could not be read.
    Unavailable { reason: String },
}

impl ContextSnapshot {
    /// Text embedded in the prompt: payload JSON or [`DATA_UNAVAILABLE`].
    pub fn render(&self) -> String {
        match self {
            ContextSnapshot::Available(p) => {
                serde_json::to_string(p).unwrap_or_else(|_| DATA_UNAVAILABLE.to_string())
            }
            ContextSnapshot::Unavailable { .. } => DATA_UNAVAILABLE.to_string(),
        }
    }

    pub fn payload(&self) -> Option<&ContextPayload> {
        match self {
            ContextSnapshot::Available(p) => Some(p),
            ContextSnapshot::Unavailable { .. } => None,
        }
    }
}

/// Builds [`ContextPayload`]s with fixed limits and an optional correction.
#[derive(Clone, Default)]
pub struct ContextBuilder {
    limits: ContextLimits,
    correction: Option<Arc<dyn ValueCorrection>>,
}

impl std::fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("limits", &self.limits)
            .field("correction", &self.correction.is_some())
            .finish()
    }
}

impl ContextBuilder {
    pub fn new(limits: ContextLimits) -> Self {
        Self {
            limits,
            correction: None,
        }
    }

    pub fn with_correction(mut self, correction: Arc<dyn ValueCorrection>) -> Self {
        self.correction = Some(correction);
        self
    }

    /// Limits and [`LateFeeCorrection`] from env.
    pub fn from_env() -> Result<Self, ContextError> {
        let builder = Self::new(ContextLimits::from_env()?);
        Ok(match LateFeeCorrection::from_env()? {
            Some(c) => builder.with_correction(Arc::new(c)),
            None => builder,
        })
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    /// Computes the payload for `reference` (the local "today").
    ///
    /// Soft-deleted contracts are ignored. A pending installment is overdue
    /// when its due date is strictly before `reference`.
    pub fn build(&self, contracts: &[Contract], reference: NaiveDate) -> ContextPayload {
        let active: Vec<&Contract> = contracts.iter().filter(|c| !c.is_deleted).collect();

        let mut total_receivable = 0.0;
        let mut total_overdue = 0.0;
        let mut overdue = Vec::new();
        let mut clients = Vec::with_capacity(active.len());

        for contract in &active {
            let mut has_overdue = false;

            for inst in contract
                .installments
                .iter()
                .filter(|i| i.status == InstallmentStatus::Pending)
            {
                if inst.due_date < reference {
                    let corrected = self
                        .correction
                        .as_ref()
                        .map(|c| c.corrected_value(inst.value, inst.due_date, reference))
                        .unwrap_or(inst.value);
                    total_overdue += corrected;
                    has_overdue = true;
                    overdue.push(OverdueEntry {
                        client: contract.client_name.clone(),
                        original_value: inst.value,
                        corrected_value: corrected,
                        due_date: inst.due_date,
                        phone: contact_or_placeholder(contract.client_contact.as_deref()),
                        owner_attorney: contract.owner_attorney.clone(),
                    });
                } else {
                    total_receivable += inst.value;
                }
            }

            clients.push(ClientSummary {
                client: contract.client_name.clone(),
                services: contract.services_label(),
                status: client_status(contract, has_overdue),
            });
        }

        // Stable: ties keep contract/installment order.
        overdue.sort_by(|a, b| b.corrected_value.total_cmp(&a.corrected_value));
        let overdue_count = overdue.len();
        overdue.truncate(self.limits.top_overdue);
        clients.truncate(self.limits.all_clients);

        debug!(
            active = active.len(),
            overdue = overdue_count,
            sent_overdue = overdue.len(),
            sent_clients = clients.len(),
            "context built"
        );

        ContextPayload {
            summary: FinancialSummary {
                active_contracts: active.len(),
                total_receivable,
                total_overdue,
                reference_date: reference,
            },
            top_overdue: overdue,
            clients,
        }
    }

    /// Reads `source` and builds the payload, degrading to
    /// [`ContextSnapshot::Unavailable`] instead of failing.
    pub fn snapshot(&self, source: &dyn ContractSource, reference: NaiveDate) -> ContextSnapshot {
        match source.contracts() {
            Ok(contracts) => ContextSnapshot::Available(self.build(&contracts, reference)),
            Err(err) => {
                warn!(error = %err, "contract data unavailable; sending placeholder context");
                ContextSnapshot::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Local calendar date used as the overdue cut-off.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn contact_or_placeholder(contact: Option<&str>) -> String {
    contact
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_CONTACT)
        .to_string()
}

fn client_status(contract: &Contract, has_overdue: bool) -> ClientStatus {
    if has_overdue {
        ClientStatus::Overdue
    } else if !contract.installments.is_empty()
        && contract
            .installments
            .iter()
            .all(|i| i.status == InstallmentStatus::Paid)
    {
        ClientStatus::Settled
    } else {
        ClientStatus::Active
    }
}

fn money<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{v:.2}"))
}

fn br_date<S: Serializer>(d: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&d.format("%d/%m/%Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Installment, ServiceType};
    use crate::source::InMemorySource;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pending(value: f64, due: NaiveDate) -> Installment {
        Installment {
            value,
            due_date: due,
            status: InstallmentStatus::Pending,
        }
    }

    fn contract(name: &str, installments: Vec<Installment>) -> Contract {
        Contract {
            client_name: name.to_string(),
            client_contact: None,
            is_deleted: false,
            owner_attorney: None,
            service_types: vec![],
            installments,
        }
    }

    fn reference() -> NaiveDate {
        day(2024, 6, 15)
    }

    #[test]
    fn largest_debt_first() {
        let yesterday = reference() - Duration::days(1);
        let contracts = vec![
            contract("Carlos Gadelha", vec![pending(500.0, yesterday)]),
            contract("Ana Souza", vec![pending(1500.0, yesterday)]),
        ];

        let payload = ContextBuilder::default().build(&contracts, reference());

        let names: Vec<_> = payload.top_overdue.iter().map(|e| e.client.as_str()).collect();
        assert_eq!(names, vec!["Ana Souza", "Carlos Gadelha"]);
        assert_eq!(payload.summary.total_overdue, 2000.0);

        let json: serde_json::Value = serde_json::from_str(
            &ContextSnapshot::Available(payload).render(),
        )
        .unwrap();
        assert_eq!(json["summary"]["total_overdue"], "2000.00");
        assert_eq!(json["summary"]["reference_date"], "15/06/2024");
        assert_eq!(json["top_overdue"][0]["original_value"], "1500.00");
        assert_eq!(json["top_overdue"][0]["due_date"], "14/06/2024");
        assert_eq!(json["top_overdue"][0]["phone"], NO_CONTACT);
    }

    #[test]
    fn due_today_is_receivable_not_overdue() {
        let contracts = vec![contract(
            "A",
            vec![
                pending(100.0, reference()),
                pending(40.0, reference() - Duration::days(1)),
                Installment {
                    value: 999.0,
                    due_date: reference() - Duration::days(30),
                    status: InstallmentStatus::Paid,
                },
            ],
        )];
        let p = ContextBuilder::default().build(&contracts, reference());
        assert_eq!(p.summary.total_receivable, 100.0);
        assert_eq!(p.summary.total_overdue, 40.0);
        assert_eq!(p.top_overdue.len(), 1);
        assert_eq!(p.clients[0].status, ClientStatus::Overdue);
    }

    #[test]
    fn deleted_contracts_are_ignored() {
        let mut gone = contract("Gone", vec![pending(10_000.0, day(2020, 1, 1))]);
        gone.is_deleted = true;
        let contracts = vec![gone, contract("Kept", vec![])];
        let p = ContextBuilder::default().build(&contracts, reference());
        assert_eq!(p.summary.active_contracts, 1);
        assert_eq!(p.summary.total_overdue, 0.0);
        assert!(p.top_overdue.is_empty());
        assert_eq!(p.clients.len(), 1);
        assert_eq!(p.clients[0].status, ClientStatus::Active);
    }

    #[test]
    fn overdue_total_matches_every_overdue_installment_and_list_is_top_sorted() {
        // 120 overdue installments with distinct values spread across 12 clients.
        let contracts: Vec<Contract> = (0..12)
            .map(|c| {
                let insts = (0..10)
                    .map(|i| {
                        let v = ((c * 37 + i * 11) % 120) as f64 * 10.0 + 1.0;
                        pending(v, reference() - Duration::days(1 + i as i64))
                    })
                    .chain(std::iter::once(pending(5.0, reference() + Duration::days(3))))
                    .collect();
                contract(&format!("client-{c}"), insts)
            })
            .collect();

        let p = ContextBuilder::default().build(&contracts, reference());

        let expected: f64 = contracts
            .iter()
            .flat_map(|c| &c.installments)
            .filter(|i| i.status == InstallmentStatus::Pending && i.due_date < reference())
            .map(|i| i.value)
            .sum();
        assert!((p.summary.total_overdue - expected).abs() < 1e-6);
        assert!((p.summary.total_receivable - 60.0).abs() < 1e-9);

        assert_eq!(p.top_overdue.len(), 50);
        assert!(
            p.top_overdue
                .windows(2)
                .all(|w| w[0].corrected_value >= w[1].corrected_value)
        );

        let mut all: Vec<f64> = contracts
            .iter()
            .flat_map(|c| &c.installments)
            .filter(|i| i.due_date < reference())
            .map(|i| i.value)
            .collect();
        all.sort_by(|a, b| b.total_cmp(a));
        let kept: Vec<f64> = p.top_overdue.iter().map(|e| e.corrected_value).collect();
        assert_eq!(kept, all[..50].to_vec());
    }

    #[test]
    fn client_list_is_bounded() {
        let contracts: Vec<Contract> = (0..130).map(|i| contract(&format!("c{i}"), vec![])).collect();
        let p = ContextBuilder::default().build(&contracts, reference());
        assert_eq!(p.summary.active_contracts, 130);
        assert_eq!(p.clients.len(), 100);
        assert_eq!(p.clients[99].client, "c99");
    }

    #[test]
    fn correction_drives_totals_and_order() {
        struct DoubleOld;
        impl ValueCorrection for DoubleOld {
            fn corrected_value(&self, v: f64, due: NaiveDate, r: NaiveDate) -> f64 {
                if (r - due).num_days() > 100 { v * 2.0 } else { v }
            }
        }

        let mut a = contract("Recent", vec![pending(300.0, reference() - Duration::days(2))]);
        a.client_contact = Some("(85) 99999-0000".into());
        let b = contract("Old", vec![pending(200.0, reference() - Duration::days(200))]);

        let p = ContextBuilder::default()
            .with_correction(Arc::new(DoubleOld))
            .build(&[a, b], reference());

        assert_eq!(p.top_overdue[0].client, "Old");
        assert_eq!(p.top_overdue[0].original_value, 200.0);
        assert_eq!(p.top_overdue[0].corrected_value, 400.0);
        assert_eq!(p.top_overdue[1].phone, "(85) 99999-0000");
        assert_eq!(p.summary.total_overdue, 700.0);
    }

    #[test]
    fn settled_and_services() {
        let mut c = contract(
            "Paid Up",
            vec![Installment {
                value: 10.0,
                due_date: day(2024, 1, 1),
                status: InstallmentStatus::Paid,
            }],
        );
        c.service_types = vec![
            ServiceType { name: "Civil".into() },
            ServiceType { name: "Family".into() },
        ];
        let p = ContextBuilder::default().build(&[c], reference());
        assert_eq!(p.clients[0].status, ClientStatus::Settled);
        assert_eq!(p.clients[0].services, "Civil, Family");
    }

    #[test]
    fn unavailable_source_degrades_to_placeholder() {
        struct Broken;
        impl ContractSource for Broken {
            fn contracts(&self) -> Result<Vec<Contract>, ContextError> {
                Err(ContextError::Unavailable("host offline".into()))
            }
        }

        let snap = ContextBuilder::default().snapshot(&Broken, reference());
        assert!(snap.payload().is_none());
        assert_eq!(snap.render(), DATA_UNAVAILABLE);

        let ok = ContextBuilder::default().snapshot(&InMemorySource::default(), reference());
        assert_eq!(ok.payload().map(|p| p.summary.active_contracts), Some(0));
    }
}
