//! # Trip Workflow
//!
//! Ticket purchase and assignment administration.
//!
//! ## Purchase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. resolve rider card           (NoCardForAccount / AccountNotFound)   │
//! │  2. check vehicle and route      (VehicleNotFound / RouteNotFound)      │
//! │  3. load eligible staff          (NoEligibleStaff)                      │
//! │  4. fare = FarePolicy::fare_for(card)                                  │
//! │  ───────────────────────── one LedgerUnit ─────────────────────────    │
//! │  5. guarded debit                (CardInactive / InsufficientFare)      │
//! │  6. purchase transaction row                                           │
//! │  7. pick staff uniformly at random                                     │
//! │  8. assignment row linked to the transaction                           │
//! │  9. commit                                                             │
//! │  ──────────────────────────────────────────────────────────────────    │
//! │ 10. audit CREATE on assignments (best effort)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads in steps 1 to 3 happen before the unit opens so the unit's first
//! statement is the guarded debit. If anything in 5 to 9 fails the unit is
//! dropped and neither the debit, the transaction nor the assignment exists.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use transit_core::validation::validate_identifier;
use transit_core::{
    Assignment, AssignmentFilter, AssignmentUpdate, AuditAction, Card, CoreError, FarePolicy,
    Money, NewAssignment, Transaction,
};
use transit_db::Database;

use crate::audit::AuditRecorder;
use crate::card::debit_within;
use crate::collaborators::{AccountDirectory, ReferenceData};
use crate::error::{LedgerError, LedgerResult};
use crate::recorder::TransactionRecorder;
use crate::retry::{with_busy_retry, RetryPolicy};
use crate::selector::Selector;

const RESOURCE: &str = "assignments";

// =============================================================================
// Request / Receipt
// =============================================================================

/// A rider buying a trip on a vehicle along a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub account_id: String,
    pub vehicle_id: String,
    pub route_id: String,
}

/// Everything a completed purchase produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripReceipt {
    /// The card after the fare was debited.
    pub card: Card,
    pub transaction: Transaction,
    pub assignment: Assignment,
    pub fare: Money,
}

// =============================================================================
// Workflow
// =============================================================================

/// Purchases and assignment administration.
#[derive(Clone)]
pub struct TripWorkflow {
    db: Database,
    accounts: Arc<dyn AccountDirectory>,
    reference: Arc<dyn ReferenceData>,
    recorder: TransactionRecorder,
    audit: Arc<AuditRecorder>,
    selector: Arc<Selector>,
    fare: FarePolicy,
    retry: RetryPolicy,
}

impl TripWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        accounts: Arc<dyn AccountDirectory>,
        reference: Arc<dyn ReferenceData>,
        recorder: TransactionRecorder,
        audit: Arc<AuditRecorder>,
        selector: Arc<Selector>,
        fare: FarePolicy,
        retry: RetryPolicy,
    ) -> Self {
        TripWorkflow {
            db,
            accounts,
            reference,
            recorder,
            audit,
            selector,
            fare,
            retry,
        }
    }

    pub fn fare_policy(&self) -> &FarePolicy {
        &self.fare
    }

    /// Buys one trip: debits the fare and creates the linked assignment.
    pub async fn purchase(&self, actor_id: &str, request: &PurchaseRequest) -> LedgerResult<TripReceipt> {
        validate_identifier("account_id", &request.account_id)?;
        validate_identifier("vehicle_id", &request.vehicle_id)?;
        validate_identifier("route_id", &request.route_id)?;

        self.require_account(&request.account_id).await?;
        let card = self
            .db
            .cards()
            .get_by_account(&request.account_id)
            .await?
            .ok_or_else(|| CoreError::NoCardForAccount {
                account_id: request.account_id.clone(),
            })?;
        self.require_vehicle(&request.vehicle_id).await?;
        self.require_route(&request.route_id).await?;

        let staff = self.reference.list_eligible_staff().await?;
        if staff.is_empty() {
            return Err(CoreError::NoEligibleStaff.into());
        }

        let fare = self.fare.fare_for(&card);
        debug!(card_number = %card.card_number, fare = %fare, candidates = staff.len(), "Purchasing trip");

        let receipt = with_busy_retry(self.retry, "purchase", || async {
            let mut unit = self.db.begin_unit().await?;
            let (after, transaction) = debit_within(&mut unit, &self.recorder, &card.card_number, fare)
                .await
                .map_err(|e| keyed_by_account(e, &request.account_id))?;

            let staff_id = self.selector.pick(&staff).ok_or(CoreError::NoEligibleStaff)?;
            let now = Utc::now();
            let assignment = Assignment {
                id: Uuid::new_v4().to_string(),
                account_id: request.account_id.clone(),
                staff_id: staff_id.clone(),
                vehicle_id: request.vehicle_id.clone(),
                route_id: request.route_id.clone(),
                transaction_id: Some(transaction.id),
                created_at: now,
                updated_at: now,
            };
            unit.insert_assignment(&assignment).await?;
            unit.commit().await?;

            Ok::<_, LedgerError>(TripReceipt {
                card: after,
                transaction,
                assignment,
                fare,
            })
        })
        .await?;

        info!(
            card_number = %card.card_number,
            assignment_id = %receipt.assignment.id,
            staff_id = %receipt.assignment.staff_id,
            balance = %receipt.card.balance(),
            "Trip purchased"
        );
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Create,
                format!(
                    "Trip on {} route {} with staff {} for {}; card {} balance {}",
                    receipt.assignment.vehicle_id,
                    receipt.assignment.route_id,
                    receipt.assignment.staff_id,
                    fare,
                    card.card_number,
                    receipt.card.balance()
                ),
            )
            .await;
        Ok(receipt)
    }

    // =========================================================================
    // Assignment Administration
    // =========================================================================

    /// Creates an assignment with no originating transaction.
    pub async fn create_assignment(&self, actor_id: &str, new: &NewAssignment) -> LedgerResult<Assignment> {
        validate_identifier("account_id", &new.account_id)?;
        validate_identifier("staff_id", &new.staff_id)?;
        validate_identifier("vehicle_id", &new.vehicle_id)?;
        validate_identifier("route_id", &new.route_id)?;

        self.require_account(&new.account_id).await?;
        self.require_staff(&new.staff_id).await?;
        self.require_vehicle(&new.vehicle_id).await?;
        self.require_route(&new.route_id).await?;

        let now = Utc::now();
        let assignment = Assignment {
            id: Uuid::new_v4().to_string(),
            account_id: new.account_id.clone(),
            staff_id: new.staff_id.clone(),
            vehicle_id: new.vehicle_id.clone(),
            route_id: new.route_id.clone(),
            transaction_id: None,
            created_at: now,
            updated_at: now,
        };
        with_busy_retry(self.retry, "create_assignment", || async {
            Ok::<_, LedgerError>(self.db.assignments().insert(&assignment).await?)
        })
        .await?;

        info!(assignment_id = %assignment.id, "Assignment created");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Create,
                format!(
                    "Assigned staff {} on {} route {} to account {}",
                    assignment.staff_id, assignment.vehicle_id, assignment.route_id, assignment.account_id
                ),
            )
            .await;
        Ok(assignment)
    }

    /// Changes staff, vehicle and/or route. The transaction link is kept.
    pub async fn update_assignment(
        &self,
        actor_id: &str,
        assignment_id: &str,
        update: &AssignmentUpdate,
    ) -> LedgerResult<Assignment> {
        validate_identifier("assignment_id", assignment_id)?;
        if update.is_empty() {
            return self.get_assignment(assignment_id).await;
        }

        if let Some(staff_id) = &update.staff_id {
            validate_identifier("staff_id", staff_id)?;
            self.require_staff(staff_id).await?;
        }
        if let Some(vehicle_id) = &update.vehicle_id {
            validate_identifier("vehicle_id", vehicle_id)?;
            self.require_vehicle(vehicle_id).await?;
        }
        if let Some(route_id) = &update.route_id {
            validate_identifier("route_id", route_id)?;
            self.require_route(route_id).await?;
        }

        let assignment = with_busy_retry(self.retry, "update_assignment", || async {
            self.db
                .assignments()
                .update(assignment_id, update)
                .await?
                .ok_or_else(|| assignment_not_found(assignment_id))
        })
        .await?;

        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Update,
                format!(
                    "Updated assignment {}: staff {}, vehicle {}, route {}",
                    assignment.id, assignment.staff_id, assignment.vehicle_id, assignment.route_id
                ),
            )
            .await;
        Ok(assignment)
    }

    /// Removes an assignment. The transaction it came from stays.
    pub async fn delete_assignment(&self, actor_id: &str, assignment_id: &str) -> LedgerResult<()> {
        validate_identifier("assignment_id", assignment_id)?;

        let deleted = with_busy_retry(self.retry, "delete_assignment", || async {
            Ok::<_, LedgerError>(self.db.assignments().delete(assignment_id).await?)
        })
        .await?;
        if !deleted {
            return Err(assignment_not_found(assignment_id));
        }

        info!(assignment_id = %assignment_id, "Assignment deleted");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Delete,
                format!("Deleted assignment {}", assignment_id),
            )
            .await;
        Ok(())
    }

    pub async fn get_assignment(&self, assignment_id: &str) -> LedgerResult<Assignment> {
        self.db
            .assignments()
            .get_by_id(assignment_id)
            .await?
            .ok_or_else(|| assignment_not_found(assignment_id))
    }

    pub async fn list_assignments(&self, filter: &AssignmentFilter) -> LedgerResult<Vec<Assignment>> {
        let repo = self.db.assignments();
        let list = match filter {
            AssignmentFilter::Account(id) => repo.list_by_account(id).await?,
            AssignmentFilter::Staff(id) => repo.list_by_staff(id).await?,
            AssignmentFilter::Vehicle(id) => repo.list_by_vehicle(id).await?,
            AssignmentFilter::All(page) => repo.list_all(*page).await?,
        };
        Ok(list)
    }

    /// Number of assignments a staff member carries.
    pub async fn staff_workload(&self, staff_id: &str) -> LedgerResult<i64> {
        Ok(self.db.assignments().count_by_staff(staff_id).await?)
    }

    /// Number of assignments on a vehicle.
    pub async fn vehicle_workload(&self, vehicle_id: &str) -> LedgerResult<i64> {
        Ok(self.db.assignments().count_by_vehicle(vehicle_id).await?)
    }

    // =========================================================================
    // Reference Checks
    // =========================================================================

    async fn require_account(&self, account_id: &str) -> LedgerResult<()> {
        if self.accounts.account_exists(account_id).await? {
            Ok(())
        } else {
            Err(CoreError::AccountNotFound {
                account_id: account_id.to_string(),
            }
            .into())
        }
    }

    async fn require_staff(&self, staff_id: &str) -> LedgerResult<()> {
        let eligible = self.reference.list_eligible_staff().await?;
        if eligible.iter().any(|s| s == staff_id) {
            Ok(())
        } else {
            Err(CoreError::StaffNotEligible {
                staff_id: staff_id.to_string(),
            }
            .into())
        }
    }

    async fn require_vehicle(&self, vehicle_id: &str) -> LedgerResult<()> {
        if self.reference.vehicle_exists(vehicle_id).await? {
            Ok(())
        } else {
            Err(CoreError::VehicleNotFound {
                vehicle_id: vehicle_id.to_string(),
            }
            .into())
        }
    }

    async fn require_route(&self, route_id: &str) -> LedgerResult<()> {
        if self.reference.route_exists(route_id).await? {
            Ok(())
        } else {
            Err(CoreError::RouteNotFound {
                route_id: route_id.to_string(),
            }
            .into())
        }
    }
}

fn assignment_not_found(assignment_id: &str) -> LedgerError {
    CoreError::AssignmentNotFound {
        assignment_id: assignment_id.to_string(),
    }
    .into()
}

/// The rider named an account, not a card: report a short balance against it.
fn keyed_by_account(err: LedgerError, account_id: &str) -> LedgerError {
    match err {
        LedgerError::Rule(CoreError::InsufficientBalance { required, available, .. }) => {
            CoreError::InsufficientFare {
                account_id: account_id.to_string(),
                required,
                available,
            }
            .into()
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{card_service, seeded_db, trip_workflow};
    use transit_core::{CardClass, ErrorKind, Page, TransactionKind};

    fn request(account: &str, vehicle: &str, route: &str) -> PurchaseRequest {
        PurchaseRequest {
            account_id: account.into(),
            vehicle_id: vehicle.into(),
            route_id: route.into(),
        }
    }

    #[tokio::test]
    async fn test_purchase_links_transaction_and_assignment() {
        let db = seeded_db().await;
        let cards = card_service(&db, Some(3));
        let trips = trip_workflow(&db, Some(3));
        let card = cards
            .issue("ADMIN", "A1", CardClass::Standard, Money::from_cents(5000))
            .await
            .unwrap();

        let receipt = trips.purchase("A1", &request("A1", "V1", "R1")).await.unwrap();
        assert_eq!(receipt.fare.cents(), 2500);
        assert_eq!(receipt.card.balance_cents, 2500);
        assert_eq!(receipt.transaction.kind, TransactionKind::Purchase);
        assert_eq!(receipt.transaction.amount_cents, -2500);
        assert_eq!(receipt.assignment.transaction_id, Some(receipt.transaction.id));
        assert!(["S1", "S2"].contains(&receipt.assignment.staff_id.as_str()));

        let stored = trips.get_assignment(&receipt.assignment.id).await.unwrap();
        assert_eq!(stored, receipt.assignment);
        assert!(cards.reconcile(&card.card_number).await.unwrap().is_balanced());
    }

    #[tokio::test]
    async fn test_purchase_without_funds_leaves_nothing() {
        let db = seeded_db().await;
        let cards = card_service(&db, None);
        let trips = trip_workflow(&db, None);
        let card = cards
            .issue("ADMIN", "A1", CardClass::Standard, Money::from_cents(1000))
            .await
            .unwrap();

        let err = trips.purchase("A1", &request("A1", "V1", "R1")).await.unwrap_err();
        assert!(matches!(
            err.rule(),
            Some(CoreError::InsufficientFare { account_id, required, available })
                if account_id == "A1" && required.cents() == 2500 && available.cents() == 1000
        ));
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert!(!err.to_string().contains(&card.card_number));

        assert_eq!(cards.balance(&card.card_number).await.unwrap().cents(), 1000);
        assert!(trips.list_assignments(&AssignmentFilter::Account("A1".into())).await.unwrap().is_empty());
        assert_eq!(db.transactions().count_for_card(&card.card_number).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purchase_reference_errors() {
        let db = seeded_db().await;
        let cards = card_service(&db, None);
        let trips = trip_workflow(&db, None);
        cards
            .issue("ADMIN", "A1", CardClass::Standard, Money::from_cents(5000))
            .await
            .unwrap();

        let err = trips.purchase("A2", &request("A2", "V1", "R1")).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NoCardForAccount { .. })));

        let err = trips.purchase("A1", &request("ZZ", "V1", "R1")).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::AccountNotFound { .. })));

        let err = trips.purchase("A1", &request("A1", "V3", "R1")).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::VehicleNotFound { .. })));

        let err = trips.purchase("A1", &request("A1", "V1", "R9")).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::RouteNotFound { .. })));
    }

    #[tokio::test]
    async fn test_purchase_on_inactive_card() {
        let db = seeded_db().await;
        let cards = card_service(&db, None);
        let trips = trip_workflow(&db, None);
        let card = cards
            .issue("ADMIN", "A1", CardClass::Standard, Money::from_cents(5000))
            .await
            .unwrap();
        cards.deactivate("ADMIN", &card.card_number).await.unwrap();

        let err = trips.purchase("A1", &request("A1", "V1", "R1")).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::CardInactive { .. })));
    }

    #[tokio::test]
    async fn test_admin_assignment_lifecycle() {
        let db = seeded_db().await;
        let trips = trip_workflow(&db, None);

        let created = trips
            .create_assignment(
                "ADMIN",
                &NewAssignment {
                    account_id: "A1".into(),
                    staff_id: "S1".into(),
                    vehicle_id: "V1".into(),
                    route_id: "R1".into(),
                },
            )
            .await
            .unwrap();
        assert!(created.transaction_id.is_none());

        let updated = trips
            .update_assignment(
                "ADMIN",
                &created.id,
                &AssignmentUpdate {
                    staff_id: Some("S2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.staff_id, "S2");
        assert_eq!(updated.vehicle_id, "V1");

        assert_eq!(trips.staff_workload("S2").await.unwrap(), 1);
        assert_eq!(trips.staff_workload("S1").await.unwrap(), 0);
        assert_eq!(trips.vehicle_workload("V1").await.unwrap(), 1);
        assert_eq!(trips.list_assignments(&AssignmentFilter::All(Page::default())).await.unwrap().len(), 1);

        trips.delete_assignment("ADMIN", &created.id).await.unwrap();
        let err = trips.get_assignment(&created.id).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::AssignmentNotFound { .. })));
        let err = trips.delete_assignment("ADMIN", &created.id).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::AssignmentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_admin_assignment_rejects_inactive_staff() {
        let db = seeded_db().await;
        let trips = trip_workflow(&db, None);

        let err = trips
            .create_assignment(
                "ADMIN",
                &NewAssignment {
                    account_id: "A1".into(),
                    staff_id: "S3".into(),
                    vehicle_id: "V1".into(),
                    route_id: "R1".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::StaffNotEligible { .. })));
    }
}
