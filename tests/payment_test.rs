// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Deposit/withdrawal lifecycle and webhook processing integration tests.

use fairway_ledger::{
    Engine, EngineError, GatewayCharge, GatewayError, GatewayStatus, PaymentGateway,
    PaymentStatus, UserId, WebhookEvent,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// === Helper Functions ===

fn user(engine: &Engine) -> UserId {
    engine.ledger().insert_account("Jordan", None, None)
}

/// Gateway that leaves every charge pending, handing out predictable ids.
#[derive(Default)]
struct PendingGateway {
    counter: AtomicU64,
}

impl PendingGateway {
    fn charge(&self) -> Result<GatewayCharge, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(GatewayCharge {
            id: format!("pend-{n}"),
            status: GatewayStatus::Pending,
            error: None,
        })
    }
}

impl PaymentGateway for PendingGateway {
    fn process_payment(
        &self,
        _merchant_ref: &str,
        _amount: Decimal,
        _currency: &str,
        _payment_token: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        self.charge()
    }

    fn process_withdrawal(
        &self,
        _merchant_ref: &str,
        _amount: Decimal,
        _currency: &str,
        _destination: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        self.charge()
    }

    fn refund_payment(
        &self,
        _charge_id: &str,
        _amount: Decimal,
    ) -> Result<GatewayCharge, GatewayError> {
        self.charge()
    }
}

/// Gateway that is unreachable at the transport level.
struct OfflineGateway;

impl PaymentGateway for OfflineGateway {
    fn process_payment(
        &self,
        _merchant_ref: &str,
        _amount: Decimal,
        _currency: &str,
        _payment_token: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        Err(GatewayError("connection reset".into()))
    }

    fn process_withdrawal(
        &self,
        _merchant_ref: &str,
        _amount: Decimal,
        _currency: &str,
        _destination: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        Err(GatewayError("connection reset".into()))
    }

    fn refund_payment(
        &self,
        _charge_id: &str,
        _amount: Decimal,
    ) -> Result<GatewayCharge, GatewayError> {
        Err(GatewayError("connection reset".into()))
    }
}

// === Synchronous Outcomes ===

#[test]
fn instant_deposit_completes_and_credits() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);

    let transaction = engine.deposit(user, dec!(250), "tok_visa").unwrap();

    assert_eq!(transaction.status, PaymentStatus::Completed);
    assert!(transaction.charge_id.is_some());
    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(250));

    let summary = engine.user_summary(user).unwrap();
    assert_eq!(summary.deposited, dec!(250));
    assert_eq!(summary.withdrawn, Decimal::ZERO);
}

#[test]
fn instant_withdrawal_completes_and_debits() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);
    engine.deposit(user, dec!(250), "tok_visa").unwrap();

    let transaction = engine.withdraw(user, dec!(100), "acct_1").unwrap();

    assert_eq!(transaction.status, PaymentStatus::Completed);
    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(150));
    assert_eq!(engine.user_summary(user).unwrap().withdrawn, dec!(100));
}

#[test]
fn declined_deposit_is_failed_with_gateway_message() {
    struct Declining;
    impl PaymentGateway for Declining {
        fn process_payment(
            &self,
            _m: &str,
            _a: Decimal,
            _c: &str,
            _t: &str,
        ) -> Result<GatewayCharge, GatewayError> {
            Ok(GatewayCharge {
                id: "declined-0".into(),
                status: GatewayStatus::Failed,
                error: Some("card declined".into()),
            })
        }
        fn process_withdrawal(
            &self,
            m: &str,
            a: Decimal,
            c: &str,
            _d: &str,
        ) -> Result<GatewayCharge, GatewayError> {
            self.process_payment(m, a, c, "")
        }
        fn refund_payment(
            &self,
            c: &str,
            a: Decimal,
        ) -> Result<GatewayCharge, GatewayError> {
            self.process_payment(c, a, "", "")
        }
    }

    let engine = Engine::new(Arc::new(Declining));
    let user = user(&engine);

    let transaction = engine.deposit(user, dec!(250), "tok_visa").unwrap();

    assert_eq!(transaction.status, PaymentStatus::Failed);
    assert_eq!(transaction.gateway_error.as_deref(), Some("card declined"));
    assert_eq!(engine.ledger().account(user).unwrap().balance(), Decimal::ZERO);
    // Failed transactions never count in summaries.
    assert_eq!(engine.user_summary(user).unwrap().deposited, Decimal::ZERO);
}

#[test]
fn transport_failure_marks_the_transaction_failed() {
    let engine = Engine::new(Arc::new(OfflineGateway));
    let user = user(&engine);

    let transaction = engine.deposit(user, dec!(250), "tok_visa").unwrap();

    assert_eq!(transaction.status, PaymentStatus::Failed);
    let message = transaction.gateway_error.unwrap();
    assert!(message.contains("connection reset"), "got: {message}");
    assert_eq!(engine.ledger().account(user).unwrap().balance(), Decimal::ZERO);
}

#[test]
fn invalid_amounts_are_rejected_up_front() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);

    assert!(matches!(
        engine.deposit(user, Decimal::ZERO, "tok"),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.withdraw(user, dec!(-5), "acct"),
        Err(EngineError::Validation(_))
    ));
    assert!(engine.ledger().transactions().is_empty());
}

#[test]
fn withdrawal_requires_covering_balance_at_creation() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);
    engine.deposit(user, dec!(50), "tok").unwrap();

    let result = engine.withdraw(user, dec!(100), "acct");
    assert_eq!(
        result,
        Err(EngineError::InsufficientBalance {
            required: dec!(100),
            available: dec!(50),
        })
    );
    assert_eq!(engine.ledger().transactions().len(), 1);
}

#[test]
fn unknown_user_cannot_pay() {
    let engine = Engine::with_instant_gateway();
    assert_eq!(
        engine.deposit(UserId(404), dec!(10), "tok"),
        Err(EngineError::UserNotFound)
    );
}

// === Webhook Lifecycle ===

#[test]
fn pending_deposit_completes_via_webhook() {
    let engine = Engine::new(Arc::new(PendingGateway::default()));
    let user = user(&engine);

    let pending = engine.deposit(user, dec!(250), "tok_visa").unwrap();
    assert_eq!(pending.status, PaymentStatus::Pending);
    assert_eq!(engine.ledger().account(user).unwrap().balance(), Decimal::ZERO);
    let charge_id = pending.charge_id.clone().unwrap();

    engine.handle_webhook(WebhookEvent::PaymentCompleted {
        charge_id: charge_id.clone(),
    });

    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(250));
    let transaction = engine.ledger().transactions().get(pending.id).unwrap();
    assert_eq!(transaction.status, PaymentStatus::Completed);
    assert!(engine.webhook_failures().is_empty());
}

#[test]
fn replayed_completion_webhook_does_not_double_credit() {
    let engine = Engine::new(Arc::new(PendingGateway::default()));
    let user = user(&engine);

    let pending = engine.deposit(user, dec!(250), "tok_visa").unwrap();
    let charge_id = pending.charge_id.clone().unwrap();

    engine.handle_webhook(WebhookEvent::PaymentCompleted {
        charge_id: charge_id.clone(),
    });
    engine.handle_webhook(WebhookEvent::PaymentCompleted { charge_id });

    // Credited once; the replay is parked for reconciliation.
    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(250));
    let failures = engine.webhook_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, EngineError::Conflict);
}

#[test]
fn failure_webhook_preserves_the_gateway_message() {
    let engine = Engine::new(Arc::new(PendingGateway::default()));
    let user = user(&engine);

    let pending = engine.deposit(user, dec!(250), "tok_visa").unwrap();
    let charge_id = pending.charge_id.clone().unwrap();

    engine.handle_webhook(WebhookEvent::PaymentFailed {
        charge_id,
        message: "3DS verification failed".into(),
    });

    let transaction = engine.ledger().transactions().get(pending.id).unwrap();
    assert_eq!(transaction.status, PaymentStatus::Failed);
    assert_eq!(
        transaction.gateway_error.as_deref(),
        Some("3DS verification failed")
    );
    assert_eq!(engine.ledger().account(user).unwrap().balance(), Decimal::ZERO);
}

#[test]
fn unknown_charge_is_acknowledged_but_parked() {
    let engine = Engine::with_instant_gateway();

    engine.handle_webhook(WebhookEvent::PaymentCompleted {
        charge_id: "mystery-charge".into(),
    });

    let failures = engine.webhook_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].error, EngineError::Internal(_)));
    // Draining empties the queue.
    assert!(engine.webhook_failures().is_empty());
}

#[test]
fn pending_withdrawal_fails_if_funds_were_spent_meanwhile() {
    let engine = Engine::new(Arc::new(PendingGateway::default()));
    let user = user(&engine);

    // Seed a completed deposit through its webhook.
    let deposit = engine.deposit(user, dec!(100), "tok").unwrap();
    engine.handle_webhook(WebhookEvent::PaymentCompleted {
        charge_id: deposit.charge_id.clone().unwrap(),
    });

    let withdrawal = engine.withdraw(user, dec!(80), "acct").unwrap();
    assert_eq!(withdrawal.status, PaymentStatus::Pending);

    // Drain the balance before the withdrawal settles.
    engine.ledger().account(user).unwrap().debit(dec!(60)).unwrap();

    engine.handle_webhook(WebhookEvent::PaymentCompleted {
        charge_id: withdrawal.charge_id.clone().unwrap(),
    });

    // The completion could not debit; the withdrawal failed instead of
    // taking the balance negative.
    let transaction = engine.ledger().transactions().get(withdrawal.id).unwrap();
    assert_eq!(transaction.status, PaymentStatus::Failed);
    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(40));
}

#[test]
fn user_history_lists_every_outcome_in_creation_order() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);
    let other = engine.ledger().insert_account("Nelly", None, None);

    engine.deposit(user, dec!(100), "tok").unwrap();
    engine.withdraw(user, dec!(30), "acct").unwrap();
    let rejected = engine.withdraw(user, dec!(500), "acct");
    assert!(rejected.is_err());
    engine.deposit(other, dec!(5), "tok").unwrap();

    let history = engine.ledger().transactions().user_transactions(user);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].value, dec!(100));
    assert_eq!(history[1].value, dec!(30));
    assert!(history.iter().all(|t| t.user_id == user));
}

// === Refunds ===

#[test]
fn refund_reverses_a_completed_deposit_with_a_compensating_row() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);

    let deposit = engine.deposit(user, dec!(250), "tok_visa").unwrap();
    let charge_id = deposit.charge_id.clone().unwrap();

    engine.handle_webhook(WebhookEvent::RefundCompleted {
        charge_id: charge_id.clone(),
    });

    assert!(engine.webhook_failures().is_empty());
    assert_eq!(engine.ledger().account(user).unwrap().balance(), Decimal::ZERO);

    // The original row is untouched; a compensating withdrawal was added.
    let original = engine.ledger().transactions().get(deposit.id).unwrap();
    assert_eq!(original.status, PaymentStatus::Completed);

    let refund_id = engine
        .ledger()
        .transactions()
        .find_by_charge(&format!("{charge_id}/refund"))
        .unwrap();
    let reversal = engine.ledger().transactions().get(refund_id).unwrap();
    assert_eq!(reversal.status, PaymentStatus::Completed);
    assert_eq!(reversal.value, dec!(250));

    let summary = engine.user_summary(user).unwrap();
    assert_eq!(summary.deposited, dec!(250));
    assert_eq!(summary.withdrawn, dec!(250));
}

#[test]
fn replayed_refund_webhook_does_not_double_debit() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);

    let deposit = engine.deposit(user, dec!(250), "tok_visa").unwrap();
    engine.deposit(user, dec!(250), "tok_visa").unwrap();
    let charge_id = deposit.charge_id.clone().unwrap();

    engine.handle_webhook(WebhookEvent::RefundCompleted {
        charge_id: charge_id.clone(),
    });
    engine.handle_webhook(WebhookEvent::RefundCompleted { charge_id });

    // Debited once; the redelivery is parked for reconciliation.
    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(250));
    let failures = engine.webhook_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, EngineError::Conflict);
    assert_eq!(engine.user_summary(user).unwrap().withdrawn, dec!(250));
}

#[test]
fn refund_of_spent_funds_is_parked_for_reconciliation() {
    let engine = Engine::with_instant_gateway();
    let user = user(&engine);

    let deposit = engine.deposit(user, dec!(250), "tok_visa").unwrap();
    engine.ledger().account(user).unwrap().debit(dec!(200)).unwrap();

    engine.handle_webhook(WebhookEvent::RefundCompleted {
        charge_id: deposit.charge_id.clone().unwrap(),
    });

    let failures = engine.webhook_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0].error,
        EngineError::InsufficientBalance { .. }
    ));
    // The balance was left alone.
    assert_eq!(engine.ledger().account(user).unwrap().balance(), dec!(50));
}

#[test]
fn refund_of_a_pending_deposit_is_rejected() {
    let engine = Engine::new(Arc::new(PendingGateway::default()));
    let user = user(&engine);

    let pending = engine.deposit(user, dec!(250), "tok_visa").unwrap();

    engine.handle_webhook(WebhookEvent::RefundCompleted {
        charge_id: pending.charge_id.clone().unwrap(),
    });

    let failures = engine.webhook_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, EngineError::Conflict);
}
