//! End-to-end verification flow against the in-memory store.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use doorstep_core::PhoneNumber;
use doorstep_server::db::MemoryVerificationStore;
use doorstep_server::services::{SmsSender, VerificationError, VerificationService};

/// Sender stub that records delivered codes.
#[derive(Default)]
struct CapturingSender {
    codes: Mutex<Vec<String>>,
}

impl CapturingSender {
    fn last_code(&self) -> Option<String> {
        self.codes.lock().expect("lock poisoned").last().cloned()
    }
}

#[async_trait]
impl SmsSender for CapturingSender {
    async fn send_code(&self, _phone: &PhoneNumber, code: &str) -> bool {
        self.codes
            .lock()
            .expect("lock poisoned")
            .push(code.to_owned());
        true
    }
}

fn setup() -> (VerificationService, Arc<MemoryVerificationStore>, Arc<CapturingSender>) {
    let store = Arc::new(MemoryVerificationStore::new());
    let sender = Arc::new(CapturingSender::default());
    let service = VerificationService::new(store.clone(), sender.clone());
    (service, store, sender)
}

#[tokio::test]
async fn full_flow_request_fail_three_times_then_exhausted() {
    let (service, _store, sender) = setup();

    // Request a code for the example number; TTL is five minutes.
    let issued = service
        .request_code("5551234567")
        .await
        .expect("code issued");
    assert_eq!(issued.expires_in_seconds, 300);

    let real_code = sender.last_code().expect("code delivered");
    assert_eq!(real_code.len(), 4);
    // The guessed code in this scenario must be wrong.
    let wrong_code = if real_code == "0000" { "9999" } else { "0000" };

    // Three wrong guesses burn the attempt budget.
    for expected_remaining in [2, 1, 0] {
        match service.verify_code("5551234567", wrong_code).await {
            Err(VerificationError::WrongCode { attempts_remaining }) => {
                assert_eq!(attempts_remaining, expected_remaining);
            }
            other => panic!("expected WrongCode, got {other:?}"),
        }
    }

    // The fourth attempt fails even with the real code, and deletes the
    // record.
    let result = service.verify_code("5551234567", &real_code).await;
    assert!(matches!(result, Err(VerificationError::TooManyAttempts)));

    let result = service.verify_code("5551234567", &real_code).await;
    assert!(matches!(result, Err(VerificationError::NoActiveCode)));
}

#[tokio::test]
async fn requesting_twice_leaves_a_single_active_code() {
    let (service, store, sender) = setup();

    service
        .request_code("5551234567")
        .await
        .expect("first code issued");
    service
        .request_code("5551234567")
        .await
        .expect("second code issued");

    // Only the superseding record survives.
    assert_eq!(store.len(), 1);

    // The latest delivered code is the one that verifies.
    let code = sender.last_code().expect("code delivered");
    let phone = service
        .verify_code("5551234567", &code)
        .await
        .expect("verification succeeds");
    assert_eq!(phone.as_str(), "5551234567");
}

#[tokio::test]
async fn verified_record_is_not_reusable_as_active_code() {
    let (service, _store, sender) = setup();

    service
        .request_code("5551234567")
        .await
        .expect("code issued");
    let code = sender.last_code().expect("code delivered");

    service
        .verify_code("5551234567", &code)
        .await
        .expect("verification succeeds");

    // The record is now verified, so it no longer matches as an active
    // (unverified) code.
    let result = service.verify_code("5551234567", &code).await;
    assert!(matches!(result, Err(VerificationError::NoActiveCode)));
}

#[tokio::test]
async fn formatted_input_normalizes_to_digits() {
    let (service, _store, sender) = setup();

    service
        .request_code("+90 (555) 123-45-67")
        .await
        .expect("code issued");
    let code = sender.last_code().expect("code delivered");

    // Verification accepts any formatting of the same number.
    let phone = service
        .verify_code("90 555 123 45 67", &code)
        .await
        .expect("verification succeeds");
    assert_eq!(phone.as_str(), "905551234567");
}
