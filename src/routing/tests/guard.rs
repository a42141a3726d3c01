use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::infra::InMemoryBackend;
use crate::routing::{
    AssignedBy, EligibilityError, LeadId, PartnerId, PartnerLocks, RoutingError,
};

#[test]
fn unrelated_partners_never_block_each_other() {
    let locks = PartnerLocks::new();
    let first = locks.lock(&PartnerId("p-a".to_string()));
    // Would deadlock here if the guard were global instead of per-partner.
    let second = locks.lock(&PartnerId("p-b".to_string()));
    drop(first);
    drop(second);

    let reacquired = locks.lock(&PartnerId("p-a".to_string()));
    drop(reacquired);
}

#[test]
fn a_panicking_holder_still_releases_its_slot() {
    let locks = Arc::new(PartnerLocks::new());
    let partner = PartnerId("p-a".to_string());

    let locks_for_thread = locks.clone();
    let partner_for_thread = partner.clone();
    let result = thread::spawn(move || {
        let _guard = locks_for_thread.lock(&partner_for_thread);
        panic!("holder crashes mid-critical-section");
    })
    .join();
    assert!(result.is_err());

    // Would hang forever if the unwind had leaked the slot.
    let guard = locks.lock(&partner);
    drop(guard);
}

#[test]
fn concurrent_assignments_cannot_overshoot_the_last_quota_slot() {
    let backend = InMemoryBackend::new();
    seed_industries(&backend);
    backend.leads.insert(lead("lead-a"));
    backend.leads.insert(lead("lead-b"));

    let contested = partner("p-contested");
    seed_routable_partner(&backend, &contested, 1);

    let service = Arc::new(service(&backend));
    let mut handles = Vec::new();
    for lead_id in ["lead-a", "lead-b"] {
        let service = service.clone();
        let target = contested.id.clone();
        handles.push(thread::spawn(move || {
            service.assign(
                &LeadId(lead_id.to_string()),
                AssignedBy::Manual,
                Some(target),
            )
        }));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("assignment thread completes"))
        .collect();

    let committed = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(committed, 1, "exactly one side may spend the last slot");

    let rejected = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .expect("one side must be rejected");
    assert!(matches!(
        rejected,
        RoutingError::Ineligible(EligibilityError::QuotaExceeded { used: 1, quota: 1 })
    ));

    assert_eq!(backend.audit.assignment_entries().len(), 1);
}
