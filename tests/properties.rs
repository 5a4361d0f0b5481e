//! Property tests for ledger membership semantics.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use subscription_ledger::{
    ActivityId, MemoryRecordStore, SubscriptionLedger, ThreadId, UserId,
};

fn ledger() -> SubscriptionLedger {
    SubscriptionLedger::new(Arc::new(MemoryRecordStore::new()))
}

/// First-occurrence order of a sequence with repeats.
fn dedup_in_order(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[derive(Clone, Debug)]
enum Op {
    Thread(String),
    Activity(String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-d]{1,2}".prop_map(Op::Thread),
        "[a-d]{1,2}".prop_map(Op::Activity),
    ]
}

proptest! {
    #[test]
    fn prop_subscribing_twice_equals_once(user in "[a-z]{1,8}", id in "[a-z0-9_]{1,12}") {
        let once = ledger();
        let twice = ledger();
        let user = UserId::from(user);

        once.subscribe_to_activity(&user, &ActivityId::from(id.as_str())).unwrap();
        twice.subscribe_to_activity(&user, &ActivityId::from(id.as_str())).unwrap();
        twice.subscribe_to_activity(&user, &ActivityId::from(id.as_str())).unwrap();

        once.subscribe_to_thread(&user, &ThreadId::from(id.as_str())).unwrap();
        twice.subscribe_to_thread(&user, &ThreadId::from(id.as_str())).unwrap();
        twice.subscribe_to_thread(&user, &ThreadId::from(id.as_str())).unwrap();

        prop_assert_eq!(
            once.get_activity_ids_subscribed_to(&user).unwrap(),
            twice.get_activity_ids_subscribed_to(&user).unwrap()
        );
        prop_assert_eq!(
            once.get_thread_ids_subscribed_to(&user).unwrap(),
            twice.get_thread_ids_subscribed_to(&user).unwrap()
        );
        prop_assert_eq!(twice.get_activity_ids_subscribed_to(&user).unwrap().len(), 1);
    }

    #[test]
    fn prop_first_subscription_order_is_kept(ids in prop::collection::vec("[a-f]{1,2}", 0..40)) {
        let ledger = ledger();
        let user = UserId::from("u");

        for id in &ids {
            ledger.subscribe_to_activity(&user, &ActivityId::from(id.as_str())).unwrap();
        }

        let got: Vec<String> = ledger
            .get_activity_ids_subscribed_to(&user)
            .unwrap()
            .into_iter()
            .map(|id| id.0)
            .collect();
        prop_assert_eq!(got, dedup_in_order(&ids));
    }

    #[test]
    fn prop_threads_and_activities_are_independent(ops in prop::collection::vec(op(), 0..40)) {
        let ledger = ledger();
        let user = UserId::from("u");

        let mut threads = Vec::new();
        let mut activities = Vec::new();
        for op in &ops {
            match op {
                Op::Thread(id) => {
                    ledger.subscribe_to_thread(&user, &ThreadId::from(id.as_str())).unwrap();
                    threads.push(id.clone());
                }
                Op::Activity(id) => {
                    ledger.subscribe_to_activity(&user, &ActivityId::from(id.as_str())).unwrap();
                    activities.push(id.clone());
                }
            }
        }

        let got_threads: Vec<String> = ledger
            .get_thread_ids_subscribed_to(&user)
            .unwrap()
            .into_iter()
            .map(|id| id.0)
            .collect();
        let got_activities: Vec<String> = ledger
            .get_activity_ids_subscribed_to(&user)
            .unwrap()
            .into_iter()
            .map(|id| id.0)
            .collect();

        prop_assert_eq!(got_threads, dedup_in_order(&threads));
        prop_assert_eq!(got_activities, dedup_in_order(&activities));
    }

    #[test]
    fn prop_users_do_not_share_subscriptions(a in "[a-z]{1,6}", b in "[a-z]{1,6}", id in "[a-z]{1,6}") {
        prop_assume!(a != b);
        let ledger = ledger();
        let (a, b) = (UserId::from(a), UserId::from(b));

        ledger.subscribe_to_activity(&a, &ActivityId::from(id.as_str())).unwrap();

        prop_assert!(ledger.get_activity_ids_subscribed_to(&b).unwrap().is_empty());
        prop_assert_eq!(ledger.get_activity_ids_subscribed_to(&a).unwrap().len(), 1);
    }
}
