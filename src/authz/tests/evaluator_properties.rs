//! Property tests for action matching, evaluation and policy set merging

use gatekeep_authz::{
    allow, deny, equals, matches, matches_any, AuthorizeParams, Authorizer, AuthorizerConfig,
    ConditionContext, Decision, Effect, EntityRegistry, EntityType, Evaluator, Gid,
    InMemoryMembershipStore, InMemorySessionStore, MembershipRole, Policy, PolicySet, Request,
    Statement, TenantId,
};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// STRATEGIES
// ============================================================================

fn segment() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["iam", "documents", "organization", "read", "update", "delete"])
        .prop_map(str::to_string)
}

fn concrete_action() -> impl Strategy<Value = String> {
    (segment(), segment(), segment()).prop_map(|(a, b, c)| format!("{}:{}:{}", a, b, c))
}

fn pattern_segment() -> impl Strategy<Value = String> {
    prop_oneof![segment(), Just("*".to_string())]
}

fn action_pattern() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        segment().prop_map(|s| format!("{}:*", s)),
        (pattern_segment(), pattern_segment(), pattern_segment())
            .prop_map(|(a, b, c)| format!("{}:{}:{}", a, b, c)),
    ]
}

fn statement() -> impl Strategy<Value = Statement> {
    (any::<bool>(), prop::collection::vec(action_pattern(), 1..3)).prop_map(|(is_allow, actions)| {
        if is_allow {
            allow(actions)
        } else {
            deny(actions)
        }
    })
}

fn policies() -> impl Strategy<Value = Vec<Arc<Policy>>> {
    prop::collection::vec(prop::collection::vec(statement(), 0..4), 0..4).prop_map(|sets| {
        sets.into_iter()
            .enumerate()
            .map(|(i, statements)| Arc::new(Policy::new(format!("p{}", i), "", statements)))
            .collect()
    })
}

fn role() -> impl Strategy<Value = MembershipRole> {
    prop::sample::select(vec![
        MembershipRole::Owner,
        MembershipRole::Admin,
        MembershipRole::Viewer,
        MembershipRole::Auditor,
        MembershipRole::Employee,
    ])
}

fn policy_set() -> impl Strategy<Value = PolicySet> {
    (
        prop::collection::vec((role(), "[a-z]{1,6}"), 0..5),
        prop::collection::vec("[a-z]{1,6}", 0..3),
    )
        .prop_map(|(role_policies, identity_scoped)| {
            let mut set = PolicySet::new();
            for (role, name) in role_policies {
                set.add_role_policy(role, [Policy::new(name, "", vec![allow(["*"])])]);
            }
            set.add_identity_scoped_policy(
                identity_scoped
                    .into_iter()
                    .map(|name| Policy::new(name, "", vec![deny(["*"])])),
            );
            set
        })
}

fn names(policies: &[Arc<Policy>]) -> Vec<String> {
    policies.iter().map(|p| p.name.clone()).collect()
}

fn request(action: String) -> Request {
    Request {
        principal: Gid::new(TenantId::new_random(), EntityType::Identity),
        resource: Gid::new(TenantId::new_random(), EntityType::Document),
        action,
        context: ConditionContext::default(),
    }
}

/// Decision computed from first principles
fn expected(policies: &[Arc<Policy>], action: &str) -> Decision {
    let applicable: Vec<&Statement> = policies
        .iter()
        .flat_map(|p| p.statements.iter())
        .filter(|s| matches_any(&s.actions, action))
        .collect();

    if applicable.iter().any(|s| s.effect == Effect::Deny) {
        Decision::Deny
    } else if applicable.is_empty() {
        Decision::NoMatch
    } else {
        Decision::Allow
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_universal_wildcard_matches_everything(action in concrete_action()) {
        prop_assert!(matches("*", &action));
    }

    #[test]
    fn prop_exact_pattern_matches_itself(action in concrete_action()) {
        prop_assert!(matches(&action, &action));
    }

    #[test]
    fn prop_service_wildcard_matches_own_service(action in concrete_action()) {
        let service = action.split(':').next().unwrap().to_string();
        let pattern = format!("{}:*", service);
        prop_assert!(matches(&pattern, &action));
    }

    #[test]
    fn prop_narrowing_a_wildcard_never_widens(
        segments in (pattern_segment(), pattern_segment(), pattern_segment()),
        concrete in segment(),
        position in 0usize..3,
        action in concrete_action(),
    ) {
        let (a, b, c) = segments;
        let mut parts = [a, b, c];
        let broad = parts.join(":");
        if parts[position] == "*" {
            parts[position] = concrete;
        }
        let narrow = parts.join(":");

        if matches(&narrow, &action) {
            prop_assert!(matches(&broad, &action), "{} matched but {} did not", narrow, broad);
        }
    }

    #[test]
    fn prop_service_wildcard_covers_narrower_patterns(
        service in segment(),
        resource in pattern_segment(),
        operation in pattern_segment(),
        action in concrete_action(),
    ) {
        let broad = format!("{}:*", service);
        let narrow = format!("{}:{}:{}", service, resource, operation);

        if matches(&narrow, &action) {
            prop_assert!(matches(&broad, &action));
        }
    }

    #[test]
    fn prop_decision_matches_precedence(policies in policies(), action in concrete_action()) {
        let result = Evaluator::new().evaluate(&request(action.clone()), &policies);
        prop_assert_eq!(result.decision, expected(&policies, &action));
    }

    #[test]
    fn prop_decision_independent_of_order(policies in policies(), action in concrete_action()) {
        let req = request(action);
        let forward = Evaluator::new().evaluate(&req, &policies);

        let mut reversed = policies.clone();
        reversed.reverse();
        let backward = Evaluator::new().evaluate(&req, &reversed);

        prop_assert_eq!(forward.decision, backward.decision);
    }

    #[test]
    fn prop_adding_deny_never_allows(policies in policies(), action in concrete_action()) {
        let req = request(action.clone());
        let mut with_deny = policies.clone();
        with_deny.push(Arc::new(Policy::new("deny", "", vec![deny([action])])));

        let result = Evaluator::new().evaluate(&req, &with_deny);
        prop_assert_eq!(result.decision, Decision::Deny);
    }

    #[test]
    fn prop_unresolvable_condition_never_applies(action in concrete_action(), key in "[a-z]{1,8}") {
        let policies = vec![Arc::new(Policy::new(
            "conditional",
            "",
            vec![allow(["*"]).when([equals(format!("principal.{}", key), ["x"])])],
        ))];

        let result = Evaluator::new().evaluate(&request(action), &policies);
        prop_assert_eq!(result.decision, Decision::NoMatch);
    }

    #[test]
    fn prop_merge_order_preserves_decisions(
        a in policies(),
        b in policies(),
        action in concrete_action(),
    ) {
        let mut left = PolicySet::new();
        left.add_role_policy(MembershipRole::Admin, a.iter().cloned());
        let mut right = PolicySet::new();
        right.add_identity_scoped_policy(b.iter().cloned());

        let ab = PolicySet::merge_all([&left, &right]);
        let ba = PolicySet::merge_all([&right, &left]);
        let req = request(action);

        for role in [None, Some(MembershipRole::Admin), Some(MembershipRole::Viewer)] {
            let x = Evaluator::new().evaluate(&req, &ab.applicable(role));
            let y = Evaluator::new().evaluate(&req, &ba.applicable(role));
            prop_assert_eq!(x.decision, y.decision);
        }
    }

    #[test]
    fn prop_merge_is_associative(
        a in policy_set(),
        b in policy_set(),
        c in policy_set(),
    ) {
        let ab = PolicySet::merge_all([&a, &b]);
        let left = PolicySet::merge_all([&ab, &c]);
        let bc = PolicySet::merge_all([&b, &c]);
        let right = PolicySet::merge_all([&a, &bc]);

        prop_assert_eq!(left.roles(), right.roles());
        for role in left.roles() {
            prop_assert_eq!(
                names(left.policies_for_role(role)),
                names(right.policies_for_role(role))
            );
        }
        prop_assert_eq!(
            names(left.identity_scoped_policies()),
            names(right.identity_scoped_policies())
        );
    }

    #[test]
    fn prop_authorize_is_deterministic(policies in policies(), action in concrete_action()) {
        tokio_test::block_on(async {
            let mut set = PolicySet::new();
            set.add_identity_scoped_policy(policies.iter().cloned());
            let config = AuthorizerConfig {
                validate_policies: false,
                ..AuthorizerConfig::default()
            };
            let authorizer = Authorizer::new(
                config,
                set,
                EntityRegistry::new(),
                Arc::new(InMemoryMembershipStore::new()),
                Arc::new(InMemorySessionStore::new()),
            )
            .unwrap();

            let params = AuthorizeParams::new(
                Gid::new(TenantId::new_random(), EntityType::Identity),
                Gid::new(TenantId::new_random(), EntityType::Document),
                action,
            );

            let first = authorizer.evaluate(&params).await.unwrap().decision;
            for _ in 0..3 {
                let again = authorizer.evaluate(&params).await.unwrap().decision;
                assert_eq!(first, again);
            }
            assert_eq!(first, expected(&policies, &params.action));
        });
    }
}
