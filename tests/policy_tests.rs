use axum::http::Method;
use red_drop_api::policy::{Gate, ROUTE_POLICY, gate_for, policy_for};
use std::collections::HashSet;

#[test]
fn test_policy_entries_are_unique() {
    let mut seen = HashSet::new();
    for rule in ROUTE_POLICY {
        assert!(
            seen.insert((rule.method, rule.path)),
            "duplicate policy for {} {}",
            rule.method,
            rule.path
        );
    }
}

#[test]
fn test_privileged_routes_keep_their_gates() {
    let admin_only = [
        ("GET", "/users"),
        ("PATCH", "/users/role/{id}"),
        ("PATCH", "/users/status/{id}"),
        ("PATCH", "/users/{id}"),
        ("POST", "/blogs"),
        ("PATCH", "/blogs/{id}"),
        ("PATCH", "/blogs/publish/{id}"),
        ("PATCH", "/blogs/unpublish/{id}"),
        ("DELETE", "/blogs/{id}"),
    ];
    for (method, path) in admin_only {
        let method = Method::from_bytes(method.as_bytes()).unwrap();
        assert_eq!(policy_for(&method, path), Some(Gate::Admin), "{method} {path}");
    }

    for path in ["/dashboard-stats", "/all-donation-requests", "/all-blogs"] {
        assert_eq!(
            policy_for(&Method::GET, path),
            Some(Gate::AdminOrVolunteer),
            "GET {path}"
        );
    }
}

#[test]
fn test_public_surface_is_exactly_the_anonymous_endpoints() {
    let public: HashSet<(&str, &str)> = ROUTE_POLICY
        .iter()
        .filter(|rule| rule.gate == Gate::Public)
        .map(|rule| (rule.method, rule.path))
        .collect();

    let expected: HashSet<(&str, &str)> = [
        ("GET", "/"),
        ("GET", "/health"),
        ("POST", "/users"),
        ("GET", "/user-role/{email}"),
        ("GET", "/user-status/{email}"),
        ("GET", "/search-donors"),
        ("GET", "/blogs"),
        ("GET", "/blogs/{id}"),
        ("GET", "/pending-donation-requests"),
        ("GET", "/pending-donation-requests/{id}"),
    ]
    .into_iter()
    .collect();

    assert_eq!(public, expected);
}

#[test]
fn test_same_path_can_carry_different_gates_per_method() {
    assert_eq!(policy_for(&Method::GET, "/blogs/{id}"), Some(Gate::Public));
    assert_eq!(policy_for(&Method::PATCH, "/blogs/{id}"), Some(Gate::Admin));
    assert_eq!(policy_for(&Method::GET, "/users"), Some(Gate::Admin));
    assert_eq!(policy_for(&Method::POST, "/users"), Some(Gate::Public));
}

#[test]
fn test_unlisted_route_falls_back_to_admin() {
    assert_eq!(policy_for(&Method::PUT, "/users/{id}"), None);
    assert_eq!(gate_for(&Method::PUT, "/users/{id}"), Gate::Admin);
    assert_eq!(gate_for(&Method::GET, "/not-in-table"), Gate::Admin);
}

#[test]
fn test_head_shares_the_get_gate() {
    assert_eq!(policy_for(&Method::HEAD, "/blogs"), Some(Gate::Public));
    assert_eq!(policy_for(&Method::HEAD, "/all-blogs"), Some(Gate::AdminOrVolunteer));
    assert_eq!(policy_for(&Method::HEAD, "/users"), Some(Gate::Admin));
}
