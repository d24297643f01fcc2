use red_drop_api::{
    ApiError,
    handlers::{funds::validate_fund, payments::to_minor_units},
    models::{
        AccountStatus, CreateFundRequest, DEFAULT_PAGE_SIZE, ListQuery, MAX_PAGE_SIZE, Role,
        UserProfile,
    },
    roles::parse_profile,
};
use serde_json::json;
use std::str::FromStr;

#[test]
fn test_role_wire_format() {
    assert_eq!(Role::from_str("volunteer"), Ok(Role::Volunteer));
    assert!(Role::from_str("Admin").is_err());
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    assert_eq!(Role::default(), Role::Donor);
    assert_eq!(AccountStatus::from_str("blocked"), Ok(AccountStatus::Blocked));
    assert!(AccountStatus::from_str("banned").is_err());
}

#[test]
fn test_stored_profile_defaults_missing_role_and_status() {
    let doc = json!({ "_id": "0123456789abcdef01234567", "email": "a@x.io", "bloodGroup": "O+" });
    let profile = parse_profile(doc.as_object().unwrap().clone()).unwrap();
    assert_eq!(
        profile,
        UserProfile {
            id: Some("0123456789abcdef01234567".to_string()),
            email: "a@x.io".to_string(),
            blood_group: Some("O+".to_string()),
            ..UserProfile::default()
        }
    );
}

#[test]
fn test_unknown_stored_role_is_an_upstream_error() {
    let doc = json!({ "email": "a@x.io", "role": "superuser" });
    let result = parse_profile(doc.as_object().unwrap().clone());
    assert!(matches!(result, Err(ApiError::Upstream(_))));
}

#[test]
fn test_list_query_window() {
    assert_eq!(ListQuery::default().window(), (0, DEFAULT_PAGE_SIZE));

    let query = ListQuery {
        page: Some(3),
        limit: Some(20),
        status: None,
    };
    assert_eq!(query.window(), (60, 20));

    let oversized = ListQuery {
        page: Some(1),
        limit: Some(10_000),
        status: None,
    };
    assert_eq!(oversized.window(), (MAX_PAGE_SIZE, MAX_PAGE_SIZE));

    let zero = ListQuery {
        page: None,
        limit: Some(0),
        status: None,
    };
    assert_eq!(zero.window(), (0, 1));
}

#[test]
fn test_minor_unit_conversion() {
    assert_eq!(to_minor_units(Some(12.5)).unwrap(), 1250);
    assert_eq!(to_minor_units(Some(0.1 + 0.2)).unwrap(), 30);
    assert_eq!(to_minor_units(Some(19.999)).unwrap(), 2000);

    for bad in [None, Some(0.0), Some(-5.0), Some(0.004), Some(f64::NAN), Some(f64::INFINITY)] {
        assert!(
            matches!(to_minor_units(bad), Err(ApiError::Validation(_))),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn test_fund_validation() {
    let valid = CreateFundRequest {
        amount: Some(10.0),
        name: Some("Payer".to_string()),
        date: Some("2026-01-01".to_string()),
        ..CreateFundRequest::default()
    };
    assert!(validate_fund(&valid).is_ok());

    let no_name = CreateFundRequest {
        name: Some("  ".to_string()),
        ..valid.clone()
    };
    assert!(matches!(validate_fund(&no_name), Err(ApiError::Validation(_))));

    let no_date = CreateFundRequest {
        date: None,
        ..valid.clone()
    };
    assert!(matches!(validate_fund(&no_date), Err(ApiError::Validation(_))));

    let negative = CreateFundRequest {
        amount: Some(-1.0),
        ..valid
    };
    assert!(matches!(validate_fund(&negative), Err(ApiError::Validation(_))));
}
