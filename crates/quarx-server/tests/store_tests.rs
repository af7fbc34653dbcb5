use quarx_server::store::{Store, StoreError, TEST_LICENSE_KEY};

const DAY: i64 = 86_400;
const NOW: i64 = 1_700_000_000;

fn mem_store() -> Store {
    Store::open_in_memory().unwrap()
}

#[test]
fn create_then_lookup_round_trips() {
    let store = mem_store();
    store.create("K1", "premium", NOW + 30 * DAY, NOW).unwrap();

    let rec = store.lookup("K1").unwrap();
    assert_eq!(rec.key, "K1");
    assert_eq!(rec.license_type, "premium");
    assert_eq!(rec.expires_at, NOW + 30 * DAY);
    assert_eq!(rec.created_at, NOW);
    assert!(!rec.is_used);
}

#[test]
fn duplicate_create_fails() {
    let store = mem_store();
    store.create("K1", "test", NOW + DAY, NOW).unwrap();
    let err = store.create("K1", "premium", NOW + 2 * DAY, NOW).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey));

    // The original record is untouched.
    let rec = store.lookup("K1").unwrap();
    assert_eq!(rec.license_type, "test");
    assert_eq!(rec.expires_at, NOW + DAY);
}

#[test]
fn lookup_unknown_key_is_not_found() {
    let store = mem_store();
    assert!(matches!(
        store.lookup("UNKNOWN").unwrap_err(),
        StoreError::NotFound
    ));
}

#[test]
fn validate_unknown_key_is_not_found() {
    let store = mem_store();
    assert!(matches!(
        store.validate("UNKNOWN", NOW).unwrap_err(),
        StoreError::NotFound
    ));
}

#[test]
fn validate_touches_last_checked() {
    let store = mem_store();
    store.create("K1", "test", NOW + 30 * DAY, NOW).unwrap();

    let rec = store.validate("K1", NOW + 100).unwrap();
    assert_eq!(rec.last_checked_at, Some(NOW + 100));
    assert_eq!(rec.days_remaining(NOW + 100), 29);

    // The touch is persisted, not just returned.
    let rec = store.lookup("K1").unwrap();
    assert_eq!(rec.last_checked_at, Some(NOW + 100));
}

#[test]
fn validate_expired_fails_and_leaves_record_untouched() {
    let store = mem_store();
    store.create("K1", "test", NOW - DAY, NOW - 10 * DAY).unwrap();

    let err = store.validate("K1", NOW).unwrap_err();
    assert!(matches!(err, StoreError::Expired));

    let rec = store.lookup("K1").unwrap();
    assert_eq!(rec.last_checked_at, None);
}

#[test]
fn activate_binds_user_and_hardware() {
    let store = mem_store();
    store.create("K1", "premium", NOW + 30 * DAY, NOW).unwrap();

    let rec = store
        .activate("K1", Some("alice"), Some("HW1"), NOW + 5)
        .unwrap();
    assert!(rec.is_used);
    assert_eq!(rec.used_by.as_deref(), Some("alice"));
    assert_eq!(rec.hardware_id.as_deref(), Some("HW1"));
    assert_eq!(rec.last_checked_at, Some(NOW + 5));
}

#[test]
fn activate_without_username_records_unknown() {
    let store = mem_store();
    store.create("K1", "test", NOW + DAY, NOW).unwrap();

    let rec = store.activate("K1", None, Some("HW1"), NOW).unwrap();
    assert_eq!(rec.used_by.as_deref(), Some("unknown"));
}

#[test]
fn reactivation_succeeds_and_last_write_wins() {
    let store = mem_store();
    store.create("K1", "test", NOW + 30 * DAY, NOW).unwrap();

    store.activate("K1", Some("alice"), Some("HW1"), NOW).unwrap();
    let rec = store
        .activate("K1", Some("bob"), Some("HW2"), NOW + 10)
        .unwrap();
    assert!(rec.is_used);
    assert_eq!(rec.used_by.as_deref(), Some("bob"));
    assert_eq!(rec.hardware_id.as_deref(), Some("HW2"));
}

#[test]
fn activate_expired_fails() {
    let store = mem_store();
    store.create("K1", "test", NOW - 1, NOW - 10 * DAY).unwrap();
    assert!(matches!(
        store.activate("K1", Some("alice"), None, NOW).unwrap_err(),
        StoreError::Expired
    ));
}

#[test]
fn lookup_reports_expired_keys_with_negative_days() {
    let store = mem_store();
    store.create("K1", "test", NOW - 2 * DAY, NOW - 10 * DAY).unwrap();

    // Status is a plain lookup: no expiry enforcement, negative remaining days.
    let rec = store.lookup("K1").unwrap();
    assert!(rec.is_expired(NOW));
    assert_eq!(rec.days_remaining(NOW), -2);
}

#[test]
fn seed_test_license_is_idempotent() {
    let store = mem_store();
    let first = store.seed_test_license(NOW).unwrap();
    assert_eq!(first.key, TEST_LICENSE_KEY);
    assert_eq!(first.license_type, "test");
    assert_eq!(first.expires_at, NOW + 30 * DAY);

    // Re-seeding later returns the existing record unchanged.
    let again = store.seed_test_license(NOW + 5 * DAY).unwrap();
    assert_eq!(again.expires_at, first.expires_at);
}

#[test]
fn seed_does_not_reset_activation_state() {
    let store = mem_store();
    store.seed_test_license(NOW).unwrap();
    store
        .activate(TEST_LICENSE_KEY, Some("alice"), Some("HW1"), NOW)
        .unwrap();

    let rec = store.seed_test_license(NOW + DAY).unwrap();
    assert!(rec.is_used);
    assert_eq!(rec.used_by.as_deref(), Some("alice"));
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("quarx.db");

    {
        let store = Store::open(&db_path).unwrap();
        store.create("K1", "premium", NOW + 30 * DAY, NOW).unwrap();
        store.activate("K1", Some("alice"), Some("HW1"), NOW).unwrap();
    }

    let store = Store::open(&db_path).unwrap();
    let rec = store.lookup("K1").unwrap();
    assert_eq!(rec.license_type, "premium");
    assert!(rec.is_used);
    assert_eq!(rec.used_by.as_deref(), Some("alice"));
    assert_eq!(rec.hardware_id.as_deref(), Some("HW1"));
}
