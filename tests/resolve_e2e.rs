//! End-to-end resolution through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use country_norm::{
    delete_alias, resolve, set_alias, AliasEntry, AliasSnapshot, AliasStore, InMemoryAliasStore,
    InputError, NormError, Resolution, Resolver, ResolverConfig, StorageError,
};

fn scenario_store() -> InMemoryAliasStore {
    let store = InMemoryAliasStore::new();
    set_alias(&store, "Russia", "Russia", 1).unwrap();
    set_alias(&store, "Moscow", "Russia", 2).unwrap();
    set_alias(&store, "Deutschland", "Germany", 1).unwrap();
    set_alias(&store, "Germany", "Germany", 1).unwrap();
    set_alias(&store, "Berlin", "Germany", 2).unwrap();
    store
}

/// Counts snapshot calls and fails every one of them.
#[derive(Default)]
struct FailingStore {
    reads: AtomicUsize,
}

impl AliasStore for FailingStore {
    fn put(&self, _key: String, _entry: AliasEntry) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk on fire".into()))
    }

    fn remove(&self, _key: &str) -> Result<bool, StorageError> {
        Err(StorageError::Backend("disk on fire".into()))
    }

    fn get(&self, _key: &str) -> Result<Option<AliasEntry>, StorageError> {
        Err(StorageError::Backend("disk on fire".into()))
    }

    fn len(&self) -> Result<usize, StorageError> {
        Err(StorageError::Backend("disk on fire".into()))
    }

    fn snapshot(&self) -> Result<AliasSnapshot, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Backend("disk on fire".into()))
    }
}

#[test]
fn test_resolves_known_names() {
    let store = scenario_store();

    let exact = resolve(&store, "Russia", 0.7).unwrap();
    assert_eq!(exact.canonical_name(), Some("Russia"));

    let typo = resolve(&store, "Rusia", 0.7).unwrap();
    assert_eq!(typo.canonical_name(), Some("Russia"));

    let native = resolve(&store, "DEUTSCHLAND!", 0.7).unwrap();
    assert_eq!(native.canonical_name(), Some("Germany"));
}

#[test]
fn test_unknown_name_is_not_an_error() {
    let store = scenario_store();
    assert_eq!(resolve(&store, "Atlantis", 0.7).unwrap(), Resolution::NotFound);
}

#[test]
fn test_cutoff_controls_capital_match() {
    let store = scenario_store();

    assert_eq!(resolve(&store, "moskva", 0.7).unwrap(), Resolution::NotFound);

    let loose = resolve(&store, "moskva", 0.45).unwrap();
    assert_eq!(loose.canonical_name(), Some("Russia"));
    assert_eq!(loose.tier(), Some(2));
}

#[test]
fn test_every_key_resolves_to_itself() {
    let store = scenario_store();
    let snapshot = store.snapshot().unwrap();

    for (alias, entry) in snapshot.iter() {
        let resolution = resolve(&store, alias, 0.7).unwrap();
        let Resolution::Found(found) = resolution else {
            panic!("{alias} did not resolve");
        };
        assert_eq!(found.alias, alias);
        assert_eq!(found.canonical_name, entry.canonical_name);
        assert!((found.ratio - 1.0).abs() < f64::EPSILON);
    }
}

#[test]
fn test_long_alias_resolves_to_itself() {
    let store = InMemoryAliasStore::new();
    let key = "abcdefghij".repeat(25);
    set_alias(&store, &key, "Repetitia", 1).unwrap();
    set_alias(&store, "russia", "Russia", 1).unwrap();

    let Resolution::Found(found) = resolve(&store, &key, 0.7).unwrap() else {
        panic!("250-char alias did not resolve");
    };
    assert_eq!(found.alias, key);
    assert_eq!(found.canonical_name, "Repetitia");
    assert_eq!(found.tier, 1);
    assert!((found.ratio - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_out_of_range_cutoff_is_invalid_parameter() {
    let store = scenario_store();
    for dif_acc in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
        let err = resolve(&store, "Russia", dif_acc).unwrap_err();
        assert!(err.is_invalid_parameter(), "{dif_acc} gave {err}");
    }
}

#[test]
fn test_blank_names_are_invalid_input() {
    let store = scenario_store();

    let err = resolve(&store, "   ", 0.7).unwrap_err();
    assert!(matches!(err, NormError::InvalidInput(InputError::Empty)));

    let err = resolve(&store, "1234 !!", 0.7).unwrap_err();
    assert!(matches!(
        err,
        NormError::InvalidInput(InputError::EmptyAfterSanitize { .. })
    ));
}

#[test]
fn test_validation_happens_before_store_access() {
    let store = FailingStore::default();

    assert!(resolve(&store, "", 0.7).unwrap_err().is_invalid_input());
    assert!(resolve(&store, "Russia", 2.0).unwrap_err().is_invalid_parameter());
    assert!(set_alias(&store, "", "Russia", 1).unwrap_err().is_invalid_input());
    assert!(set_alias(&store, "Russia", "Russia", 3).unwrap_err().is_invalid_input());
    assert!(delete_alias(&store, "").unwrap_err().is_invalid_input());

    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_storage_failure_is_database_error() {
    let store = FailingStore::default();

    let err = resolve(&store, "Russia", 0.7).unwrap_err();
    assert!(err.is_database());
    assert!(!err.is_retryable());
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    assert!(set_alias(&store, "Russia", "Russia", 1).unwrap_err().is_database());
}

#[test]
fn test_delete_then_resolve() {
    let store = scenario_store();

    assert!(delete_alias(&store, "BERLIN").unwrap());
    assert!(!delete_alias(&store, "berlin").unwrap());
    assert_eq!(store.get("berlin").unwrap(), None);

    assert_eq!(resolve(&store, "Berlin", 0.7).unwrap(), Resolution::NotFound);

    set_alias(&store, "Berlin", "Germany", 2).unwrap();
    let back = resolve(&store, "Berlin", 0.7).unwrap();
    assert_eq!(back.canonical_name(), Some("Germany"));
    assert_eq!(back.tier(), Some(2));
}

#[test]
fn test_overwrite_changes_answer() {
    let store = scenario_store();
    set_alias(&store, "moscow", "Muscovy", 2).unwrap();

    let found = resolve(&store, "Moscow", 0.7).unwrap();
    assert_eq!(found.canonical_name(), Some("Muscovy"));
}

#[test]
fn test_resolver_handle() {
    let store: Arc<dyn AliasStore> = Arc::new(InMemoryAliasStore::new());
    let resolver = Resolver::with_config(store, ResolverConfig { dif_acc: 0.45 }).unwrap();

    resolver.set_alias("Moscow", "Russia", 2).unwrap();
    assert_eq!(resolver.store().len().unwrap(), 1);
    assert_eq!(
        resolver.resolve("moskva").unwrap().canonical_name(),
        Some("Russia")
    );
    assert_eq!(resolver.resolve_with("moskva", 0.7).unwrap(), Resolution::NotFound);

    assert!(resolver.delete_alias("moscow").unwrap());
    assert_eq!(resolver.resolve("Moscow").unwrap(), Resolution::NotFound);
}

#[test]
fn test_resolver_rejects_bad_config() {
    let store: Arc<dyn AliasStore> = Arc::new(InMemoryAliasStore::new());
    let err = Resolver::with_config(store, ResolverConfig { dif_acc: 1.0 }).unwrap_err();
    assert!(err.is_invalid_parameter());
}
