use chrono::NaiveDate;
use refdata::{
    Bitemporal, BitemporalStamp, CodeMapping, FailureCode, Ingestor, MappingType, MemoryStore,
    RefEntity, TranslateError, TranslationRequest, TranslationResolver, VersionStore, VersionWrite,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn seed(store: &MemoryStore<CodeMapping>, mapping: CodeMapping, from: NaiveDate) {
    let mut mapping = mapping;
    let key = mapping.natural_key();
    *mapping.stamp_mut() = BitemporalStamp::first(key, from, "seed", None);
    store.commit(VersionWrite::Create(mapping), vec![]).unwrap();
}

fn resolver_with_fixture() -> TranslationResolver<MemoryStore<CodeMapping>> {
    let store = MemoryStore::new();
    seed(
        &store,
        CodeMapping::record("ISO3166-1", "USA", "CBP-COUNTRY5", "US")
            .with_confidence(95)
            .deprecated("superseded by USX"),
        d(2015, 1, 1),
    );
    seed(
        &store,
        CodeMapping::record("ISO3166-1", "USA", "CBP-COUNTRY5", "USX").with_confidence(90),
        d(2022, 1, 1),
    );
    seed(
        &store,
        CodeMapping::record("ISO3166-1", "FRA", "CBP-COUNTRY5", "FR").with_confidence(100),
        d(2015, 1, 1),
    );
    seed(
        &store,
        CodeMapping::record("ISO3166-1", "DEU", "ICAO", "D")
            .with_confidence(70)
            .with_type(MappingType::Related),
        d(2015, 1, 1),
    );
    TranslationResolver::new(store)
}

#[test]
fn translate_picks_highest_confidence() {
    let resolver = resolver_with_fixture();
    // USA has two live mappings: 95 (deprecated) and 90. Confidence still
    // decides; deprecation is reported, not filtered.
    let hit = resolver
        .translate("ISO3166-1", "USA", "CBP-COUNTRY5", None)
        .unwrap()
        .unwrap();
    assert_eq!(hit.to_code, "US");
    assert_eq!(hit.confidence, 95);
}

#[test]
fn translate_as_of_past_date() {
    let resolver = resolver_with_fixture();
    // Before 2022 only the US mapping existed.
    let hit = resolver
        .translate("ISO3166-1", "USA", "CBP-COUNTRY5", Some(d(2020, 6, 1)))
        .unwrap()
        .unwrap();
    assert_eq!(hit.to_code, "US");

    assert!(resolver
        .translate("ISO3166-1", "USA", "CBP-COUNTRY5", Some(d(2010, 1, 1)))
        .unwrap()
        .is_none());
}

#[test]
fn check_deprecation_lists_alternatives() {
    let resolver = resolver_with_fixture();
    let report = resolver
        .check_deprecation("ISO3166-1", "USA", "CBP-COUNTRY5")
        .unwrap()
        .unwrap();

    assert!(report.is_deprecated);
    assert_eq!(report.mapping.to_code, "US");
    assert_eq!(report.deprecation_reason.as_deref(), Some("superseded by USX"));
    assert_eq!(report.alternative_codes, vec!["USX".to_string()]);
}

#[test]
fn check_deprecation_on_clean_mapping() {
    let resolver = resolver_with_fixture();
    let report = resolver
        .check_deprecation("ISO3166-1", "FRA", "CBP-COUNTRY5")
        .unwrap()
        .unwrap();
    assert!(!report.is_deprecated);
    assert!(report.alternative_codes.is_empty());
}

#[test]
fn reverse_translate_constrains_by_source_system() {
    let resolver = resolver_with_fixture();
    let hits = resolver
        .reverse_translate("CBP-COUNTRY5", "FR", None)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].from_code, "FRA");

    assert!(resolver
        .reverse_translate("CBP-COUNTRY5", "FR", Some("ICAO"))
        .unwrap()
        .is_empty());
}

#[test]
fn batch_partitions_successes_and_failures() {
    let resolver = resolver_with_fixture();
    let requests = vec![
        TranslationRequest::new("ISO3166-1", "FRA", "CBP-COUNTRY5"),
        TranslationRequest::new("ISO3166-1", "ZZZ", "CBP-COUNTRY5"),
        TranslationRequest::new("", "USA", "CBP-COUNTRY5"),
    ];

    let outcome = resolver.translate_batch(&requests, false).unwrap();
    assert_eq!(outcome.successes.len(), 1);
    assert_eq!(outcome.successes[0].mapping.to_code, "FR");

    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].code, FailureCode::NoMapping);
    assert_eq!(outcome.failures[1].code, FailureCode::ValidationFailed);
}

#[test]
fn batch_miss_is_soft_even_with_fail_fast() {
    let resolver = resolver_with_fixture();
    // NO_MAPPING is a soft failure, not an unexpected error; fail-fast only
    // aborts on infrastructure trouble.
    let requests = vec![TranslationRequest::new("ISO3166-1", "ZZZ", "CBP-COUNTRY5")];
    let outcome = resolver.translate_batch(&requests, true).unwrap();
    assert!(outcome.successes.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].code, FailureCode::NoMapping);
}

#[test]
fn batch_fail_fast_aborts_on_invalid_request() {
    let resolver = resolver_with_fixture();
    // Same rule as record ingest: fail-fast turns a validation failure into
    // a batch abort instead of a per-item entry.
    let requests = vec![
        TranslationRequest::new("ISO3166-1", "FRA", "CBP-COUNTRY5"),
        TranslationRequest::new("", "USA", "CBP-COUNTRY5"),
    ];
    let err = resolver.translate_batch(&requests, true).unwrap_err();
    assert!(matches!(err, TranslateError::Validation { .. }));
}

#[test]
fn list_code_systems_is_sorted_distinct() {
    let resolver = resolver_with_fixture();
    assert_eq!(
        resolver.list_code_systems().unwrap(),
        vec![
            "CBP-COUNTRY5".to_string(),
            "ICAO".to_string(),
            "ISO3166-1".to_string()
        ]
    );
}

#[test]
fn corrected_mapping_shadows_original_in_lookup() {
    let store = MemoryStore::new();
    seed(
        &store,
        CodeMapping::record("A", "1", "B", "2").with_confidence(50),
        d(2020, 1, 1),
    );

    // A steward corrects the confidence retroactively.
    let ingestor = Ingestor::new(store.clone(), "steward");
    ingestor
        .correct("A|1|B|2", None, |m: &mut CodeMapping| {
            m.confidence = 85;
        })
        .unwrap();

    let resolver = TranslationResolver::new(store);
    let hit = resolver.translate("A", "1", "B", None).unwrap().unwrap();
    assert_eq!(hit.confidence, 85);
    assert!(hit.stamp().is_correction);
}
