use aptward_catalog::{template, ErrorCatalog, ErrorCode, BUILTIN_SIGNATURES};
use std::collections::HashSet;

fn sample_params(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("pkg{i}-1.0")).collect()
}

#[test]
fn every_signature_matches_its_own_instantiation() {
    let catalog = ErrorCatalog::builtin();
    for sig in BUILTIN_SIGNATURES {
        if sig.pattern.ends_with(' ') {
            // Trailing-space templates cannot match a trimmed line.
            continue;
        }
        let params = sample_params(sig.params);
        let line = template::render(sig.pattern, &params, sig.params);
        let matched = catalog
            .match_line(&line)
            .unwrap_or_else(|| panic!("no match for {line:?}"));
        assert_eq!(matched.signature(), sig, "{line:?} shadowed");
        assert_eq!(matched.params(), params.as_slice(), "{line:?}");
    }
}

#[test]
fn every_code_has_a_signature() {
    let registered: HashSet<_> = BUILTIN_SIGNATURES.iter().map(|s| s.code.number()).collect();
    assert_eq!(registered.len(), 113);
    assert!((1..=113).all(|n| registered.contains(&n)));
}

#[test]
fn placeholder_counts_agree_with_templates() {
    for sig in BUILTIN_SIGNATURES {
        assert_eq!(
            template::placeholder_count(sig.pattern),
            sig.params,
            "{}",
            sig.pattern
        );
        assert_eq!(
            template::placeholder_count(sig.message),
            sig.params,
            "{}",
            sig.message
        );
    }
}

#[test]
fn codes_are_numbered_from_one() {
    assert_eq!(ErrorCode::BrokenPackages.number(), 1);
    assert_eq!(ErrorCode::RpmDatabaseLock.number(), 57);
    assert_eq!(ErrorCode::ConflictsViolated.number(), 59);
    assert_eq!(ErrorCode::VirtualNameMultipleProvidersExact.number(), 113);
}

#[test]
fn match_all_preserves_line_order() {
    let log = "\
Reading Package Lists...
E: Couldn't find package foo

E: Broken packages
Done
E: Some files failed to download";
    let found = ErrorCatalog::builtin().match_all(log.lines());
    let codes: Vec<_> = found.iter().map(|e| e.code()).collect();
    assert_eq!(
        codes,
        [
            ErrorCode::PackageNotFound,
            ErrorCode::BrokenPackages,
            ErrorCode::DownloadFailed
        ]
    );
    assert_eq!(found[0].params(), ["foo"]);
}

#[test]
fn match_all_on_clean_log_is_empty() {
    let found = ErrorCatalog::builtin().match_all(["Reading Package Lists...", "", "Done"]);
    assert!(found.is_empty());
}

#[test]
fn classify_returns_first_match_only() {
    let text = "E: Unable to correct missing packages\nE: Aborting Install";
    let classified = ErrorCatalog::builtin().classify(text).unwrap();
    assert_eq!(classified.code(), ErrorCode::CorrectMissingFailed);
}

#[test]
fn classify_skips_unrecognized_lines() {
    let text = "something odd happened\nE: Broken packages";
    let classified = ErrorCatalog::builtin().classify(text).unwrap();
    assert_eq!(classified.code(), ErrorCode::BrokenPackages);
}

#[test]
fn classify_unknown_text_is_none() {
    assert!(ErrorCatalog::builtin().classify("segmentation fault").is_none());
    assert!(ErrorCatalog::builtin().classify("").is_none());
}

#[test]
fn provider_listing_is_appended_without_hint() {
    let text = "\
Virtual package mta has multiple providers. Please select specific package.
  postfix
  exim
  sendmail
You should explicitly select one to install.";
    let classified = ErrorCatalog::builtin().classify(text).unwrap();
    assert_eq!(classified.code(), ErrorCode::VirtualMultipleProvidersNeedSelect);
    assert_eq!(classified.params(), ["mta", "postfix\nexim\nsendmail"]);
    assert_eq!(
        classified.to_string(),
        "Virtual package mta has multiple providers. Please select specific package."
    );
}

#[test]
fn provider_listing_needs_more_than_one_following_line() {
    let text = "Package mta is a virtual package with multiple good providers\n  postfix";
    let classified = ErrorCatalog::builtin().classify(text).unwrap();
    assert_eq!(classified.code(), ErrorCode::VirtualMultipleProviders);
    assert_eq!(classified.params(), ["mta"]);
}

#[test]
fn non_selection_errors_ignore_following_lines() {
    let text = "Couldn't find package foo\nbar\nbaz";
    let classified = ErrorCatalog::builtin().classify(text).unwrap();
    assert_eq!(classified.params(), ["foo"]);
}

#[test]
fn benign_and_stale_index_flags() {
    let catalog = ErrorCatalog::builtin();
    let newest = catalog.match_line("vim is already the newest version.").unwrap();
    assert_eq!(newest.code(), ErrorCode::PackageIsAlreadyNewest);
    assert!(!newest.is_critical());

    let removed = catalog
        .match_line("Package vim is not installed, so not removed")
        .unwrap();
    assert!(!removed.is_critical());

    let index = catalog
        .match_line(
            "Some index files failed to download. They have been ignored, or old ones used instead.",
        )
        .unwrap();
    assert!(index.is_critical());
    assert!(index.needs_refresh());
}
