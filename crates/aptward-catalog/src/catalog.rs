use crate::classified::ClassifiedError;
use crate::code::ErrorCode as C;
use crate::signature::ErrorSignature;
use crate::template;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Prefixes the tool puts in front of diagnostic lines.
pub const LINE_PREFIXES: &[&str] = &["E: "];

/// Continuation lines starting with this are advice, not part of a listing.
pub const HINT_PREFIX: &str = "You should";

const fn sig(code: C, pattern: &'static str, params: usize) -> ErrorSignature {
    ErrorSignature::new(code, pattern, params)
}

/// Built-in signatures, in match order. A template that is a string prefix
/// of another (e.g. the "...with no " variants) must come after it.
pub static BUILTIN_SIGNATURES: &[ErrorSignature] = &[
    sig(C::BrokenPackages, "Broken packages", 0),
    sig(C::PermissionDenied, "You have no permissions for that", 0),
    sig(C::InternalBrokenPackages, "Internal Error, InstallPackages was called with broken packages!", 0),
    sig(C::RemoveDisabled, "Packages need to be removed but Remove is disabled.", 0),
    sig(C::LockDownloadDir, "Unable to lock the download directory", 0),
    sig(C::YWithoutForceYes, "There are problems and -y was used without --force-yes", 0),
    sig(C::NotEnoughSpace, "You don't have enough free space in %s", 1),
    sig(C::PackageFileOutOfSync, "Package file %s is out of sync", 1),
    sig(C::TrivialOnly, "Trivial Only specified but this is not a trivial operation", 0),
    sig(C::OperationCancelled, "Operation cancelled", 0),
    sig(C::MissingBuilddepPackage, "Must specify at least one package to check builddeps for", 0),
    sig(C::SourcePackageNotFound, "Unable to find a source package for %s", 1),
    sig(C::BuilddepInfoFailed, "Unable to get build-dependency information for %s", 1),
    sig(C::BuilddepBrokenPackages, "Some broken packages were found while trying to process build-dependencies for %s.", 1),
    sig(C::VirtualNoProviders, "Package %s is a virtual package with no good providers", 1),
    sig(C::VirtualMultipleProviders, "Package %s is a virtual package with multiple good providers", 1),
    sig(C::NoPackagesFound, "No packages found", 0),
    sig(C::PackageNotInstalled, "Package %s is not installed, so not removed", 1),
    sig(C::ReleaseNotFound, "Release %s'%s' for '%s' was not found", 3),
    sig(C::VersionNotFound, "Version %s'%s' for '%s' was not found", 3),
    sig(C::SourcesListReadFailed, "Sources list %s could not be read", 1),
    sig(C::SourcesListMissing, "Sources list %s doesn't exist", 1),
    sig(C::ExcessiveArguments, "Excessive arguments", 0),
    sig(C::ResolverBroken, "Internal Error, problem resolver broke stuff", 0),
    sig(C::OrderingFailed, "Internal Error, Ordering didn't finish", 0),
    sig(C::DownloadFailed, "Some files failed to download", 0),
    sig(C::FetchArchivesFailed, "Unable to fetch some archives, maybe run apt-get update or try with --fix-missing?", 0),
    sig(C::FixMissingUnsupported, "--fix-missing and media swapping is not currently supported", 0),
    sig(C::CorrectMissingFailed, "Unable to correct missing packages", 0),
    sig(C::AbortingInstall, "Aborting Install", 0),
    sig(C::RpmDatabaseLock, "Could not open RPM database", 0),
    sig(C::ParseNameFailed, "Couldn't parse name '%s'", 1),
    sig(C::WriteStdoutFailed, "Write to stdout failed", 0),
    sig(C::MaxArgumentsExceeded, "Exceeded maximum number of command arguments", 0),
    sig(C::DependencyUnsatisfied, "Package %s dependency for %s cannot be satisfied because the package %s cannot be found", 3),
    sig(C::RegexCompilationError, "Regex compilation error - %s", 1),
    sig(C::NoInstallationCandidate, "Package %s has no installation candidate", 1),
    sig(C::InternalAllUpgrade, "Internal Error, AllUpgrade broke stuff", 0),
    sig(C::RequestedAutoremoveFailed, "Requested autoremove failed.", 0),
    sig(C::PackageNotFound, "Couldn't find package %s", 1),
    sig(C::DependencyCannotBeSatisfied, "%s dependency for %s cannot be satisfied", 2),
    sig(C::FailedDependencyTooNew, "Failed to satisfy %s dependency for %s: Installed package %s is too new", 3),
    sig(C::FailedDependency, "Failed to satisfy %s dependency for %s: %s", 3),
    sig(C::GiveOnePattern, "You must give exactly one pattern", 0),
    sig(C::NoHelpForThat, "No help for that", 0),
    sig(C::PackageIsAlreadyNewest, "%s is already the newest version.", 1),
    sig(C::SourcesListReadFailed, "The list of sources could not be read.", 0),
    sig(C::ChangesToBeMade, "There are changes to be made", 0),
    sig(C::FailedToFetchArchives, "Failed to fetch some archives.", 0),
    sig(C::FailedToFetch, "Failed to fetch %s  %s", 2),
    sig(C::FailedToFetchSomeIndex, "Some index files failed to download. They have been ignored, or old ones used instead.", 0),
    sig(C::UpgradeDisabled, "'apt-get upgrade' is disabled because it can leave system in a broken state.", 0),
    sig(C::UnmetDependencies, "Unmet dependencies. Try 'apt-get --fix-broken install' with no packages (or specify a solution).", 0),
    sig(C::MissingFetchSourcePackage, "Must specify at least one package to fetch source for", 0),
    sig(C::ConflictsViolated, "Fatal, conflicts violated %s", 1).rendered_as("Fatal: conflicts violated %s"),
    sig(C::ChildProcessFailed, "Child process failed", 0),
    sig(C::MissingChangelogPackage, "Must specify at least one package to get changelog for", 0),
    sig(C::ProcessBuildDependencies, "Failed to process build dependencies", 0),
    sig(C::VirtualNoProvidersShort, "Package %s is a virtual package with no ", 1),
    sig(C::VirtualMultipleProvidersShort, "Package %s is a virtual package with multiple ", 1),
    // Binding layer.
    sig(C::AptInitConfigFailed, "Failed to initialize APT configuration", 0),
    sig(C::InvalidSystemPointer, "Invalid system pointer", 0),
    sig(C::AptInitSystemFailed, "Failed to initialize APT system", 0),
    sig(C::InvalidArgsCacheOpen, "Invalid arguments for cache_open", 0),
    sig(C::SystemNotInitialized, "System not properly initialized", 0),
    sig(C::AptLockFailed, "Unable to acquire APT system lock - another process may be using APT", 0),
    sig(C::CacheOpenFailed, "Failed to open APT cache", 0),
    sig(C::CheckDepsFailed, "Failed to check dependencies", 0),
    sig(C::GetDepCacheFailed, "Failed to get dependency cache", 0),
    sig(C::CacheReopenFailed, "Failed to reopen cache after refresh", 0),
    sig(C::CheckDepsAfterRefreshFailed, "Failed to check dependencies after refresh", 0),
    sig(C::GetDepCacheAfterRefreshFailed, "Failed to get dependency cache after refresh", 0),
    sig(C::GetPackageIndexesFailed, "Failed to get package indexes", 0),
    sig(C::DownloadPackageListsFailed, "Failed to download package lists", 0),
    sig(C::RebuildCachesFailed, "Failed to rebuild caches", 0),
    sig(C::InvalidCacheForPm, "Invalid cache or output pointer for pm create", 0),
    sig(C::CreatePackageManagerFailed, "Failed to create package manager", 0),
    sig(C::InvalidArgsMarkInstall, "Invalid arguments for mark_install", 0),
    sig(C::InvalidArgsMarkRemove, "Invalid arguments for mark_remove", 0),
    sig(C::ResolverRemoveDepsFailed, "Problem resolver failed to handle package removal dependencies", 0),
    sig(C::InvalidArgsMarkKeep, "Invalid arguments for mark_keep", 0),
    sig(C::InvalidArgsMarkAuto, "Invalid arguments for mark_auto", 0),
    sig(C::InvalidPmInstance, "Invalid package manager instance", 0),
    sig(C::CannotInstallWithBrokenDeps, "Cannot install packages with broken dependencies", 0),
    sig(C::GetPackageArchivesFailed, "Failed to get package archives", 0),
    sig(C::DownloadPackagesFailed, "Failed to download packages", 0),
    sig(C::PmOperationFailed, "Package manager operation failed", 0),
    sig(C::PmOperationIncomplete, "Package manager operation incomplete", 0),
    sig(C::PmUnknownResult, "Unknown package manager result", 0),
    sig(C::UpdatePackageMarksFailed, "Failed to update package marks", 0),
    sig(C::InvalidCacheForDistUpgrade, "Invalid cache for dist upgrade", 0),
    sig(C::DistUpgradeFailed, "Distribution upgrade failed", 0),
    sig(C::CreatePmForDistUpgradeFailed, "Failed to create package manager for dist upgrade", 0),
    sig(C::GetArchivesForDistUpgradeFailed, "Failed to get package archives for dist upgrade", 0),
    sig(C::DownloadPackagesForDistUpgradeFailed, "Failed to download packages for dist upgrade", 0),
    sig(C::UpdateMarksAfterDistUpgradeFailed, "Failed to update package marks after dist upgrade", 0),
    sig(C::InvalidParametersForSearch, "Invalid parameters for search", 0),
    sig(C::RegexCompilationError, "Failed to compile regex pattern", 0),
    sig(C::CreatePackageRecordsParserFailed, "Failed to create package records parser", 0),
    sig(C::AllocSearchResultsFailed, "Failed to allocate memory for search results", 0),
    sig(C::UnknownExceptionInSearch, "Unknown exception in search", 0),
    sig(C::InvalidParametersForGetInfo, "Invalid parameters for get_package_info", 0),
    sig(C::InvalidParametersForSimulation, "Invalid parameters for simulation", 0),
    sig(C::CacheFileNotAvailable, "Cache file not available", 0),
    sig(C::InvalidParametersForMultiSimulation, "Invalid parameters for multi-package simulation", 0),
    sig(C::VirtualNoInstallableProviders, "Virtual package %s has no installable providers", 1),
    sig(C::VirtualMultipleProvidersNeedSelect, "Virtual package %s has multiple providers. Please select specific package.", 1),
    sig(C::PackageNotFound, "Package not found: %s", 1),
    sig(C::PackageIsNotInstalled, "Package is not installed: %s", 1),
    sig(C::VirtualNoInstalledProviders, "Package %s has no installed providers", 1),
    sig(C::VirtualMultipleInstalledProviders, "Virtual package %s has multiple installed providers: %s. Please remove specific package.", 2),
    sig(C::DistUpgradeSimulationFailed, "Dist upgrade simulation failed: %s", 1),
    sig(C::MultiInstallSimulationFailed, "Multi-package install simulation failed: %s", 1),
    sig(C::MultiRemoveSimulationFailed, "Multi-package remove simulation failed: %s", 1),
    sig(C::CombinedSimulationFailed, "Combined simulation failed: %s", 1),
    sig(C::VirtualNameMultipleProvidersExact, "Virtual name '%s' has multiple providers; specify exact package name", 1),
];

static BUILTIN: LazyLock<ErrorCatalog> =
    LazyLock::new(|| ErrorCatalog::from_signatures(BUILTIN_SIGNATURES.iter().copied()));

struct CompiledSignature {
    signature: ErrorSignature,
    matcher: Regex,
}

/// Ordered, first-match-wins table of diagnostic signatures.
pub struct ErrorCatalog {
    entries: Vec<CompiledSignature>,
}

impl ErrorCatalog {
    /// The process-wide catalog built from [`BUILTIN_SIGNATURES`].
    pub fn builtin() -> &'static ErrorCatalog {
        &BUILTIN
    }

    /// Build a catalog, keeping the given order. Templates that fail to
    /// compile are skipped.
    pub fn from_signatures(signatures: impl IntoIterator<Item = ErrorSignature>) -> Self {
        let mut entries = Vec::new();
        for signature in signatures {
            match template::compile(signature.pattern) {
                Ok(matcher) => entries.push(CompiledSignature { signature, matcher }),
                Err(e) => warn!(
                    "skipping signature {} ('{}'): {e}",
                    signature.code, signature.pattern
                ),
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn signatures(&self) -> impl Iterator<Item = &ErrorSignature> {
        self.entries.iter().map(|e| &e.signature)
    }

    /// Match one line against the catalog. The whole trimmed line must match.
    pub fn match_line(&self, text: &str) -> Option<ClassifiedError> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.entries.iter().find_map(|entry| {
            entry.matcher.captures(text).map(|caps| {
                let params = caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().to_owned())
                    .collect();
                ClassifiedError::new(entry.signature, params)
            })
        })
    }

    /// Classify every non-blank line independently, preserving order.
    pub fn match_all<I, S>(&self, lines: I) -> Vec<ClassifiedError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let found: Vec<_> = lines
            .into_iter()
            .filter_map(|line| self.match_line(strip_prefix(line.as_ref())))
            .collect();
        if !found.is_empty() {
            debug!("matched {} diagnostic lines", found.len());
        }
        found
    }

    /// Classify a returned error text as one primary diagnostic.
    ///
    /// Returns the first matching line. When that line announces several
    /// candidate providers, the listing that follows it (minus blank lines and
    /// hint lines) is appended as one extra newline-joined param.
    pub fn classify(&self, text: &str) -> Option<ClassifiedError> {
        let lines: Vec<&str> = text.lines().collect();
        let (index, mut matched) = lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| self.match_line(strip_prefix(line)).map(|m| (i, m)))?;

        let following = &lines[index + 1..];
        if matched.code().requires_selection() && following.len() > 1 {
            let listing: Vec<&str> = following
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty() && !l.starts_with(HINT_PREFIX))
                .collect();
            if !listing.is_empty() {
                matched.push_param(listing.join("\n"));
            }
        }
        Some(matched)
    }
}

fn strip_prefix(line: &str) -> &str {
    let line = line.trim();
    LINE_PREFIXES
        .iter()
        .find_map(|p| line.strip_prefix(p))
        .unwrap_or(line)
}
