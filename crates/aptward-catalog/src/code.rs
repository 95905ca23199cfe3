use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a diagnostic signature.
///
/// The numeric value (`number()`) follows registration order starting at 1 and
/// must never be reordered: external callers persist it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    BrokenPackages = 1,
    PermissionDenied,
    InternalBrokenPackages,
    RemoveDisabled,
    LockDownloadDir,
    YWithoutForceYes,
    NotEnoughSpace,
    PackageFileOutOfSync,
    TrivialOnly,
    OperationCancelled,
    MissingBuilddepPackage,
    SourcePackageNotFound,
    BuilddepInfoFailed,
    BuilddepBrokenPackages,
    VirtualNoProviders,
    VirtualMultipleProviders,
    NoPackagesFound,
    PackageNotInstalled,
    ReleaseNotFound,
    VersionNotFound,
    SourcesListReadFailed,
    SourcesListMissing,
    ExcessiveArguments,
    ResolverBroken,
    OrderingFailed,
    DownloadFailed,
    FetchArchivesFailed,
    FixMissingUnsupported,
    CorrectMissingFailed,
    AbortingInstall,
    ParseNameFailed,
    WriteStdoutFailed,
    MaxArgumentsExceeded,
    DependencyUnsatisfied,
    RegexCompilationError,
    NoInstallationCandidate,
    InternalAllUpgrade,
    RequestedAutoremoveFailed,
    PackageNotFound,
    DependencyCannotBeSatisfied,
    FailedDependencyTooNew,
    FailedDependency,
    GiveOnePattern,
    NoHelpForThat,
    ChangesToBeMade,
    FailedToFetchArchives,
    FailedToFetch,
    FailedToFetchSomeIndex,
    UpgradeDisabled,
    UnmetDependencies,
    MissingFetchSourcePackage,
    ChildProcessFailed,
    MissingChangelogPackage,
    ProcessBuildDependencies,
    VirtualNoProvidersShort,
    VirtualMultipleProvidersShort,
    RpmDatabaseLock,
    PackageIsAlreadyNewest,
    ConflictsViolated,
    // Messages produced by the tool's native binding layer.
    AptInitConfigFailed,
    InvalidSystemPointer,
    AptInitSystemFailed,
    InvalidArgsCacheOpen,
    SystemNotInitialized,
    AptLockFailed,
    CacheOpenFailed,
    CheckDepsFailed,
    GetDepCacheFailed,
    CacheReopenFailed,
    CheckDepsAfterRefreshFailed,
    GetDepCacheAfterRefreshFailed,
    GetPackageIndexesFailed,
    DownloadPackageListsFailed,
    RebuildCachesFailed,
    InvalidCacheForPm,
    CreatePackageManagerFailed,
    InvalidArgsMarkInstall,
    InvalidArgsMarkRemove,
    ResolverRemoveDepsFailed,
    InvalidArgsMarkKeep,
    InvalidArgsMarkAuto,
    InvalidPmInstance,
    CannotInstallWithBrokenDeps,
    GetPackageArchivesFailed,
    DownloadPackagesFailed,
    PmOperationFailed,
    PmOperationIncomplete,
    PmUnknownResult,
    UpdatePackageMarksFailed,
    InvalidCacheForDistUpgrade,
    DistUpgradeFailed,
    CreatePmForDistUpgradeFailed,
    GetArchivesForDistUpgradeFailed,
    DownloadPackagesForDistUpgradeFailed,
    UpdateMarksAfterDistUpgradeFailed,
    InvalidParametersForSearch,
    CreatePackageRecordsParserFailed,
    AllocSearchResultsFailed,
    UnknownExceptionInSearch,
    InvalidParametersForGetInfo,
    InvalidParametersForSimulation,
    CacheFileNotAvailable,
    InvalidParametersForMultiSimulation,
    VirtualNoInstallableProviders,
    VirtualMultipleProvidersNeedSelect,
    PackageIsNotInstalled,
    VirtualNoInstalledProviders,
    VirtualMultipleInstalledProviders,
    DistUpgradeSimulationFailed,
    MultiInstallSimulationFailed,
    MultiRemoveSimulationFailed,
    CombinedSimulationFailed,
    VirtualNameMultipleProvidersExact,
}

/// Coarse origin of a diagnostic, used for grouping in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    UserInput,
    Dependency,
    Download,
    Storage,
    Binding,
}

impl ErrorCode {
    pub fn number(self) -> u16 {
        self as u16
    }

    /// Benign outcomes that callers treat as a no-op rather than a failure.
    pub fn is_critical(self) -> bool {
        !matches!(
            self,
            ErrorCode::PackageNotInstalled | ErrorCode::PackageIsAlreadyNewest
        )
    }

    /// The local package index is stale; refresh and retry.
    pub fn needs_refresh(self) -> bool {
        matches!(
            self,
            ErrorCode::FailedToFetchArchives
                | ErrorCode::FailedToFetch
                | ErrorCode::FailedToFetchSomeIndex
        )
    }

    /// The tool listed several candidates and wants the user to pick one.
    /// The listing follows the primary line.
    pub fn requires_selection(self) -> bool {
        matches!(
            self,
            ErrorCode::VirtualMultipleProviders
                | ErrorCode::VirtualMultipleProvidersShort
                | ErrorCode::VirtualMultipleProvidersNeedSelect
                | ErrorCode::VirtualNameMultipleProvidersExact
        )
    }

    pub fn source(self) -> ErrorSource {
        use ErrorCode as C;
        match self {
            C::YWithoutForceYes
            | C::TrivialOnly
            | C::OperationCancelled
            | C::MissingBuilddepPackage
            | C::SourcePackageNotFound
            | C::NoPackagesFound
            | C::PackageNotInstalled
            | C::ReleaseNotFound
            | C::VersionNotFound
            | C::ExcessiveArguments
            | C::ParseNameFailed
            | C::MaxArgumentsExceeded
            | C::RegexCompilationError
            | C::PackageNotFound
            | C::GiveOnePattern
            | C::NoHelpForThat
            | C::ChangesToBeMade
            | C::UpgradeDisabled
            | C::MissingFetchSourcePackage
            | C::MissingChangelogPackage
            | C::PackageIsAlreadyNewest
            | C::PackageIsNotInstalled => ErrorSource::UserInput,

            C::BrokenPackages
            | C::InternalBrokenPackages
            | C::RemoveDisabled
            | C::BuilddepInfoFailed
            | C::BuilddepBrokenPackages
            | C::VirtualNoProviders
            | C::VirtualMultipleProviders
            | C::ResolverBroken
            | C::OrderingFailed
            | C::CorrectMissingFailed
            | C::AbortingInstall
            | C::DependencyUnsatisfied
            | C::NoInstallationCandidate
            | C::InternalAllUpgrade
            | C::RequestedAutoremoveFailed
            | C::DependencyCannotBeSatisfied
            | C::FailedDependencyTooNew
            | C::FailedDependency
            | C::UnmetDependencies
            | C::ProcessBuildDependencies
            | C::VirtualNoProvidersShort
            | C::VirtualMultipleProvidersShort
            | C::ConflictsViolated
            | C::ResolverRemoveDepsFailed
            | C::CannotInstallWithBrokenDeps
            | C::DistUpgradeFailed
            | C::VirtualNoInstallableProviders
            | C::VirtualMultipleProvidersNeedSelect
            | C::VirtualNoInstalledProviders
            | C::VirtualMultipleInstalledProviders
            | C::DistUpgradeSimulationFailed
            | C::MultiInstallSimulationFailed
            | C::MultiRemoveSimulationFailed
            | C::CombinedSimulationFailed
            | C::VirtualNameMultipleProvidersExact => ErrorSource::Dependency,

            C::SourcesListReadFailed
            | C::SourcesListMissing
            | C::DownloadFailed
            | C::FetchArchivesFailed
            | C::FixMissingUnsupported
            | C::FailedToFetchArchives
            | C::FailedToFetch
            | C::FailedToFetchSomeIndex
            | C::GetPackageIndexesFailed
            | C::DownloadPackageListsFailed
            | C::GetPackageArchivesFailed
            | C::DownloadPackagesFailed
            | C::GetArchivesForDistUpgradeFailed
            | C::DownloadPackagesForDistUpgradeFailed => ErrorSource::Download,

            C::PermissionDenied
            | C::LockDownloadDir
            | C::NotEnoughSpace
            | C::PackageFileOutOfSync
            | C::WriteStdoutFailed
            | C::RpmDatabaseLock
            | C::AptLockFailed => ErrorSource::Storage,

            _ => ErrorSource::Binding,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserInput => "user_input",
            Self::Dependency => "dependency",
            Self::Download => "download",
            Self::Storage => "storage",
            Self::Binding => "binding",
        })
    }
}
