/// Constants used by raw-record extraction.
pub mod extractor {
    /// Default cap on examined rows per raw collection.
    ///
    /// Oversized day files otherwise dominate extraction latency; the cap
    /// bounds examined rows, not extracted ones.
    pub const DEFAULT_RECORD_CAP: usize = 10_000;
    /// Minimum interval between progress log lines during extraction.
    pub const PROGRESS_INTERVAL_MS: u64 = 1_000;
}

/// Constants used by raw-record field mapping.
pub mod fields {
    /// Row field holding the identity key.
    pub const FILE_NAME: &str = "FileName";
    /// Row field holding the access site.
    pub const SITE_NAME: &str = "SiteName";
    /// Row field holding the producing process name.
    pub const PROCESS: &str = "ProcessType";
    /// Row field holding the data-tier/file type.
    pub const FILE_TYPE: &str = "FileType";
    /// Row field holding the per-row access count.
    pub const NUM_ACCESSES: &str = "NumAccesses";
}

/// Constants used by support-table encoding.
pub mod support {
    /// Domain under which record features are registered.
    pub const FEATURES_DOMAIN: &str = "features";
    /// Feature whose category values are collapsed before indexing.
    pub const PROCESS_FEATURE: &str = "process";
}

/// Constants used by resource providers.
#[cfg(feature = "httpfs")]
pub mod provider {
    /// WebHDFS REST API prefix used by the HttpFS provider.
    pub const WEBHDFS_API: &str = "/webhdfs/v1";
    /// Default Hadoop user passed to the HttpFS gateway.
    pub const DEFAULT_HADOOP_USER: &str = "root";
}
