/// Identity key of a record: the logical file name on the grid.
/// Example: `/store/data/Run2018A/EGamma/MINIAOD/file_001.root`
pub type FileName = String;
/// Name of a support-table domain.
/// Example: `features`
pub type DomainName = String;
/// Name of a categorical feature within a domain.
/// Examples: `site_name`, `process`, `file_type`
pub type FeatureName = String;
/// Raw symbolic value of a categorical feature.
/// Examples: `T2_IT_Bari`, `analysis-step2`, `MINIAOD`
pub type CategoryValue = String;
/// Dense ordinal code assigned to a category value after indexing.
pub type CategoryCode = u32;
/// One undecoded row as produced by a `RowDecoder`.
pub type RawRow = serde_json::Value;
