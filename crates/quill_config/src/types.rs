//! Configuration types deserialized from `quill.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level configuration parsed from `quill.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct QuillConfig {
    /// What to scan.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Artifact cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Execution mode settings.
    #[serde(default)]
    pub parallel: ParallelConfig,
}

/// Source roots and per-file scan options.
#[derive(Debug, Default, Deserialize)]
pub struct ScanConfig {
    /// Files or directories to scan, relative to the config file.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Module name for each entry of `sources`, in the same order.
    #[serde(default)]
    pub modules: Option<Vec<String>>,
    /// Files or directories whose files are never scanned.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// File names (or `.<name>.swift` suffixes) that are always reparsed.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub force_parse: Vec<String>,
    /// Whether `///` documentation comments are captured.
    #[serde(default)]
    pub parse_documentation: bool,
}

/// Artifact cache settings.
#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
    /// Disables reading and writing the cache entirely.
    #[serde(default)]
    pub disabled: bool,
    /// Base directory for per-root caches, relative to the config file.
    /// Defaults to the platform cache directory.
    #[serde(default)]
    pub base_path: Option<String>,
}

/// Execution mode settings.
#[derive(Debug, Default, Deserialize)]
pub struct ParallelConfig {
    /// Parse files one at a time, in enumeration order.
    #[serde(default)]
    pub serial: bool,
    /// Worker thread count for parallel mode. Defaults to one per core.
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `force_parse = "generated"` (string) and
/// `force_parse = ["generated", "stub"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
