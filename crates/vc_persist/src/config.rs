use alloc::sync::Arc;

use vc_migrate::Converter;

/// Settings shared by the serializer and the deserializer.
///
/// # Examples
///
/// ```
/// use vc_migrate::ConverterBuilder;
/// use vc_persist::PersistConfig;
///
/// let converter = ConverterBuilder::new()
///     .rename_type("Old.Beam", "New.Girder")
///     .build()
///     .unwrap();
///
/// let config = PersistConfig::default()
///     .with_schema_version(3)
///     .with_converter(converter);
///
/// assert_eq!(config.schema_version, 3);
/// assert!(!config.stamp_version);
/// assert!(config.converter.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct PersistConfig {
    /// Version of the running type model. Documents stamped with a lower
    /// version, or not stamped at all, are upgraded before decoding.
    pub schema_version: u32,
    /// Whether [`TypeRegistryArc::serialize`] stamps `_version` on a
    /// document root. Off by default, so plain serialization emits the bare
    /// member document.
    ///
    /// [`TypeRegistryArc::serialize`]: crate::registry::TypeRegistryArc::serialize
    pub stamp_version: bool,
    /// Batches shorter than this are serialized on the calling thread.
    pub batch_threshold: usize,
    /// Rules applied to stale documents. Without one, stale documents are
    /// decoded as they are.
    pub converter: Option<Arc<Converter>>,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            schema_version: 0,
            stamp_version: false,
            batch_threshold: 64,
            converter: None,
        }
    }
}

impl PersistConfig {
    #[inline]
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    #[inline]
    pub fn with_stamp_version(mut self, stamp: bool) -> Self {
        self.stamp_version = stamp;
        self
    }

    #[inline]
    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold;
        self
    }

    pub fn with_converter(mut self, converter: impl Into<Arc<Converter>>) -> Self {
        self.converter = Some(converter.into());
        self
    }
}
