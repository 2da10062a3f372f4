use serde::{Deserialize, Serialize};

/// Bounds applied while decoding a body and building its trees.
///
/// Only the path depth is bounded by default, sizes and counts are opt-in.
///
/// Missing keys fall back to the defaults when deserialized, so a partial
/// config section is enough:
///
/// ```
/// let limits: form_tree::Limits = serde_json::from_str(r#"{"depth": 8}"#).unwrap();
///
/// assert_eq!(limits.depth, 8);
/// assert_eq!(limits.file_size, None);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Path segments a field name may have, deeper names are dropped
    pub depth: usize,
    /// Bytes of a part's field name
    pub field_name_size: Option<usize>,
    /// Bytes of a plain field value
    pub field_size: Option<usize>,
    /// Plain fields of a multipart body
    pub fields: Option<usize>,
    /// Bytes of an uploaded file, larger files get `IniSize`
    pub file_size: Option<usize>,
    /// File parts of a multipart body
    pub files: Option<usize>,
    /// All parts of a multipart body
    pub parts: Option<usize>,
    /// Bytes of the whole multipart body
    pub stream_size: Option<u64>,
    /// Bytes read from the body at once
    pub buffer_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            depth: Self::DEFAULT_DEPTH,
            field_name_size: None,
            field_size: None,
            fields: None,
            file_size: None,
            files: None,
            parts: None,
            stream_size: None,
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Limits {
    /// 127 path segments.
    pub const DEFAULT_DEPTH: usize = 127;

    /// 8KB per read, also the smallest allowed buffer.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// Sets the max path segments.
    #[must_use]
    pub fn depth(mut self, max: usize) -> Self {
        self.depth = max;
        self
    }

    /// Sets the max field name size.
    #[must_use]
    pub fn field_name_size(mut self, max: usize) -> Self {
        self.field_name_size.replace(max);
        self
    }

    /// Sets the max field value size.
    #[must_use]
    pub fn field_size(mut self, max: usize) -> Self {
        self.field_size.replace(max);
        self
    }

    /// Sets the max number of plain fields.
    #[must_use]
    pub fn fields(mut self, max: usize) -> Self {
        self.fields.replace(max);
        self
    }

    /// Sets the max file size.
    #[must_use]
    pub fn file_size(mut self, max: usize) -> Self {
        self.file_size.replace(max);
        self
    }

    /// Sets the max number of file parts.
    #[must_use]
    pub fn files(mut self, max: usize) -> Self {
        self.files.replace(max);
        self
    }

    /// Sets the max number of parts.
    #[must_use]
    pub fn parts(mut self, max: usize) -> Self {
        self.parts.replace(max);
        self
    }

    /// Sets the read buffer size.
    ///
    /// # Panics
    ///
    /// If `max` is smaller than `Limits::DEFAULT_BUFFER_SIZE`.
    #[must_use]
    pub fn buffer_size(mut self, max: usize) -> Self {
        assert!(
            max >= Self::DEFAULT_BUFFER_SIZE,
            "The buffer_size cannot be smaller than {}.",
            Self::DEFAULT_BUFFER_SIZE,
        );

        self.buffer_size = max;
        self
    }

    /// Sets the max body size.
    #[must_use]
    pub fn stream_size(mut self, max: u64) -> Self {
        self.stream_size.replace(max);
        self
    }

    /// Returns the max when a path of `rhs` segments is too deep.
    #[must_use]
    pub fn checked_depth(&self, rhs: usize) -> Option<usize> {
        Some(self.depth).filter(|max| rhs > *max)
    }

    /// Returns the max when `rhs` parts are too many.
    #[must_use]
    pub fn checked_parts(&self, rhs: usize) -> Option<usize> {
        self.parts.filter(|max| rhs > *max)
    }

    /// Returns the max when `rhs` plain fields are too many.
    #[must_use]
    pub fn checked_fields(&self, rhs: usize) -> Option<usize> {
        self.fields.filter(|max| rhs > *max)
    }

    /// Returns the max when `rhs` file parts are too many.
    #[must_use]
    pub fn checked_files(&self, rhs: usize) -> Option<usize> {
        self.files.filter(|max| rhs > *max)
    }

    /// Returns the max when a body of `rhs` bytes is too large.
    #[must_use]
    pub fn checked_stream_size(&self, rhs: u64) -> Option<u64> {
        self.stream_size.filter(|max| rhs > *max)
    }

    /// Returns the max when a file of `rhs` bytes is too large.
    #[must_use]
    pub fn checked_file_size(&self, rhs: usize) -> Option<usize> {
        self.file_size.filter(|max| rhs > *max)
    }

    /// Returns the max when a field value of `rhs` bytes is too large.
    #[must_use]
    pub fn checked_field_size(&self, rhs: usize) -> Option<usize> {
        self.field_size.filter(|max| rhs > *max)
    }

    /// Returns the max when a field name of `rhs` bytes is too long.
    #[must_use]
    pub fn checked_field_name_size(&self, rhs: usize) -> Option<usize> {
        self.field_name_size.filter(|max| rhs > *max)
    }
}
