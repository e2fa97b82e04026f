//! JSON persistence for grammar elements.
//!
//! Every element has one canonical text form: the compact JSON encoding of its
//! raw representation. Strings, byte buffers, and files are thin wrappers over
//! that text, so saving unchanged data always yields the same bytes.
//!
//! Loading always goes through validation; malformed or out-of-range data is
//! rejected as a whole.

use crate::error::CoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Conversion between a validated element and its persisted form.
pub trait JsonPersist: Sized {
    /// Unvalidated, serializable form.
    type Raw: Serialize + DeserializeOwned;

    fn to_raw(&self) -> Self::Raw;

    /// Validates a raw value into an element.
    fn from_raw(raw: Self::Raw) -> Result<Self, CoreError>;

    fn save_to_string(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(&self.to_raw())?)
    }

    fn save_to_memory(&self) -> Result<Vec<u8>, CoreError> {
        Ok(self.save_to_string()?.into_bytes())
    }

    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let text = self.save_to_string()?;
        fs::write(path.as_ref(), text)?;
        tracing::debug!(path = %path.as_ref().display(), "saved element");
        Ok(())
    }

    fn from_string(text: &str) -> Result<Self, CoreError> {
        let raw: Self::Raw = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    fn from_memory(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: Self::Raw = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_string(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;
    use crate::element::GrammarElement;
    use crate::null::NullElement;
    use tempfile::TempDir;

    #[test]
    fn test_charset_string_roundtrip() {
        let charset = Charset::from_counts([('a', 2), ('b', 1), ('c', 1)], 1, Some(3)).unwrap();
        let text = charset.save_to_string().unwrap();
        assert_eq!(
            text,
            r#"{"minRepeatCount":1,"maxRepeatCount":3,"characters":{"a":0.5,"b":0.25,"c":0.25}}"#
        );

        let loaded = Charset::from_string(&text).unwrap();
        assert_eq!(loaded, charset);
        assert_eq!(loaded.save_to_string().unwrap(), text);
    }

    #[test]
    fn test_unbounded_max_is_null() {
        let charset = Charset::new("z", 0, None).unwrap();
        let text = charset.save_to_string().unwrap();
        assert!(text.contains(r#""maxRepeatCount":null"#));
        assert_eq!(Charset::from_string(&text).unwrap().max_repeat_count(), None);
    }

    #[test]
    fn test_tagged_element_roundtrip() {
        let element = GrammarElement::from(Charset::new("AB ", 1, 2).unwrap());
        let text = element.save_to_string().unwrap();
        assert!(text.starts_with(r#"{"type":"charset","#));

        let loaded = GrammarElement::from_string(&text).unwrap();
        assert_eq!(loaded, element);
        assert_eq!(loaded.save_to_string().unwrap(), text);

        let null = GrammarElement::from(NullElement::new());
        let text = null.save_to_string().unwrap();
        assert_eq!(text, r#"{"type":"null","minRepeatCount":1,"maxRepeatCount":1}"#);
        assert_eq!(GrammarElement::from_string(&text).unwrap(), null);
    }

    #[test]
    fn test_memory_roundtrip() {
        let charset = Charset::from_frequencies([('q', 0.1), ('r', 0.3)], 2, 4).unwrap();
        let bytes = charset.save_to_memory().unwrap();
        let loaded = Charset::from_memory(&bytes).unwrap();
        assert_eq!(loaded, charset);
        assert_eq!(loaded.save_to_memory().unwrap(), bytes);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charset.json");

        let element = GrammarElement::from(Charset::new("0123456789", 1, 4).unwrap());
        element.save_to_file(&path).unwrap();
        let loaded = GrammarElement::from_file(&path).unwrap();
        assert_eq!(loaded, element);

        let first = std::fs::read(&path).unwrap();
        loaded.save_to_file(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            Charset::from_string("{\"minRepeatCount\":1"),
            Err(CoreError::Json(_))
        ));
        assert!(matches!(
            Charset::from_string(r#"{"minRepeatCount":1,"maxRepeatCount":1,"characters":{"ab":1.0}}"#),
            Err(CoreError::Json(_))
        ));
        assert!(matches!(
            Charset::from_string(r#"{"minRepeatCount":-2,"maxRepeatCount":1,"characters":{"a":1.0}}"#),
            Err(CoreError::RepeatCountOutOfRange { .. })
        ));
        assert!(matches!(
            Charset::from_string(r#"{"minRepeatCount":1,"characters":{"a":1.0}}"#),
            Err(CoreError::Json(_))
        ));
        assert!(matches!(
            NullElement::from_string(r#"{"minRepeatCount":1}"#),
            Err(CoreError::Json(_))
        ));
        assert!(matches!(
            Charset::from_string(r#"{"minRepeatCount":3,"maxRepeatCount":1,"characters":{"a":1.0}}"#),
            Err(CoreError::MaxBelowMin { .. })
        ));
        assert!(matches!(
            Charset::from_string(r#"{"minRepeatCount":1,"maxRepeatCount":1,"characters":{}}"#),
            Err(CoreError::EmptyCharacterSet)
        ));
        assert!(matches!(
            GrammarElement::from_string(r#"{"type":"sequence","minRepeatCount":1}"#),
            Err(CoreError::Json(_))
        ));
        assert!(matches!(
            Charset::from_file("/nonexistent/charset.json"),
            Err(CoreError::Io(_))
        ));
    }
}
