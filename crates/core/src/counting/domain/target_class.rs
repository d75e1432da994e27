use crate::detection::domain::label_vocabulary::LabelVocabulary;
use crate::shared::counting_config::ConfigError;

/// The one class being counted, resolved against the vocabulary once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetClass {
    name: String,
    class_id: Option<usize>,
}

impl TargetClass {
    /// Unknown names resolve to a target that never matches.
    pub fn resolve(name: &str, vocabulary: &LabelVocabulary) -> Self {
        Self {
            name: name.to_string(),
            class_id: vocabulary.class_id(name),
        }
    }

    pub fn resolve_strict(name: &str, vocabulary: &LabelVocabulary) -> Result<Self, ConfigError> {
        let target = Self::resolve(name, vocabulary);
        if target.is_known() {
            Ok(target)
        } else {
            Err(ConfigError::UnknownTargetClass(name.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_id(&self) -> Option<usize> {
        self.class_id
    }

    pub fn is_known(&self) -> bool {
        self.class_id.is_some()
    }

    pub fn matches(&self, class_id: usize) -> bool {
        self.class_id == Some(class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coco() -> LabelVocabulary {
        LabelVocabulary::parse("person\nbicycle\ncar\n").unwrap()
    }

    #[test]
    fn test_resolve_known() {
        let t = TargetClass::resolve("car", &coco());
        assert_eq!(t.class_id(), Some(2));
        assert!(t.matches(2));
        assert!(!t.matches(0));
    }

    #[test]
    fn test_resolve_unknown_never_matches() {
        let t = TargetClass::resolve("Person", &coco());
        assert!(!t.is_known());
        assert_eq!(t.name(), "Person");
        assert!((0..3).all(|id| !t.matches(id)));
    }

    #[test]
    fn test_resolve_strict_fails_fast() {
        assert_eq!(
            TargetClass::resolve_strict("truck", &coco()),
            Err(ConfigError::UnknownTargetClass("truck".to_string()))
        );
        assert!(TargetClass::resolve_strict("person", &coco()).is_ok());
    }
}
