//! Verdicts from a frozen text model.
//!
//! The invoker only needs the three capabilities of [`FrozenModel`]; the
//! bundled backend is [`model::LinearTextModel`]. A model is loaded once at
//! start-up and shared read-only by every classification.

pub mod model;

use crate::models::{NormalizedArticle, Verdict, VerdictLabel};
use tracing::debug;

pub use model::LinearTextModel;

/// Sparse feature vector: `(column, weight)` pairs sorted by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    pub entries: Vec<(usize, f64)>,
}

/// A trained vectorizer + classifier + label encoder.
pub trait FrozenModel {
    /// Text → feature vector.
    fn transform(&self, text: &str) -> FeatureVector;
    /// Feature vector → encoded class.
    fn predict(&self, features: &FeatureVector) -> usize;
    /// Encoded class → label, `None` for a class the encoder does not know.
    fn decode(&self, class: usize) -> Option<&str>;
}

/// Applies a [`FrozenModel`] to normalized text.
#[derive(Debug)]
pub struct Classifier<'m, M> {
    model: &'m M,
}

impl<'m, M: FrozenModel> Classifier<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    /// Binary verdict for already-normalized text.
    pub fn classify(&self, normalized_text: &str) -> VerdictLabel {
        let features = self.model.transform(normalized_text);
        let class = self.model.predict(&features);
        match self.model.decode(class) {
            Some(label) => VerdictLabel::from_decoded(label),
            None => {
                debug!(class, "Model predicted an undecodable class");
                VerdictLabel::LikelyFalse
            }
        }
    }

    pub fn verdict(&self, article: &NormalizedArticle) -> Verdict {
        Verdict {
            pk: article.pk,
            label: self.classify(&article.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predicts the class index given as the first word of the text.
    struct FixedModel {
        labels: Vec<&'static str>,
    }

    impl FrozenModel for FixedModel {
        fn transform(&self, text: &str) -> FeatureVector {
            let class = text.split_whitespace().next().and_then(|w| w.parse().ok()).unwrap_or(0);
            FeatureVector {
                entries: vec![(class, 1.0)],
            }
        }

        fn predict(&self, features: &FeatureVector) -> usize {
            features.entries[0].0
        }

        fn decode(&self, class: usize) -> Option<&str> {
            self.labels.get(class).copied()
        }
    }

    fn model() -> FixedModel {
        FixedModel {
            labels: vec!["FAKE", "REAL", "SATIRE"],
        }
    }

    #[test]
    fn test_real_is_likely_true() {
        let model = model();
        assert_eq!(Classifier::new(&model).classify("1 senate vote"), VerdictLabel::LikelyTrue);
    }

    #[test]
    fn test_fake_and_other_labels_are_likely_false() {
        let model = model();
        let classifier = Classifier::new(&model);
        assert_eq!(classifier.classify("0 hoax"), VerdictLabel::LikelyFalse);
        assert_eq!(classifier.classify("2 parody"), VerdictLabel::LikelyFalse);
    }

    #[test]
    fn test_undecodable_class_is_likely_false() {
        let model = model();
        assert_eq!(Classifier::new(&model).classify("9 unknown"), VerdictLabel::LikelyFalse);
    }

    #[test]
    fn test_verdict_keeps_primary_key() {
        let model = model();
        let article = NormalizedArticle {
            pk: 42,
            title: "T".to_string(),
            text: "1 senate".to_string(),
        };
        let verdict = Classifier::new(&model).verdict(&article);
        assert_eq!(verdict.pk, 42);
        assert_eq!(verdict.label.as_str(), "Likely True");
    }
}
