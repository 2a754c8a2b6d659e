//! Linear text model exported from the offline training step.
//!
//! Three JSON artifacts, one per fitted component:
//!
//! ```text
//! vectorizer: { "vocabulary": {"term": column, ...}, "idf": [f64, ...],
//!               "sublinear_tf": false, "lowercase": true }
//! classifier: { "coef": [[f64, ...], ...], "intercept": [f64, ...], "classes": [0, 1] }
//! encoder:    { "classes": ["FAKE", "REAL"] }
//! ```
//!
//! Dimensions are checked once at load; after that every call is infallible.

use super::{FeatureVector, FrozenModel};
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Tokens of two or more word characters.
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// TF-IDF weighting with L2 normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
}

fn default_lowercase() -> bool {
    true
}

impl TfidfVectorizer {
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for m in TOKEN.find_iter(text) {
            let column = if self.lowercase {
                self.vocabulary.get(m.as_str().to_lowercase().as_str())
            } else {
                self.vocabulary.get(m.as_str())
            };
            if let Some(&column) = column {
                *counts.entry(column).or_default() += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(column, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (column, tf * self.idf[column])
            })
            .collect();

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        FeatureVector { entries }
    }

    fn validate(&self) -> Result<()> {
        if let Some((term, &column)) = self.vocabulary.iter().find(|&(_, &c)| c >= self.idf.len()) {
            return Err(Error::model(format!(
                "vocabulary term `{term}` maps to column {column} but idf has {} entries",
                self.idf.len()
            )));
        }
        Ok(())
    }
}

/// Linear decision function over a [`FeatureVector`].
#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    classes: Vec<usize>,
}

impl LinearClassifier {
    fn score(&self, row: usize, features: &FeatureVector) -> f64 {
        let weights = &self.coef[row];
        features
            .entries
            .iter()
            .map(|&(column, value)| weights[column] * value)
            .sum::<f64>()
            + self.intercept[row]
    }

    /// Encoded class: sign of the single row for binary models, arg-max otherwise.
    pub fn predict(&self, features: &FeatureVector) -> usize {
        if self.coef.len() == 1 {
            let index = usize::from(self.score(0, features) > 0.0);
            return self.classes[index];
        }
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for row in 0..self.coef.len() {
            let score = self.score(row, features);
            if score > best_score {
                best = row;
                best_score = score;
            }
        }
        self.classes[best]
    }

    fn validate(&self, dimension: usize) -> Result<()> {
        if self.coef.is_empty() {
            return Err(Error::model("classifier has no coefficient rows"));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(Error::model(format!(
                "{} coefficient rows but {} intercepts",
                self.coef.len(),
                self.intercept.len()
            )));
        }
        if let Some(row) = self.coef.iter().position(|r| r.len() != dimension) {
            return Err(Error::model(format!(
                "coefficient row {row} has {} weights, vectorizer produces {dimension}",
                self.coef[row].len()
            )));
        }
        let expected = if self.coef.len() == 1 { 2 } else { self.coef.len() };
        if self.classes.len() != expected {
            return Err(Error::model(format!(
                "classifier lists {} classes, expected {expected}",
                self.classes.len()
            )));
        }
        Ok(())
    }
}

/// Maps encoded classes back to their text labels.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn decode(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }
}

/// Vectorizer, classifier and label encoder loaded together.
#[derive(Debug, Clone)]
pub struct LinearTextModel {
    vectorizer: TfidfVectorizer,
    classifier: LinearClassifier,
    encoder: LabelEncoder,
}

impl LinearTextModel {
    /// Load and cross-check the three artifacts named in the configuration.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let model = Self::from_parts(
            read_artifact(&config.vectorizer)?,
            read_artifact(&config.classifier)?,
            read_artifact(&config.encoder)?,
        )?;
        info!(
            features = model.vectorizer.dimension(),
            classes = model.encoder.classes.len(),
            "Loaded frozen model"
        );
        Ok(model)
    }

    pub fn from_parts(
        vectorizer: TfidfVectorizer,
        classifier: LinearClassifier,
        encoder: LabelEncoder,
    ) -> Result<Self> {
        vectorizer.validate()?;
        classifier.validate(vectorizer.dimension())?;
        if let Some(class) = classifier.classes.iter().find(|&&c| c >= encoder.classes.len()) {
            warn!(class, "Classifier emits a class the label encoder does not know");
        }
        Ok(Self {
            vectorizer,
            classifier,
            encoder,
        })
    }
}

impl FrozenModel for LinearTextModel {
    fn transform(&self, text: &str) -> FeatureVector {
        self.vectorizer.transform(text)
    }

    fn predict(&self, features: &FeatureVector) -> usize {
        self.classifier.predict(features)
    }

    fn decode(&self, class: usize) -> Option<&str> {
        self.encoder.decode(class)
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::model(format!("cannot parse {}: {e}", path.display())))
}
