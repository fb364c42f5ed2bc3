//! Nearest-centroid classifier.
//!
//! The model is a list of labelled centroids; a feature vector is assigned
//! the label of the closest centroid by squared Euclidean distance. Ties go
//! to the class listed first.
//!
//! Model file format (JSON):
//!
//! ```json
//! { "classes": [ { "label": "Iris-setosa", "centroid": [5.0, 3.4, 1.5, 0.2] } ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sepal_core::capability::{CapabilityError, Predictor};

/// One class of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCentroid {
    pub label: String,
    pub centroid: Vec<f64>,
}

/// Serialized form of a centroid model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    pub classes: Vec<ClassCentroid>,
}

/// Predictor backed by a [`CentroidModel`]. Immutable after construction.
#[derive(Debug, Clone)]
pub struct NearestCentroidPredictor {
    classes: Vec<ClassCentroid>,
    dimensions: usize,
}

impl NearestCentroidPredictor {
    /// Build a predictor, checking the model is usable.
    ///
    /// A model needs at least one class, every centroid must have the same
    /// non-zero length, and every coordinate must be finite.
    pub fn new(model: CentroidModel) -> Result<Self, CapabilityError> {
        let dimensions = model
            .classes
            .first()
            .map(|c| c.centroid.len())
            .ok_or_else(|| CapabilityError::Unavailable("Model has no classes".into()))?;

        if dimensions == 0 {
            return Err(CapabilityError::Unavailable(
                "Model centroids are empty".into(),
            ));
        }

        for class in &model.classes {
            if class.centroid.len() != dimensions {
                return Err(CapabilityError::Unavailable(format!(
                    "Class '{}' has {} coordinates, expected {dimensions}",
                    class.label,
                    class.centroid.len()
                )));
            }
            if class.centroid.iter().any(|v| !v.is_finite()) {
                return Err(CapabilityError::Unavailable(format!(
                    "Class '{}' has a non-finite coordinate",
                    class.label
                )));
            }
        }

        Ok(Self {
            classes: model.classes,
            dimensions,
        })
    }

    /// Built-in model: per-class feature means of the iris data set, in
    /// sepal length, sepal width, petal length, petal width order.
    pub fn iris() -> Self {
        let class = |label: &str, centroid: [f64; 4]| ClassCentroid {
            label: label.to_string(),
            centroid: centroid.to_vec(),
        };
        Self {
            classes: vec![
                class("Iris-setosa", [5.006, 3.428, 1.462, 0.246]),
                class("Iris-versicolor", [5.936, 2.770, 4.260, 1.326]),
                class("Iris-virginica", [6.588, 2.974, 5.552, 2.026]),
            ],
            dimensions: 4,
        }
    }

    /// Load a model from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CapabilityError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let model: CentroidModel = serde_json::from_str(&raw).map_err(|e| {
            CapabilityError::Unavailable(format!("Invalid model file {}: {e}", path.display()))
        })?;
        let predictor = Self::new(model)?;

        tracing::info!(
            path = %path.display(),
            classes = predictor.classes.len(),
            dimensions = predictor.dimensions,
            "Loaded centroid model",
        );
        Ok(predictor)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.label.as_str())
    }
}

impl Predictor for NearestCentroidPredictor {
    fn predict(&self, features: &[f64]) -> Result<String, CapabilityError> {
        if features.len() != self.dimensions {
            return Err(CapabilityError::InvalidInput(format!(
                "Expected {} features, got {}",
                self.dimensions,
                features.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(CapabilityError::InvalidInput(
                "Feature vector contains a non-finite value".into(),
            ));
        }

        let mut best: Option<(&ClassCentroid, f64)> = None;
        for class in &self.classes {
            let distance: f64 = class
                .centroid
                .iter()
                .zip(features)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((class, distance));
            }
        }

        best.map(|(class, _)| class.label.clone())
            .ok_or_else(|| CapabilityError::Unavailable("Model has no classes".into()))
    }
}
