//! Typed classification outcome.
//!
//! The raw detector response is validated and converted into this tagged
//! variant once, at the client boundary; the rest of the system only ever
//! sees the typed form.

use serde::{Deserialize, Serialize};

/// Which class the remote detector scored higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Human,
    Artificial,
}

/// A settled classification from the remote detector.
///
/// `confidence` is the service-reported probability of the predicted class;
/// the two probabilities sum to roughly 1.0. Values are taken from the
/// response body, never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub human_probability: f64,
    pub artificial_probability: f64,
    pub prediction: Prediction,
    pub confidence: f64,
}

impl Detection {
    pub fn is_artificial(&self) -> bool {
        self.prediction == Prediction::Artificial
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFailure {
    pub error_message: String,
}

/// Outcome of one classification attempt. Never an `Err` across the client
/// boundary; transport and application failures both land in `Failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResult {
    Success(Detection),
    Failure(DetectionFailure),
}

impl ClassificationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        ClassificationResult::Failure(DetectionFailure {
            error_message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ClassificationResult::Success(_))
    }

    pub fn as_success(&self) -> Option<&Detection> {
        match self {
            ClassificationResult::Success(d) => Some(d),
            ClassificationResult::Failure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trips_through_json() {
        let result = ClassificationResult::Success(Detection {
            human_probability: 0.2,
            artificial_probability: 0.8,
            prediction: Prediction::Artificial,
            confidence: 0.8,
        });

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"humanProbability\":0.2"));
        assert!(json.contains("\"prediction\":\"artificial\""));

        let back: ClassificationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn failure_round_trips_through_json() {
        let result = ClassificationResult::failure("timed out");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, "{\"errorMessage\":\"timed out\"}");

        let back: ClassificationResult = serde_json::from_str(&json).unwrap();
        assert!(!back.is_success());
    }
}
