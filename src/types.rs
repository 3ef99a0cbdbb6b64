use serde::{Deserialize, Serialize};
use std::fmt;

use crate::upload::UploadedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::A, Grade::B, Grade::C, Grade::D];
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(letter)
    }
}

/// Per-attribute sub-scores, each a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeBreakdown {
    pub color: u8,
    pub size: u8,
    pub defects: u8,
    pub freshness: u8,
}

/// A staged image plus the form metadata that came with it.
#[derive(Debug)]
pub struct PredictionRequest {
    pub crop_type: Option<String>,
    pub image: UploadedFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionResult {
    pub grade: Grade,
    pub confidence: u8,
    pub grade_breakdown: GradeBreakdown,
    pub crop_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub grade: Grade,
    pub confidence: u8,
    pub grade_breakdown: GradeBreakdown,
    #[serde(rename = "cropType", skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    pub message: String,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            success: true,
            grade: result.grade,
            confidence: result.confidence,
            grade_breakdown: result.grade_breakdown,
            crop_type: result.crop_type,
            message: "Prediction successful".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_uses_wire_names() {
        let response = PredictResponse::from(PredictionResult {
            grade: Grade::B,
            confidence: 88,
            grade_breakdown: GradeBreakdown {
                color: 90,
                size: 81,
                defects: 7,
                freshness: 95,
            },
            crop_type: Some("tomato".to_string()),
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": true,
                "grade": "B",
                "confidence": 88,
                "grade_breakdown": {"color": 90, "size": 81, "defects": 7, "freshness": 95},
                "cropType": "tomato",
                "message": "Prediction successful",
            })
        );
    }

    #[test]
    fn missing_crop_type_is_omitted() {
        let response = PredictResponse::from(PredictionResult {
            grade: Grade::D,
            confidence: 75,
            grade_breakdown: GradeBreakdown {
                color: 80,
                size: 80,
                defects: 5,
                freshness: 80,
            },
            crop_type: None,
        });

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("cropType").is_none());
    }
}
