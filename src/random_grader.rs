use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use rand::distr::{Distribution, Uniform};

use crate::grader::Grader;
use crate::types::{Grade, GradeBreakdown, PredictionRequest, PredictionResult};

/// Stands in for a model: samples a grade and scores without looking at the image.
pub struct RandomGrader {
    grade: Uniform<usize>,
    confidence: Uniform<u8>,
    attribute: Uniform<u8>,
    defects: Uniform<u8>,
}

impl RandomGrader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            grade: Uniform::new(0, Grade::ALL.len())?,
            confidence: Uniform::new_inclusive(75, 95)?,
            attribute: Uniform::new_inclusive(80, 99)?,
            defects: Uniform::new_inclusive(5, 19)?,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, crop_type: Option<String>) -> PredictionResult {
        PredictionResult {
            grade: Grade::ALL[self.grade.sample(rng)],
            confidence: self.confidence.sample(rng),
            grade_breakdown: GradeBreakdown {
                color: self.attribute.sample(rng),
                size: self.attribute.sample(rng),
                defects: self.defects.sample(rng),
                freshness: self.attribute.sample(rng),
            },
            crop_type,
        }
    }
}

#[async_trait]
impl Grader for RandomGrader {
    #[tracing::instrument(skip(self, request), fields(crop_type = ?request.crop_type))]
    async fn grade(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let result = self.sample(&mut rand::rng(), request.crop_type.clone());
        tracing::debug!(grade = %result.grade, confidence = result.confidence, "Fabricated grade");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadStore;
    use std::collections::HashSet;

    #[test]
    fn samples_stay_in_range() {
        let grader = RandomGrader::new().unwrap();
        let mut rng = rand::rng();

        for _ in 0..2000 {
            let result = grader.sample(&mut rng, None);
            assert!((75..=95).contains(&result.confidence));

            let breakdown = result.grade_breakdown;
            assert!((80..=99).contains(&breakdown.color));
            assert!((80..=99).contains(&breakdown.size));
            assert!((80..=99).contains(&breakdown.freshness));
            assert!((5..=19).contains(&breakdown.defects));
        }
    }

    #[test]
    fn every_grade_is_reachable() {
        let grader = RandomGrader::new().unwrap();
        let mut rng = rand::rng();

        let grades: HashSet<Grade> = (0..2000).map(|_| grader.sample(&mut rng, None).grade).collect();
        assert_eq!(grades.len(), Grade::ALL.len());
    }

    #[tokio::test]
    async fn echoes_crop_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), false);
        let request = PredictionRequest {
            crop_type: Some("tomato".to_string()),
            image: store.stage("image", "t.jpg", b"jpeg").await.unwrap(),
        };

        let result = RandomGrader::new().unwrap().grade(&request).await.unwrap();
        assert_eq!(result.crop_type.as_deref(), Some("tomato"));
    }
}
