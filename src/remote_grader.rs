use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::grader::Grader;
use crate::types::{Grade, GradeBreakdown, PredictionRequest, PredictionResult};
use crate::upload::CROP_TYPE_FIELD;

const PREDICT_PATH: &str = "api/ml/predict";
/// The ML service reads its upload from this part.
const ML_FILE_FIELD: &str = "video";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Model-backed grading: forwards the staged image to the ML grading service.
pub struct RemoteGrader {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct RemotePrediction {
    grade: Grade,
    confidence: f64,
    grade_breakdown: RemoteBreakdown,
}

#[derive(Debug, Deserialize)]
struct RemoteBreakdown {
    color: f64,
    size: f64,
    defects: f64,
    freshness: f64,
}

impl RemoteGrader {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("Invalid ML service URL {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("ML service URL {base_url} cannot be used as a base");
        }
        let endpoint = join(&base, PREDICT_PATH);

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn join(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(path.split('/'));
    }
    url
}

/// Rounds a remote score into a percentage.
fn percent(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

#[async_trait]
impl Grader for RemoteGrader {
    #[tracing::instrument(skip(self, request), fields(crop_type = ?request.crop_type, endpoint = %self.endpoint))]
    async fn grade(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let bytes = tokio::fs::read(&request.image.path)
            .await
            .with_context(|| format!("Reading staged upload {}", request.image.path.display()))?;

        let part = Part::bytes(bytes).file_name(request.image.original_name.clone());
        let mut form = Form::new().part(ML_FILE_FIELD, part);
        if let Some(crop_type) = &request.crop_type {
            form = form.text(CROP_TYPE_FIELD, crop_type.clone());
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .context("ML service request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("ML service responded with {status}: {body}");
        }

        let prediction: RemotePrediction = response
            .json()
            .await
            .context("ML service returned an unreadable prediction")?;
        tracing::debug!(?prediction, "ML service prediction");

        Ok(PredictionResult {
            grade: prediction.grade,
            confidence: percent(prediction.confidence),
            grade_breakdown: GradeBreakdown {
                color: percent(prediction.grade_breakdown.color),
                size: percent(prediction.grade_breakdown.size),
                defects: percent(prediction.grade_breakdown.defects),
                freshness: percent(prediction.grade_breakdown.freshness),
            },
            crop_type: request.crop_type.clone(),
        })
    }
}
