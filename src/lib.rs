//! Crop grading API: accepts produce images over multipart upload and answers
//! with a grade, a confidence score and a per-attribute breakdown.
//!
//! Grading sits behind the [`grader::Grader`] trait. [`random_grader`]
//! fabricates results; [`remote_grader`] defers to an external ML service.

pub mod app;
pub mod config;
pub mod error;
pub mod grader;
pub mod profile_client;
pub mod random_grader;
pub mod remote_grader;
pub mod types;
pub mod upload;
