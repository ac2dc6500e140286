use super::types::Fetched;
use super::utils::{looks_like_html, sniff_image_type, validate_status};
use crate::engine::SuccessPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Accept any HTTP 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOk;

impl SuccessPolicy for StatusOk {
    fn name(&self) -> &'static str {
        "status"
    }

    fn check(&self, response: &Fetched) -> Result<(), String> {
        validate_status(response.status)
    }
}

/// Accept an HTTP 200 that actually carries an image.
///
/// Rejects empty bodies, HTML block pages and bodies that neither declare an
/// image content type nor start with known image magic bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResponse;

impl SuccessPolicy for ImageResponse {
    fn name(&self) -> &'static str {
        "image"
    }

    fn check(&self, response: &Fetched) -> Result<(), String> {
        validate_status(response.status)?;

        if response.body.is_empty() {
            return Err("invalid - empty body".to_string());
        }
        if looks_like_html(&response.body) {
            return Err("blocked - HTML page instead of image".to_string());
        }

        let declared_image = response
            .content_type()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !declared_image && sniff_image_type(&response.body).is_none() {
            return Err("invalid - body is not an image".to_string());
        }

        Ok(())
    }
}

/// Policy selector for configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum PolicyKind {
    /// HTTP 200 is enough
    #[default]
    Status,
    /// HTTP 200 carrying an image, block pages rejected
    Image,
}

impl PolicyKind {
    pub fn build(self) -> Arc<dyn SuccessPolicy> {
        match self {
            PolicyKind::Status => Arc::new(StatusOk),
            PolicyKind::Image => Arc::new(ImageResponse),
        }
    }
}
