//! Narrative commentary for computed reports.
//!
//! Commentary is best effort. Every failure mode collapses into a
//! placeholder `Commentary` with `available = false`; nothing here can fail
//! a compute cycle.

pub mod commentary;
pub mod generative;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use commentary::{parse_commentary, Commentary};
pub use generative::{AnnotationConfig, GenerativeAnnotator};

use crate::pipeline::GexReport;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Commentary disabled: {0}")]
    Disabled(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Quota exceeded")]
    QuotaExceeded,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl AnnotationError {
    /// Placeholder shown in place of real commentary.
    pub fn placeholder(&self) -> Commentary {
        match self {
            Self::Disabled(reason) => Commentary::unavailable("Commentary Disabled", reason, "No API key configured."),
            Self::QuotaExceeded => Commentary::unavailable(
                "Quota Limit",
                "Commentary quota exceeded.",
                "Wait a minute or switch to a lighter model.",
            ),
            Self::Timeout(after) => Commentary::unavailable(
                "Timed Out",
                &format!("No commentary within {}s.", after.as_secs()),
                "The numeric profile is unaffected.",
            ),
            other => Commentary::unavailable(
                "API Error",
                &truncate(&other.to_string(), 80),
                "Check the logs for the detailed error.",
            ),
        }
    }
}

/// Produces commentary for a report.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, report: &GexReport) -> Result<Commentary, AnnotationError>;
}

/// Run `annotator` under `timeout`, mapping any failure to a placeholder.
pub async fn annotate_or_placeholder(annotator: &dyn Annotator, report: &GexReport, timeout: Duration) -> Commentary {
    match tokio::time::timeout(timeout, annotator.annotate(report)).await {
        Ok(Ok(commentary)) => commentary,
        Ok(Err(e)) => {
            warn!(ticker = %report.ticker, "Commentary failed: {}", e);
            e.placeholder()
        }
        Err(_) => {
            warn!(ticker = %report.ticker, "Commentary timed out after {:?}", timeout);
            AnnotationError::Timeout(timeout).placeholder()
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
