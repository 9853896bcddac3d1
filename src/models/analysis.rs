use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::screening::ScreeningRecord;

/// Body of `POST /api/ai-analyze`. Results are taken as loose JSON objects
/// since they round-trip through the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiAnalyzeRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub screening_results: Vec<Value>,
    #[serde(default)]
    pub include_chart_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiAnalyzeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AiAnalyzeResponse {
    pub fn analysis(text: String) -> Self {
        Self { success: true, analysis: Some(text), message: None }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, analysis: None, message: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub stock_info: ScreeningRecord,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiStatus {
    pub connected: bool,
    pub message: &'static str,
}
