//! Narrative analysis of one stock or a batch of screening results.
//!
//! Uses the LLM when one is configured; any failure (or no credential)
//! falls back to a deterministic rule-based narrative so the endpoints
//! always have something to return.

use std::fmt::Write;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::models::screening::ScreeningRecord;
use crate::services::llm_service::{CompletionRequest, LlmService};

pub const SINGLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const SINGLE_MAX_TOKENS: u32 = 1000;
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(60);
pub const BATCH_MAX_TOKENS: u32 = 2000;
/// Results rendered into the batch prompt; the rest are summarized by count.
pub const PROMPT_RESULT_LIMIT: usize = 20;

const STOCK_SYSTEM_PROMPT: &str = "You are an equity market analyst. Analyze the given stock data \
    and provide insights that help with investment decisions.";
const SCREENING_SYSTEM_PROMPT: &str = "You are an equity market analyst. Analyze the screening \
    results and provide insights that help with investment decisions.";

/// The handful of figures the single-stock narrative looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StockSignals {
    pub price: Option<f64>,
    pub ma25: Option<f64>,
    pub rsi: Option<f64>,
    pub per: Option<f64>,
    pub volume_ratio: Option<f64>,
}

impl StockSignals {
    pub fn from_record(record: &ScreeningRecord) -> Self {
        Self {
            price: record.f64("price"),
            ma25: record.f64("ma25"),
            rsi: record.f64("rsi14"),
            per: record.f64("per"),
            volume_ratio: record.f64("volume_ratio"),
        }
    }

    fn price_above_ma25(&self) -> Option<bool> {
        Some(self.price? > self.ma25?)
    }

    /// How many of the four favorable conditions hold.
    pub fn favorable_count(&self) -> usize {
        [
            self.price_above_ma25() == Some(true),
            self.rsi.is_some_and(|r| r < 70.0),
            self.per.is_some_and(|p| p < 20.0),
            self.volume_ratio.is_some_and(|v| v > 100.0),
        ]
        .into_iter()
        .filter(|&c| c)
        .count()
    }
}

#[derive(Clone)]
pub struct AiAnalysisService {
    llm: LlmService,
}

impl AiAnalysisService {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_enabled()
    }

    pub async fn analyze_stock(&self, record: &ScreeningRecord) -> String {
        let request = CompletionRequest {
            system_prompt: STOCK_SYSTEM_PROMPT.to_string(),
            user_prompt: stock_prompt(record),
            max_tokens: SINGLE_MAX_TOKENS,
            timeout: SINGLE_TIMEOUT,
        };

        match self.llm.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Using fallback stock analysis: {}", e);
                fallback_stock_analysis(&StockSignals::from_record(record))
            }
        }
    }

    pub async fn analyze_screening_results(
        &self,
        query: &str,
        results: &[Value],
        include_chart_data: bool,
    ) -> String {
        if results.is_empty() {
            return "No stocks to analyze.".to_string();
        }

        info!("Analyzing {} screening results", results.len());
        let request = CompletionRequest {
            system_prompt: SCREENING_SYSTEM_PROMPT.to_string(),
            user_prompt: screening_prompt(query, results, include_chart_data),
            max_tokens: BATCH_MAX_TOKENS,
            timeout: BATCH_TIMEOUT,
        };

        match self.llm.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Using fallback screening analysis: {}", e);
                fallback_screening_analysis(results)
            }
        }
    }
}

fn fmt_or_na(value: Option<f64>, precision: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", precision, v, suffix),
        None => "N/A".to_string(),
    }
}

pub fn stock_prompt(record: &ScreeningRecord) -> String {
    let text = |name| record.text(name).unwrap_or("N/A");
    let num = |name, precision, suffix| fmt_or_na(record.f64(name), precision, suffix);

    format!(
        "Analyze the following stock:\n\n\
         Name: {} ({})\n\
         Price: {}\n\
         Change: {} ({})\n\
         Volume: {}\n\
         Volume ratio: {}\n\
         Market cap: {}\n\
         PER: {}\n\
         PBR: {}\n\
         ROE: {}\n\
         Dividend yield: {}\n\
         Industry: {}\n\
         Market: {}\n\n\
         Technical indicators:\n\
         RSI(14): {}\n\
         MA5: {}\n\
         MA25: {}\n\
         MA50: {}\n\
         MA75: {}\n\n\
         52-week high: {}\n\
         52-week low: {}\n\
         VWAP: {}\n\n\
         Cover:\n\
         1. Current trend and momentum\n\
         2. Valuation (cheap or expensive)\n\
         3. Technical buy/sell signals\n\
         4. Risk factors\n\
         5. Overall view (buy, neutral or sell)\n\n\
         Keep it concise, as bullet points.\n",
        text("name"),
        text("code"),
        num("price", 0, " JPY"),
        num("change_amount", 0, " JPY"),
        num("change_percent", 2, "%"),
        num("volume", 0, " shares"),
        num("volume_ratio", 0, "%"),
        num("market_cap", 0, " M JPY"),
        num("per", 1, "x"),
        num("pbr", 1, "x"),
        num("roe", 2, "%"),
        num("dividend_yield", 2, "%"),
        text("industry"),
        text("market"),
        num("rsi14", 2, ""),
        num("ma5", 2, " JPY"),
        num("ma25", 2, " JPY"),
        num("ma50", 2, " JPY"),
        num("ma75", 2, " JPY"),
        num("yearly_high", 0, " JPY"),
        num("yearly_low", 0, " JPY"),
        num("vwap", 2, " JPY"),
    )
}

/// Numeric field of a loose JSON result; numeric strings are accepted.
fn json_f64(value: &Value, key: &str) -> Option<f64> {
    let parsed = match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn change_percent(value: &Value) -> f64 {
    json_f64(value, "change_percent").unwrap_or(0.0)
}

fn json_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "N/A".to_string(),
    }
}

pub fn screening_prompt(query: &str, results: &[Value], include_chart_data: bool) -> String {
    let mut summary = format!("Screening results: {} stocks\n\n", results.len());

    for (i, stock) in results.iter().take(PROMPT_RESULT_LIMIT).enumerate() {
        let _ = writeln!(summary, "{}. {} ({})", i + 1, json_text(stock, "name"), json_text(stock, "code"));
        let _ = writeln!(
            summary,
            "   Price: {} Change: {}",
            fmt_or_na(json_f64(stock, "price"), 0, " JPY"),
            fmt_or_na(json_f64(stock, "change_percent"), 2, "%"),
        );
        let _ = writeln!(
            summary,
            "   Volume ratio: {} ROE: {} PER: {}",
            fmt_or_na(json_f64(stock, "volume_ratio"), 2, ""),
            fmt_or_na(json_f64(stock, "roe"), 2, "%"),
            fmt_or_na(json_f64(stock, "per"), 2, ""),
        );

        if include_chart_data {
            let technical: Vec<String> = [("RSI", "rsi14", ""), ("MA5", "ma5", " JPY"), ("MA25", "ma25", " JPY")]
                .into_iter()
                .filter_map(|(label, key, suffix)| {
                    json_f64(stock, key).map(|v| format!("{}: {:.2}{}", label, v, suffix))
                })
                .collect();
            if !technical.is_empty() {
                let _ = writeln!(summary, "   {}", technical.join(" "));
            }
        }
        summary.push('\n');
    }

    if results.len() > PROMPT_RESULT_LIMIT {
        let _ = writeln!(summary, "... and {} more stocks", results.len() - PROMPT_RESULT_LIMIT);
    }

    format!(
        "Answer the following question about these screening results:\n\n\
         {}\n\n\
         {}\n\
         Consider:\n\
         1. Each stock's fundamental and technical indicators\n\
         2. Industry and sector trends\n\
         3. Short- and medium-to-long-term opportunities\n\
         4. Risk factors\n\
         5. Concrete investment strategy suggestions\n\n\
         Be specific and practical.\n",
        query, summary
    )
}

pub fn fallback_stock_analysis(signals: &StockSignals) -> String {
    let mut points: Vec<&str> = Vec::new();

    match signals.price_above_ma25() {
        Some(true) => points.push("• Price is above the 25-day moving average, suggesting an uptrend"),
        Some(false) => points.push("• Price is below the 25-day moving average, possibly in a correction"),
        None => {}
    }

    match signals.rsi {
        Some(r) if r > 70.0 => points.push("• RSI above 70: overbought territory"),
        Some(r) if r < 30.0 => points.push("• RSI below 30: oversold territory"),
        Some(_) => points.push("• RSI is at a neutral level"),
        None => {}
    }

    match signals.per {
        Some(p) if p < 15.0 => points.push("• PER is below the market average, looks undervalued"),
        Some(p) if p > 30.0 => points.push("• PER is high, growth expectations are priced in"),
        _ => {}
    }

    match signals.volume_ratio {
        Some(v) if v > 150.0 => points.push("• Volume is surging, attention is rising"),
        Some(v) if v < 50.0 => points.push("• Volume is thin, the market is waiting"),
        _ => {}
    }

    let verdict = match signals.favorable_count() {
        n if n >= 3 => "\n[Overall] Favorable - several positive conditions line up",
        2 => "\n[Overall] Neutral - some positives, but caution is warranted",
        _ => "\n[Overall] Hold - no clear buy signal",
    };
    points.push(verdict);
    points.push("\n* This is a rule-based analysis. Investment decisions are your own responsibility.");

    points.join("\n")
}

pub fn fallback_screening_analysis(results: &[Value]) -> String {
    let mut out = String::from("[Rule-based analysis]\n\n");
    let _ = writeln!(out, "Analyzing {} screening results.\n", results.len());

    if !results.is_empty() {
        let changes: Vec<f64> = results.iter().filter_map(|s| json_f64(s, "change_percent")).collect();
        let avg_change = if changes.is_empty() {
            0.0
        } else {
            changes.iter().sum::<f64>() / changes.len() as f64
        };
        let positive = results.iter().filter(|s| change_percent(s) > 0.0).count();

        out.push_str("◆ Summary\n");
        let _ = writeln!(out, "- Average change: {:.2}%", avg_change);
        let _ = writeln!(
            out,
            "- Advancers: {} ({:.1}%)\n",
            positive,
            positive as f64 / results.len() as f64 * 100.0
        );

        let mut gainers: Vec<&Value> = results.iter().collect();
        gainers.sort_by(|a, b| change_percent(b).total_cmp(&change_percent(a)));
        out.push_str("◆ Top gainers\n");
        for stock in gainers.iter().take(3) {
            let _ = writeln!(
                out,
                "- {} ({}): {:.2}%",
                json_text(stock, "name"),
                json_text(stock, "code"),
                change_percent(stock)
            );
        }
        out.push('\n');

        let high_volume: Vec<&Value> = results
            .iter()
            .filter(|s| json_f64(s, "volume_ratio").unwrap_or(0.0) > 150.0)
            .collect();
        if !high_volume.is_empty() {
            let _ = writeln!(out, "◆ Volume surges ({} stocks)", high_volume.len());
            for stock in high_volume.iter().take(3) {
                let _ = writeln!(
                    out,
                    "- {} ({}): volume ratio {:.0}%",
                    json_text(stock, "name"),
                    json_text(stock, "code"),
                    json_f64(stock, "volume_ratio").unwrap_or(0.0)
                );
            }
        }
    }

    out.push_str("\n* Rule-based analysis. Configure an API key for live AI analysis.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::models::screening::FieldValue;
    use crate::services::llm_service::LlmProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records the last request and answers with a fixed result.
    struct ScriptedProvider {
        reply: Result<String, ()>,
        seen: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(reply: Result<String, ()>) -> Arc<Self> {
            Arc::new(Self { reply, seen: Mutex::new(None) })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate_completion(&self, request: CompletionRequest) -> Result<String, LlmError> {
            *self.seen.lock().unwrap() = Some(request);
            self.reply.clone().map_err(|_| LlmError::Timeout)
        }
    }

    fn batch() -> Vec<Value> {
        vec![
            json!({"code": "7203", "name": "Toyota", "change_percent": 4.0, "volume_ratio": 180.0}),
            json!({"code": "9984", "name": "SoftBank", "change_percent": 5.0}),
            json!({"code": "6758", "name": "Sony", "change_percent": 2.0}),
            json!({"code": "1301", "name": "Kyokuyo", "change_percent": -1.0}),
        ]
    }

    #[tokio::test]
    async fn test_batch_fallback_without_credential() {
        let service = AiAnalysisService::new(LlmService::disabled());
        let text = service.analyze_screening_results("Which look strong?", &batch(), false).await;

        assert!(text.contains("Analyzing 4 screening results"));
        assert!(text.contains("Average change: 2.50%"));
        assert!(text.contains("Advancers: 3 (75.0%)"));
        assert!(text.contains("- SoftBank (9984): 5.00%"));
        assert!(text.contains("Volume surges (1 stocks)"));
    }

    #[test]
    fn test_batch_fallback_is_deterministic() {
        assert_eq!(fallback_screening_analysis(&batch()), fallback_screening_analysis(&batch()));
    }

    #[tokio::test]
    async fn test_batch_uses_llm_reply_with_batch_limits() {
        let provider = ScriptedProvider::new(Ok("Strong momentum in autos.".to_string()));
        let service = AiAnalysisService::new(LlmService::with_provider(provider.clone()));

        let text = service.analyze_screening_results("Which look strong?", &batch(), true).await;
        assert_eq!(text, "Strong momentum in autos.");

        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.max_tokens, BATCH_MAX_TOKENS);
        assert_eq!(seen.timeout, BATCH_TIMEOUT);
        assert!(seen.user_prompt.contains("Which look strong?"));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back() {
        let provider = ScriptedProvider::new(Err(()));
        let service = AiAnalysisService::new(LlmService::with_provider(provider));

        let text = service.analyze_screening_results("q", &batch(), false).await;
        assert_eq!(text, fallback_screening_analysis(&batch()));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let service = AiAnalysisService::new(LlmService::disabled());
        assert_eq!(service.analyze_screening_results("q", &[], false).await, "No stocks to analyze.");
    }

    #[test]
    fn test_signal_count_bands() {
        let favorable = StockSignals {
            price: Some(110.0),
            ma25: Some(100.0),
            rsi: Some(55.0),
            per: Some(12.0),
            volume_ratio: Some(90.0),
        };
        assert_eq!(favorable.favorable_count(), 3);
        assert!(fallback_stock_analysis(&favorable).contains("[Overall] Favorable"));

        let neutral = StockSignals { per: Some(25.0), ..favorable };
        assert_eq!(neutral.favorable_count(), 2);
        assert!(fallback_stock_analysis(&neutral).contains("[Overall] Neutral"));

        let hold = StockSignals::default();
        assert_eq!(hold.favorable_count(), 0);
        assert!(fallback_stock_analysis(&hold).contains("[Overall] Hold"));
    }

    #[test]
    fn test_stock_fallback_threshold_lines() {
        let text = fallback_stock_analysis(&StockSignals {
            price: Some(90.0),
            ma25: Some(100.0),
            rsi: Some(75.0),
            per: Some(35.0),
            volume_ratio: Some(40.0),
        });
        assert!(text.contains("below the 25-day moving average"));
        assert!(text.contains("overbought"));
        assert!(text.contains("growth expectations"));
        assert!(text.contains("Volume is thin"));
    }

    #[test]
    fn test_screening_prompt_caps_rendered_results() {
        let results: Vec<Value> = (0..25)
            .map(|i| json!({"code": format!("{}", 1000 + i), "name": "X", "price": "1500"}))
            .collect();
        let prompt = screening_prompt("q", &results, true);

        assert!(prompt.contains("Screening results: 25 stocks"));
        assert!(prompt.contains("20. X (1019)"));
        assert!(!prompt.contains("21. X"));
        assert!(prompt.contains("... and 5 more stocks"));
        assert!(prompt.contains("Price: 1500 JPY"));
    }

    #[test]
    fn test_stock_prompt_handles_nulls() {
        let record = ScreeningRecord::new(vec![
            ("code", FieldValue::Text("7203".into())),
            ("name", FieldValue::Text("Toyota".into())),
            ("price", FieldValue::Real(2590.0)),
            ("rsi14", FieldValue::Null),
        ]);
        let prompt = stock_prompt(&record);
        assert!(prompt.contains("Name: Toyota (7203)"));
        assert!(prompt.contains("Price: 2590 JPY"));
        assert!(prompt.contains("RSI(14): N/A"));
    }
}
