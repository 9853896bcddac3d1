pub mod ai_analysis_service;
pub mod chart_service;
pub mod filter_collector;
pub mod indicator_engine;
pub mod indicators;
pub mod llm_service;
pub mod query_builder;
pub mod result_formatter;
pub mod screening_columns;
pub mod screening_service;
