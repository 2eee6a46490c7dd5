pub mod analysis_client;
pub mod llm_client;

#[cfg(test)]
pub(crate) mod scripted;

pub use analysis_client::AnalysisClient;
pub use llm_client::LlmClient;
