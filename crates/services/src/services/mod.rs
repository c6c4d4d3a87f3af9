pub mod chart_analyzer;
pub mod coach;
pub mod database_validator;
pub mod entry_models;
pub mod generation;
pub mod llm_client;
pub mod model_builder;
pub mod quiz;
pub mod study_plan;
pub mod youtube;
