pub mod backend;
pub mod errors;
pub mod field_extractor;
pub mod llm_json;
pub mod models;
pub mod normalizer;
pub mod render;
pub mod service;
pub mod session;
pub mod settings_store;
pub mod view_model;
