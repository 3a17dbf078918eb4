pub mod config;
pub mod exec;
pub mod k8s;
pub mod orchestrator;
pub mod render;
pub mod resolver;
