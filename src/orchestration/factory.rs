//! Engine factory for creating the configured container engine

use crate::config::EngineConfig;
use crate::orchestration::cli_engine::CliEngine;
use crate::orchestration::engine::ContainerEngine;

/// Create the container engine described by `config`
pub fn create_engine(config: &EngineConfig) -> Box<dyn ContainerEngine> {
    Box::new(CliEngine::with_binary(config.kind, config.binary()))
}
