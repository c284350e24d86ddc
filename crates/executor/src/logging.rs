use crate::config::ExecutorConfig;

pub fn setup_logging(config: &ExecutorConfig) {
    common::setup_logging(config.environment);
}
