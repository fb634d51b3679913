mod calibration;

use tradrack_types::RackConfig;

use super::ToolChangeOrchestrator;
use crate::storage::MemoryStore;
use crate::test_helpers::{test_config, SimHost, SimProcess};

type Engine = ToolChangeOrchestrator<SimHost, MemoryStore, SimProcess>;

fn engine_with(config: RackConfig) -> Engine {
    engine_with_store(config, MemoryStore::new())
}

fn engine_with_store(config: RackConfig, store: MemoryStore) -> Engine {
    let host = SimHost::new(&config);
    ToolChangeOrchestrator::new(config, host, store, SimProcess::printing()).unwrap()
}

fn engine() -> Engine {
    engine_with(test_config())
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
}
