//! Test harness: in-memory store and seeded simulator

mod memory_store;
mod simulator;

pub use memory_store::InMemoryStore;
pub use simulator::{
    run_simulation, simulation_framework, SimulationConfig, SimulationReport, SimulationStats,
};
