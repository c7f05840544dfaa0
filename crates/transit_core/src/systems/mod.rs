pub mod boarding;
pub mod buses;
pub mod passengers;
pub mod spawner;
pub mod telemetry_snapshot;
pub mod traffic;
