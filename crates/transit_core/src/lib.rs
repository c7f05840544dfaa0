pub mod clock;
pub mod ecs;
pub mod error;
pub mod grid;
pub mod network;
pub mod planner;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod spawner;
pub mod steering;
pub mod systems;
pub mod telemetry;
pub mod topology;
pub mod traffic;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
