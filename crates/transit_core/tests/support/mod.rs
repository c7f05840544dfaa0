pub mod agents;
pub mod schedule;
pub mod world;
