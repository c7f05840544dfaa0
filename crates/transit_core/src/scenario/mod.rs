//! Scenario setup: configuration and world construction.

mod build;
mod params;

pub use build::build_scenario;
pub use params::{
    ScenarioParams, SimConfig, TicketPrice, DEFAULT_CELL_SIZE, DEFAULT_TICKET_PRICE,
};
