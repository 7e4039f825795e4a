//! Test utilities shared by use case and route tests.
//!
//! - Factories for valid fixtures
//! - In-memory repositories and a scripted payment gateway
//! - A harness wiring the use cases over those mocks, and an `AppState` builder

mod app_state_builder;
mod factories;
mod payment_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use payment_mocks::*;
