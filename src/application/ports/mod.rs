pub mod payment_gateway;

pub use payment_gateway::*;
