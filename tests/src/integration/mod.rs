//! Cross-component flows through a dashboard session and its runner.

mod session_flows;
mod sampling_flows;
mod property_flows;
