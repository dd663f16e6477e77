pub mod btle;
pub mod constants;
pub mod encoding;
#[cfg(test)]
pub mod fake;
pub mod queue;
pub mod registry;
pub mod relay;
pub mod session;
pub mod transport;
pub mod types;
