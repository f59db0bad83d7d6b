// Market data domain
pub mod market;

// Predictions and top picks
pub mod prediction;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
