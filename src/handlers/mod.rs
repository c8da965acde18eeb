// handlers/mod.rs - two handler tiers
//
// Public (no token) → Protected (bearer token required)
pub mod public;
pub mod protected;
