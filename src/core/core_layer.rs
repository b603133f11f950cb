// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "analysis/mod.rs"]
pub mod analysis;

#[path = "export/mod.rs"]
pub mod export;
