// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "web/mod.rs"]
pub mod web;

#[path = "export/mod.rs"]
pub mod export;
