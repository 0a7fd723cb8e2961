//! Review console for internship reports submitted by supervising teachers
//! and host companies: a client for the admin reports API with paginated,
//! optimistically patched report state.

pub mod cli;
pub mod config;
pub mod export;
pub mod gateway;
pub mod messages;
pub mod session;
pub mod state;
pub mod store;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;
