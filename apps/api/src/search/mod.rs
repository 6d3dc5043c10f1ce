//! Search proxy: validates queries, fronts the job board with a cache and
//! answers 202 while slow upstream fetches finish in the background.

pub mod board;
pub mod cache;
pub mod coordinator;
pub mod handlers;
pub mod prompts;
pub mod query;
pub mod salary;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;
