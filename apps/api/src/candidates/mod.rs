// Candidate intake: upload validation, resume extraction, persistence,
// eligibility and the notification hand-off.

pub mod eligibility;
pub mod extraction;
pub mod handlers;
pub mod intake;
pub mod models;
pub mod repository;
pub mod storage;

#[cfg(test)]
mod tests;
