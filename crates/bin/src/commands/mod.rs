pub mod agent;
pub mod health;
pub mod queue;
pub mod serve;
pub mod sync;
