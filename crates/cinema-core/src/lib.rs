pub mod chain;
pub mod checksum;
pub mod config;
pub mod driver;
pub mod events;
pub mod logging;
pub mod media;
pub mod operation;
pub mod outcome;
pub mod provider;
pub mod retry;
pub mod scheduler;
pub mod script;
pub mod storage;
