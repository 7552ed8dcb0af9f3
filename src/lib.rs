pub mod config;
pub mod corpus;
pub mod error;
pub mod feedback;
pub mod lang;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod sentinels;
pub mod session;
pub mod textutil;
