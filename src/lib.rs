pub mod alias;
pub mod config;
pub mod matcher;
pub mod missing;
pub mod pipeline;
pub mod record;
pub mod relocate;
pub mod report;
pub mod tmdb;
pub mod video;
