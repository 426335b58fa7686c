pub mod directory;
pub mod feed;
pub mod graph;
pub mod kv;
pub mod logging;
pub mod model;
pub mod session;
pub mod web;
