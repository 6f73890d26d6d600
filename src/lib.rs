pub mod db;
pub mod engine;
pub mod model;
pub mod output;
pub mod paths;
pub mod store;
pub mod tree;
