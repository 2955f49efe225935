pub mod aggregate;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod pagination;
pub mod password;
pub mod permission;
pub mod response;
pub mod routes;
pub mod token;
pub mod validate;
