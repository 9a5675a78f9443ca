#![doc = "The `todoforge` library crate."]
#![doc = ""]
#![doc = "This crate contains the domain models, the credential and session-token logic, the"]
#![doc = "authentication middleware, the store backends, routing configuration and error"]
#![doc = "handling for the todo service. The binary (`main.rs`) wires them into an actix server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
