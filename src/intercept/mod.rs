//! Intercept Module
//!
//! Request classification and the fetch-resolution strategies.

mod classify;
pub mod fallback;
mod request;
mod strategy;


pub use classify::{Classifier, ResourceClass, Route, Strategy};
pub use request::{Destination, InterceptedRequest, FETCH_DEST_HEADER};
pub use strategy::StrategyEngine;
