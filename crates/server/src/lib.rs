//! HTTP front end for the city forecasting models

pub mod api;
pub mod config;
