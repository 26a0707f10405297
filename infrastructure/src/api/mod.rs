//! REST adapter
//!
//! [`HttpApiClient`] implements the [`ChatApi`](horo_application::ChatApi)
//! and [`OrderApi`](horo_application::OrderApi) ports over `reqwest`.

mod client;
mod dto;
pub mod error;

pub use client::HttpApiClient;
pub use error::HttpError;
