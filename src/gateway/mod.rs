pub mod client;

pub use client::{GatewayError, InitiatedPayment, PaymentsClient};
