//! x402 payment gating
//!
//! Priced routes answer `402 Payment Required` with the payment
//! requirements until the client retries with a valid `X-PAYMENT` header.
//! Payloads are verified and settled through a facilitator.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod facilitator;
mod gate;
mod pricing;
mod types;

pub use facilitator::{Facilitator, FacilitatorError, HttpFacilitator};
pub use gate::{
    PAYMENT_META_KEY, PAYMENT_RESPONSE_META_KEY, PaymentGate, VerifiedPayment, X_PAYMENT, X_PAYMENT_RESPONSE, challenge,
    decode_payment_header, payment_middleware,
};
pub use pricing::{Asset, RouteTable, usdc};
pub use types::{
    PaymentPayload, PaymentRequiredBody, PaymentRequirements, SettleResponse, VerifyResponse, X402_VERSION,
};
