//! HTTP access to the analytics backend.
//!
//! [`transport`] performs single requests and owns the error mapping,
//! [`client`] layers verb helpers and typed decoding on top, and [`models`]
//! holds the domain records the services hand out.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, ApiErrorKind};
pub use models::{
    AnalysisReport, AnalysisRequest, AnalysisTask, Channel, ChatMessage, ChatQuery, DateRange,
    LabelCount, WatchedStreamer, WordFrequency,
};
pub use transport::{EndpointCall, Envelope, HttpTransport, Method, Transport, TransportSettings};
