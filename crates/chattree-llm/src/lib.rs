//! Text generation against a language model, independent of the provider.
//!
//! A [`LanguageModel`] takes a [`GenerateRequest`] (built with [`request()`])
//! and streams back a [`Response`]. Structured answers are requested with
//! [`RequestBuilder::structured`] and decoded with [`Completion::parse`].

pub mod error;
pub mod message;
pub mod model;
pub mod request;
pub mod response;
pub mod schema;

pub use error::Error;
pub use message::{Message, Role};
pub use model::{LanguageModel, ModelBackend};
pub use request::{GenerateRequest, OutputFormat, RequestBuilder, request};
pub use response::{Completion, Response, StopReason, StreamEvent, Usage};
pub use schema::{Describe, Property, Schema, Structured};
