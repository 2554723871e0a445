//! Method handlers.
//!
//! Every handler has the [`Handler`](super::router::Handler) signature: it
//! takes the shared state and raw params and resolves to a
//! [`Reply`](super::router::Reply). Parameter structs are deserialized with
//! `serde`; a shape mismatch is an invalid-params error.

pub mod account;
pub mod catalog;
pub mod review;
pub mod thread;
pub mod turn;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{AppError, Result};

/// Deserialize `params`, treating absent params as an empty object.
///
/// # Errors
///
/// Returns [`AppError::InvalidParams`] when the params do not match `T`.
pub fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Map::new())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|err| AppError::InvalidParams(format!("Invalid params: {err}")))
}
