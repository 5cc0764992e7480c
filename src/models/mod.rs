//! Data Transfer Objects
//!
//! Request and response body definitions for the daemon API.

mod requests;
mod responses;

pub use requests::{
    CancelRequest, ContainsQuery, EnabledRequest, PrefetchRequest, RegisterTargetRequest,
    TargetEventRequest,
};
pub use responses::{
    CancelResponse, ClearResponse, ContainsResponse, ErrorResponse, HealthResponse, StatusResponse,
};
