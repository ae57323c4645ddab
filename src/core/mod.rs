//! Core Infrastructure
//!
//! HTTP transport shared by every request the client makes.

pub mod transport;

pub use transport::{
    create_mock_transport, create_transport, HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};
