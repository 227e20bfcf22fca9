//! PI Web API client.
//!
//! A deliberately small HTTP/1.1 client over `std::net::TcpStream` with
//! TLS supplied through a provider trait, plus the three-step query flow
//! against the PI Web API (data-server lookup, batch tag search, batch
//! value retrieval). The transport is a trait so the API layer tests
//! against canned responses instead of sockets.

pub mod client;
pub mod http;
pub mod tls;

pub use client::{Client, Record};
pub use http::{HttpRequest, HttpResponse, HttpTransport, TcpTransport, Url};
pub use tls::TlsProvider;

#[cfg(feature = "tls-rustls")]
pub use tls::RustlsProvider;
