mod http;

pub mod runner;
pub mod transactions;

pub use http::{
    Error, HttpClient, HttpRequest, HttpResponse, HttpTransportErrorKind, Result, join_url,
};
