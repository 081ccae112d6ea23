pub(crate) mod client;
pub(crate) mod services;

pub use client::{TransportClient, PING_UNREACHABLE};
pub(crate) use services::dispatch_impl::DispatchService;
