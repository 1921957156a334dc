pub mod config;
pub mod constants;
pub mod export;
pub mod instrument;
pub mod logging;
pub mod middleware;
pub mod notify;
pub mod response;
pub mod routes;
pub mod senders;
pub mod source;
pub mod state;
pub mod store;
pub mod trigger;
pub mod workers;
