//! HTTP API for Curbside: login sessions, drivers, residents, stops and the
//! notification inbox.

pub mod middleware;
pub mod routes;
pub mod state;
