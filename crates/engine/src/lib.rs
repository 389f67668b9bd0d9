//! Domain services for streets, accounts, stops, stop requests and the
//! notification feed.

pub mod account;
pub mod notification;
pub mod password;
pub mod seed;
pub mod stop;
pub mod stop_request;
pub mod street;
