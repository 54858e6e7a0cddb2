// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod cache;
pub mod conditional;
pub mod config;
pub mod dispatcher;
pub mod exception;
pub mod param;
pub mod request;
pub mod response;
pub mod route;
pub mod server;
pub mod util;

pub use cache::{Content, ContentCache};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use exception::Exception;
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use route::{RouteTarget, Router};
pub use server::Server;
