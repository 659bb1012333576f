// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The session HTTP listener fronting the MCP aggregating gateway.

pub mod error;
pub mod listener;
pub mod server;

pub use error::ListenerError;
pub use listener::{build_router, MAX_BODY_BYTES};
pub use server::GatewayServer;
