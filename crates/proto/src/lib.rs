//! Generated gNMI protocol bindings
//!
//! Compiled from `proto/gnmi.proto` at build time. Only the client side of
//! the Subscribe RPC is generated; gtel never acts as a gNMI server.
//!
//! The interesting entry points:
//!
//! - `gnmi::g_nmi_client::GNmiClient` - the tonic client
//! - `gnmi::SubscribeRequest` / `gnmi::SubscribeResponse` - stream frames
//! - `gnmi::{Path, PathElem, TypedValue, Notification}` - wire data model

pub mod gnmi {
    tonic::include_proto!("gnmi");
}
