//! Shared core for Gantry tool servers.
//!
//! Every Gantry server has the same shape: validate input against a schema,
//! open or reuse a backend client, issue one call, reshape the response into
//! a textual JSON envelope, classify failures into the same envelope. This
//! crate holds that shape once — the tool registry and dispatcher, the
//! schema validator, the result envelope, the stdio JSON-RPC transport and
//! the process lifecycle — parameterized over each package's backend
//! adapter.

pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod rpc;
pub mod schema;
pub mod tools;

pub use error::{DispatchError, FaultKind, RegistryError, ToolError, CONNECTION_ERROR};
pub use lifecycle::Lifecycle;
pub use registry::ToolRegistry;
pub use rpc::{RpcServer, ServerInfo, PROTOCOL_VERSION};
pub use schema::{Field, FieldKind, Schema, ValidatedParams, ValidationFailure, Violation};
pub use tools::{ContentItem, Envelope, ToolDescriptor, ToolHandler};
