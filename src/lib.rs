//! Toolplex: transport multiplexer and session manager for JSON-RPC tool
//! servers.
//!
//! Callers discover and invoke tools on heterogeneous servers through one
//! gateway. Local subprocesses speak line-delimited JSON-RPC over stdio,
//! remote servers answer HTTP POSTs with JSON or Server-Sent Events, and
//! REST endpoints return vendor-specific shapes that are normalized into
//! JSON-RPC responses.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture:
//!
//! - **Domain**: Pure types and invariants with no infrastructure
//! - **Ports**: Trait seams for storage, processes and execution
//! - **Adapters**: In-memory stores, the Tokio process launcher and drivers
//!
//! # Modules
//!
//! - [`protocol`]: JSON-RPC envelopes, framing, SSE and REST normalization
//! - [`tool_registry`]: Server identities, transport configuration, catalog
//! - [`session`]: One live subprocess per server with FIFO dispatch
//! - [`transport`]: Process, HTTP stream and REST drivers
//! - [`schema_cache`]: TTL cache of discovered tools with a deny-list
//! - [`rate_limit`]: Per-minute windows per server and caller
//! - [`jobs`]: Queue for long-running invocations
//! - [`gateway`]: Router and the composed tool gateway
//! - [`settings`]: TOML configuration
//! - [`telemetry`]: Tracing subscriber setup
//! - [`clock`]: Manually advanced clock for deterministic timing

pub mod clock;
pub mod gateway;
pub mod jobs;
pub mod protocol;
pub mod rate_limit;
pub mod schema_cache;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod tool_registry;
pub mod transport;
