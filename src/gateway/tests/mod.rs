//! Unit tests for routing and the gateway.

mod support;
