//! Unit tests for the Sophy client
//!
//! Invoker behaviour is exercised against a scripted transport on a paused
//! clock; HTTP-level behaviour against a WireMock server.
