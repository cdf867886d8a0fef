//! Schema and configuration tests
