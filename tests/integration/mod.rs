//! Integration tests across HTTP boundaries
