//! Cross-service choreography tests live under `tests/`.
