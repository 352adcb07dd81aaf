// Aggregates all integration test modules under `tests/suite/`.
mod identity;
mod pagination;
mod propagation;
mod transport;
