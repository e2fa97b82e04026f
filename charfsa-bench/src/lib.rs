//! Benchmarks for charfsa. The benchmark targets live in `benches/`.
