//! Low-level primitives used by the record store.

/// I/O abstractions and utilities.
///
/// Positioned reads and writes over store files.
pub mod io;
