//! モデル定義
//!
//! トポロジー、ロール、OS、アーキテクチャ、解決済みホストのモデル。

mod arch;
mod host;
mod os;
mod role;
mod topology;

// Re-exports
pub use arch::*;
pub use host::*;
pub use os::*;
pub use role::*;
pub use topology::*;
