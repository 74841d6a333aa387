//! FleetStack Core
//!
//! トポロジーの定義からスタックテンプレートを組み立て、作成されたホストを
//! ロール別の inventory として書き出すためのコアライブラリ。
//!
//! # 処理の流れ
//!
//! ```text
//! TopologyRequest ──▶ Topology ──▶ graph::build ──▶ ResourceGraph
//!                                       ▲                │
//!                                  ImageCatalog      template::render
//!                                                        │
//!          HostRecord (解決済み) ──▶ inventory::emit ──▶ hosts_*.cfg
//! ```
//!
//! I/O を伴うのはイメージインデックスの読み込みと inventory の書き出しのみで、
//! グラフ構築とテンプレート生成は純粋関数。

pub mod error;
pub mod graph;
pub mod image;
pub mod inventory;
pub mod model;
pub mod naming;
pub mod template;

// Re-exports
pub use error::{FleetError, Result};
pub use graph::{
    BuildOptions, Edge, ElasticIpNode, ImageRef, InstanceNode, InstanceTags, Placement,
    ResourceGraph, ResourceKind, ResourceNode, SECURITY_GROUP, SecurityGroupNode, build,
};
pub use image::{ImageCatalog, ImageOverrides, RegionTable};
pub use inventory::{
    HostDecorations, InventoryLayout, InventoryReport, InventoryValidation, emit,
};
pub use model::*;
