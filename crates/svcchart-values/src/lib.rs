//! Configuration value tree for svcchart.
//!
//! Values are held as `serde_json::Value` trees. This crate provides the
//! pieces every stage of the resolver shares:
//! - dot-path addressing (`image.tag`, with `\.` for literal dots)
//! - immutable, named configuration layers
//! - the deep-merge engine (maps merge, lists and scalars replace)
//! - `--set` style override parsing

mod error;
mod layer;
mod merge;
mod overrides;
mod path;

pub use error::{LayerError, OverrideError};
pub use layer::{ConfigLayer, LayerOrigin};
pub use merge::{deep_merge, merge_layers};
pub use overrides::{parse_overrides, SetMode};
pub use path::{escape_segment, get_path, is_unset, join_path, set_path, split_path};
