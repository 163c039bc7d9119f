// rust/datasets-core/src/info/mod.rs

//! Dataset descriptors: the `dataset_info.json` written at the end of a
//! save and read at the start of a load.

mod codec;
mod descriptor;
mod merge;

pub use codec::{read_info, write_info};
pub use descriptor::{DatasetInfo, SplitInfo, DESCRIPTOR_FILE, PARQUET_BUILDER_NAME};
pub use merge::merge_split_infos;
