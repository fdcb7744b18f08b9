pub mod build;
pub mod cache;
pub mod dump;
pub mod error;
pub mod model;
pub mod progress;
pub mod search;
pub mod serve;
pub mod store;

pub use crate::build::{build, build_all, BuildOptions};
pub use crate::cache::{SearchCache, SearchKey};
pub use crate::dump::DumpSet;
pub use crate::error::{Result, RouteError};
pub use crate::model::{Language, PageId, StoreInfo, StoreName, NULL_PAGE_ID};
pub use crate::search::{all_shortest_paths, PathsGraph};
pub use crate::serve::{serve, ServeOptions};
pub use crate::store::{Snapshot, Store, StoreWriter};
