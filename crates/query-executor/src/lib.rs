//! Statement execution with first- and second-level result caching

pub mod config;
pub mod deferred;
pub mod executor;
pub mod local_cache;
pub mod materializer;
pub mod raw;
pub mod statement;

pub use config::{ExecutorConfig, LocalCacheScope};
pub use deferred::{extract_object_from_list, DeferredLoad, TargetType};
pub use executor::Executor;
pub use local_cache::LocalCache;
pub use materializer::{
    NestedSelect, NestedSelectMaterializer, ResultHandler, ResultMaterializer, RowMaterializer,
};
pub use raw::RawExecutor;
pub use statement::MappedStatement;
