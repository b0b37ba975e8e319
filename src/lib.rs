pub mod api_client;
pub mod config;
pub mod dimensions;
pub mod entity;
pub mod fact_matches;
pub mod flatten;
pub mod frame;
pub mod gold;
pub mod http_client;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod parquet_io;
pub mod paths;
pub mod pipeline;
pub mod raw_convert;
pub mod silver;
pub mod tag;
