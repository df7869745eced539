//! Dash API client and chunked upload entry points.
//!
//! - [`client`]: [`DashClient`], one POST per gzip CSV payload
//! - [`upload`]: [`read_and_upload_file_to_dash`] and [`upload_dataframe`]
//!
//! The free functions talk to the production endpoint. Build a [`DashClient`] from a
//! [`DashConfig`] to point the same operations somewhere else.

pub mod client;
pub mod upload;

pub use client::{upload_csv_to_dash, DashClient, DashConfig, DashResponse, DashTarget, DASH_ENDPOINT};
pub use upload::{
    log_file_name, read_and_upload_file_to_dash, upload_dataframe, DataFrameUploadOptions, FileUploadOptions,
    SNAPSHOT_COLUMN,
};
