pub mod drive_hub_adapter;
pub mod facade;
pub mod google_drive_hub_adapter;
pub mod google_drive_hub_adapter_builder;
mod google_drive_utils;
pub mod read_credentials;
pub mod token;
