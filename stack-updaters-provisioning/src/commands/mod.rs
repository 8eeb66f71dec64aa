//! Commands module - the provisioning driver and its service layer

pub mod provision;
pub(crate) mod service;

pub use provision::provision;
pub use service::ProvisioningService;
