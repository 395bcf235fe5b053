pub mod brand_kit;
pub mod commands;
pub mod config;
pub mod diagram;
pub mod error;
pub mod evidence;
pub mod google;
pub mod http;
pub mod image;
pub mod mcp;
pub mod producer;
pub mod rag;
pub mod requirements;
pub mod rfp;
pub mod slides;

pub use brand_kit::{BrandKit, BrandKitStore};
pub use config::Config;
pub use error::{Error, Result};
pub use requirements::{Obligation, Requirement};
