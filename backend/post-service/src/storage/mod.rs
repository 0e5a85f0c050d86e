/// Image store client for post media
pub mod image_store;

pub use image_store::{derive_image_id, ImageStore, S3ImageStore};

#[cfg(test)]
pub use image_store::MockImageStore;
