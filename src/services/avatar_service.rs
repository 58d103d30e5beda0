use image::imageops::FilterType;
use image::ImageFormat;
use mongodb::bson::oid::ObjectId;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

pub const AVATAR_SIZE: u32 = 250;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("Failed to encode avatar: {0}")]
    Encode(image::ImageError),
    #[error("Avatar storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Avatar task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Resizes uploaded avatars and publishes them under the static avatars dir.
#[derive(Debug, Clone)]
pub struct AvatarService {
    avatars_dir: PathBuf,
    tmp_dir: PathBuf,
    public_base: String,
}

impl AvatarService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            avatars_dir: config.avatars_dir.clone(),
            tmp_dir: config.tmp_dir.clone(),
            public_base: format!("{}/avatars", config.api_base_url),
        }
    }

    pub fn avatars_dir(&self) -> &Path {
        &self.avatars_dir
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.avatars_dir)?;
        std::fs::create_dir_all(&self.tmp_dir)
    }

    /// Decodes `bytes`, resizes to `AVATAR_SIZE`², writes it to the temp dir
    /// and moves it into the avatars dir. Returns the public URL.
    pub async fn store(&self, user_id: &ObjectId, bytes: Vec<u8>) -> Result<String, AvatarError> {
        let file_stem = format!("{}-{}", user_id.to_hex(), Uuid::new_v4());
        let tmp_dir = self.tmp_dir.clone();
        let avatars_dir = self.avatars_dir.clone();

        let file_name = tokio::task::spawn_blocking(move || -> Result<String, AvatarError> {
            let format = image::guess_format(&bytes).map_err(AvatarError::Decode)?;
            let decoded = image::load_from_memory_with_format(&bytes, format).map_err(AvatarError::Decode)?;
            let resized = decoded.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

            let (format, extension) = output_format(format);
            let file_name = format!("{}.{}", file_stem, extension);

            std::fs::create_dir_all(&tmp_dir)?;
            std::fs::create_dir_all(&avatars_dir)?;

            let tmp_path = tmp_dir.join(&file_name);
            resized.save_with_format(&tmp_path, format).map_err(AvatarError::Encode)?;
            std::fs::rename(&tmp_path, avatars_dir.join(&file_name))?;

            Ok(file_name)
        })
        .await??;

        Ok(format!("{}/{}", self.public_base, file_name))
    }
}

/// GIF and WebP uploads are re-encoded as PNG.
fn output_format(input: ImageFormat) -> (ImageFormat, &'static str) {
    match input {
        ImageFormat::Jpeg => (ImageFormat::Jpeg, "jpg"),
        _ => (ImageFormat::Png, "png"),
    }
}
