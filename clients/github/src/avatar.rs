use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use org_census::api;
use org_census::api::AvatarStore;

use crate::builder::DEFAULT_USER_AGENT;
use crate::Error;

pub const AVATAR_TIMEOUT: Duration = Duration::from_secs(30);

/// Saves avatars as `<dir>/<login>.jpg`, files already on disk are not downloaded again.
pub struct AvatarDownloader {
    http: reqwest::Client,
    dir: PathBuf,
}

impl AvatarDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(AVATAR_TIMEOUT)
            .build()?;
        Ok(AvatarDownloader { http, dir: dir.into() })
    }

    async fn download(&self, avatar_url: &str) -> Result<Vec<u8>, Error> {
        let response = self.http.get(avatar_url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl AvatarStore for AvatarDownloader {
    async fn store(&self, login: &str, avatar_url: &str) -> api::Result<String> {
        let file_name = format!("{}.jpg", login);
        let relative = format!("avatars/{}", file_name);
        let path = self.dir.join(&file_name);
        if tokio::fs::try_exists(&path).await? {
            return Ok(relative);
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Downloading avatar of {}", login);
        let bytes = self.download(avatar_url).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn downloads_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/u/1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let avatars = AvatarDownloader::new(dir.path().join("avatars")).unwrap();
        let url = format!("{}/u/1", server.uri());

        assert_eq!(avatars.store("alice", &url).await.unwrap(), "avatars/alice.jpg");
        assert_eq!(avatars.store("alice", &url).await.unwrap(), "avatars/alice.jpg");
        let stored = std::fs::read(dir.path().join("avatars").join("alice.jpg")).unwrap();
        assert_eq!(stored, b"jpeg");
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let avatars = AvatarDownloader::new(dir.path()).unwrap();

        assert!(avatars.store("bob", &format!("{}/u/2", server.uri())).await.is_err());
        assert!(!dir.path().join("bob.jpg").exists());
    }
}
