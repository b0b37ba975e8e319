use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::HeaderValue;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::http_client::{bearer, get_json, http_client};
use crate::paths::DataKind;
use crate::tag::Tag;

/// Anything that can hand back the JSON document of one data kind for one
/// entity. The live API implements it; tests plug in canned documents.
pub trait SnapshotSource {
    fn fetch(&self, kind: DataKind, tag: &Tag) -> Result<Value>;
}

pub struct BrawlStarsClient {
    client: &'static Client,
    base_url: String,
    auth: HeaderValue,
}

impl BrawlStarsClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: bearer(&config.api_key)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&ApiConfig::from_env()?)
    }

    pub fn endpoint(&self, kind: DataKind, tag: &Tag) -> String {
        let encoded = tag.url_encoded();
        let path = match kind {
            DataKind::Player => format!("players/{encoded}"),
            DataKind::Battlelog => format!("players/{encoded}/battlelog"),
            DataKind::Club => format!("clubs/{encoded}"),
            DataKind::ClubMembers => format!("clubs/{encoded}/members"),
        };
        format!("{}/{path}", self.base_url)
    }
}

impl SnapshotSource for BrawlStarsClient {
    fn fetch(&self, kind: DataKind, tag: &Tag) -> Result<Value> {
        if kind.entity() != tag.kind() {
            return Err(anyhow!("cannot fetch {kind} for {} tag {tag}", tag.kind()));
        }
        get_json(self.client, &self.endpoint(kind, tag), &self.auth)
    }
}
