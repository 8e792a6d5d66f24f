//! Common test utilities - mock Bedrock, fixtures and the MailgenTest harness

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mailgen::bedrock::{BedrockClient, BedrockConfig, ConverseTextGenerator};
use mailgen::config::{Config, ServerConfig};
use mailgen::images::{CanvasImageGenerator, ImageModel};
use mailgen::pipeline::CampaignConfig;
use mailgen::retry::RetryPolicy;
use mailgen::storage::{MemoryBlobStore, PNG_CONTENT_TYPE};
use mailgen::{Pipeline, Server};
use reqwest::Client;
use serde_json::json;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEXT_MODEL: &str = "text-model";
pub const SOURCE_BUCKET: &str = "catalog";
pub const SOURCE_KEY: &str = "products/jacket.png";
pub const OUTPUT_BUCKET: &str = "campaign-out";
pub const TARGET_ITEM: &str = "jacket-7";

/// A solid-color PNG
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn source_uri() -> String {
    format!("s3://{}/{}", SOURCE_BUCKET, SOURCE_KEY)
}

fn converse_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "output": {"message": {"role": "assistant", "content": [{"text": text}]}},
        "stopReason": "end_turn"
    }))
}

/// wiremock server standing in for the Bedrock runtime
pub struct MockBedrock {
    pub server: MockServer,
}

impl MockBedrock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Reply to the edit-instruction prompt
    pub async fn edit_prompt(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/model/{}/converse", TEXT_MODEL)))
            .and(body_string_contains("Limit it to 10 words"))
            .respond_with(converse_reply(text))
            .mount(&self.server)
            .await;
    }

    /// Reply to the email-composition prompt
    pub async fn email(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/model/{}/converse", TEXT_MODEL)))
            .and(body_string_contains("HTML email"))
            .respond_with(converse_reply(text))
            .mount(&self.server)
            .await;
    }

    /// Reply to image generation with a solid-color PNG
    pub async fn image(&self) {
        let generated = STANDARD.encode(png_bytes(16, 16, [20, 200, 90]));
        Mock::given(method("POST"))
            .and(path_regex(r"^/model/[^/]+/invoke$"))
            .and(body_string_contains("TEXT_IMAGE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": [generated]})))
            .mount(&self.server)
            .await;
    }

    /// Mount the happy path for every model call
    pub async fn happy_path(&self) {
        self.edit_prompt("Add bold streetwear colors").await;
        self.email(r#"{"subject":"Fresh jackets","content":"<html><body><p>New in</p><img src=\"cid:sample_image\"/></body></html>"}"#)
            .await;
        self.image().await;
    }

    /// All requests received so far
    pub async fn requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

pub fn bedrock_config(endpoint: &str) -> BedrockConfig {
    BedrockConfig {
        endpoint: endpoint.to_string(),
        api_key: Some("test-key".to_string()),
        text_model: TEXT_MODEL.to_string(),
        ..BedrockConfig::default()
    }
}

pub fn campaign() -> CampaignConfig {
    CampaignConfig {
        target_item_id: TARGET_ITEM.to_string(),
        ..CampaignConfig::default()
    }
}

/// Memory store seeded with the source product image
pub fn seeded_store() -> Arc<MemoryBlobStore> {
    let store = Arc::new(MemoryBlobStore::new());
    store.insert(
        SOURCE_BUCKET,
        SOURCE_KEY,
        png_bytes(32, 24, [180, 40, 40]),
        PNG_CONTENT_TYPE,
    );
    store
}

/// Pipeline wired to a mock Bedrock and a memory store
pub fn pipeline(bedrock_uri: &str, store: Arc<MemoryBlobStore>) -> Pipeline {
    let config = bedrock_config(bedrock_uri);
    let client = Arc::new(BedrockClient::new(&config, RetryPolicy::none()).unwrap());
    let text = Arc::new(ConverseTextGenerator::new(client.clone(), TEXT_MODEL));
    let images = Arc::new(CanvasImageGenerator::new(
        client,
        store.clone(),
        ImageModel::NovaCanvas,
    ));
    Pipeline::new(store, text, images, campaign())
}

/// Test harness that spawns a real mailgend server on a random port
pub struct MailgenTest {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryBlobStore>,
    pub bedrock: MockBedrock,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl MailgenTest {
    /// Start a server backed by a memory store and a fresh mock Bedrock
    pub async fn start() -> Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let bedrock = MockBedrock::start().await;
        let store = seeded_store();

        let config = Config {
            server: ServerConfig { bind_addr: addr },
            ..Config::default()
        };
        let pipeline = Arc::new(pipeline(&bedrock.uri(), store.clone()));
        let server = Arc::new(Server::with_pipeline(config, pipeline));
        let server_clone = server.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            store,
            bedrock,
            server,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Invoke with the seeded source image
    pub async fn invoke(&self, bucket: &str) -> Result<reqwest::Response> {
        self.post(
            "/invoke",
            &json!({"s3_uri": source_uri(), "s3_bucket_name": bucket}),
        )
        .await
    }

    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}
