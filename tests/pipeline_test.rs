//! End-to-end pipeline tests against a mock Bedrock runtime

mod common;

use common::*;
use mailgen::config::Config;
use mailgen::pipeline::{EmailPayload, DEFAULT_RECOMMENDATIONS_KEY};
use mailgen::retry::RetryPolicy;
use mailgen::storage::{StorageBackend, StorageConfig};
use mailgen::{InvocationRequest, Pipeline, PipelineError};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn request() -> InvocationRequest {
    InvocationRequest {
        s3_uri: source_uri(),
        s3_bucket_name: OUTPUT_BUCKET.to_string(),
    }
}

#[tokio::test]
async fn test_invocation_stores_image_and_email() {
    let bedrock = MockBedrock::start().await;
    bedrock.happy_path().await;
    let store = seeded_store();
    let pipeline = pipeline(&bedrock.uri(), store.clone());

    let outcome = pipeline.invoke(&request()).await.unwrap();

    let keys = store.keys(OUTPUT_BUCKET);
    assert_eq!(keys.len(), 2, "unexpected objects: {:?}", keys);
    let png_key = keys.iter().find(|k| k.ends_with(".png")).unwrap();
    let json_key = keys.iter().find(|k| k.ends_with(".json")).unwrap();
    assert_eq!(png_key, &outcome.image_key);
    assert_eq!(json_key, &outcome.email_key);
    assert!(png_key.starts_with("nova_"));

    let image = store.object(OUTPUT_BUCKET, png_key).unwrap();
    assert_eq!(image.content_type, "image/png");
    let decoded = image::load_from_memory(&image.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 16));

    let email = store.object(OUTPUT_BUCKET, json_key).unwrap();
    assert_eq!(email.content_type, "application/json");
    let payload: EmailPayload = serde_json::from_slice(&email.data).unwrap();
    assert_eq!(payload.subject, "Fresh jackets");
    assert!(payload.content.contains(r#"<img src="cid:sample_image"/>"#));
    assert_eq!(&payload.image_uri, png_key);

    // Source bucket is untouched
    assert_eq!(store.keys(SOURCE_BUCKET), vec![SOURCE_KEY]);
}

#[tokio::test]
async fn test_image_request_is_edge_conditioned() {
    let bedrock = MockBedrock::start().await;
    bedrock.happy_path().await;
    let pipeline = pipeline(&bedrock.uri(), seeded_store());

    pipeline.invoke(&request()).await.unwrap();

    let requests = bedrock.requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests[0].url.path().ends_with("/converse"));
    assert!(requests[1].url.path().ends_with("/invoke"));
    assert!(requests[2].url.path().ends_with("/converse"));

    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let params = &body["textToImageParams"];
    assert_eq!(body["taskType"], "TEXT_IMAGE");
    assert_eq!(params["text"], "Add bold streetwear colors");
    assert_eq!(params["negativeText"], "poor quality, low resolution");
    assert_eq!(params["controlMode"], "CANNY_EDGE");
    assert!(!params["conditionImage"].as_str().unwrap().is_empty());
    assert_eq!(body["imageGenerationConfig"]["numberOfImages"], 1);
    assert_eq!(body["imageGenerationConfig"]["width"], 512);
}

#[tokio::test]
async fn test_audience_segment_is_reported() {
    let bedrock = MockBedrock::start().await;
    bedrock.happy_path().await;
    let store = seeded_store();
    store.insert(
        OUTPUT_BUCKET,
        DEFAULT_RECOMMENDATIONS_KEY,
        format!(
            r#"{{"input":{{"itemId":"bag-1"}},"output":{{"usersList":["u1"]}}}}
{{"input":{{"itemId":"{}"}},"output":{{"usersList":["u7","u8"]}}}}"#,
            TARGET_ITEM
        )
        .into_bytes(),
        "application/json",
    );
    let pipeline = pipeline(&bedrock.uri(), store.clone());

    let outcome = pipeline.invoke(&request()).await.unwrap();

    let segment = outcome.segment.unwrap();
    assert_eq!(segment.item_id, TARGET_ITEM);
    assert_eq!(segment.users, vec!["u7", "u8"]);
    assert_eq!(store.keys(OUTPUT_BUCKET).len(), 3);
}

#[tokio::test]
async fn test_malformed_email_leaves_only_the_image() {
    let bedrock = MockBedrock::start().await;
    bedrock.edit_prompt("Brighter colors").await;
    bedrock.image().await;
    bedrock
        .email("Here's your email!\n<html><body>Buy jackets</body></html>")
        .await;
    let store = seeded_store();
    let pipeline = pipeline(&bedrock.uri(), store.clone());

    let result = pipeline.invoke(&request()).await;

    assert!(matches!(result, Err(PipelineError::MalformedModelOutput(_))));
    let keys = store.keys(OUTPUT_BUCKET);
    assert_eq!(keys.len(), 1);
    assert!(keys[0].ends_with(".png"));
}

#[tokio::test]
async fn test_rejected_prompt_aborts_before_image_generation() {
    let bedrock = MockBedrock::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/model/{}/converse", TEXT_MODEL)))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"message": "Malformed input request"})),
        )
        .mount(&bedrock.server)
        .await;
    bedrock.image().await;
    let store = seeded_store();
    let pipeline = pipeline(&bedrock.uri(), store.clone());

    let result = pipeline.invoke(&request()).await;

    assert!(matches!(
        result,
        Err(PipelineError::GenerationFailed { .. })
    ));
    assert_eq!(bedrock.requests().await.len(), 1);
    assert!(store.keys(OUTPUT_BUCKET).is_empty());
}

#[tokio::test]
async fn test_image_model_error_aborts() {
    let bedrock = MockBedrock::start().await;
    bedrock.edit_prompt("Brighter colors").await;
    Mock::given(method("POST"))
        .and(path("/model/amazon.nova-canvas-v1:0/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"images": [], "error": "content filtered"}),
        ))
        .mount(&bedrock.server)
        .await;
    let store = seeded_store();
    let pipeline = pipeline(&bedrock.uri(), store.clone());

    let result = pipeline.invoke(&request()).await;

    assert!(matches!(result, Err(PipelineError::InvalidResponse(msg)) if msg == "content filtered"));
    assert!(store.keys(OUTPUT_BUCKET).is_empty());
}

#[tokio::test]
async fn test_undecodable_source_is_decode_error() {
    let bedrock = MockBedrock::start().await;
    bedrock.happy_path().await;
    let store = seeded_store();
    store.insert(SOURCE_BUCKET, SOURCE_KEY, b"not an image".to_vec(), "image/png");
    let pipeline = pipeline(&bedrock.uri(), store.clone());

    let result = pipeline.invoke(&request()).await;

    assert!(matches!(result, Err(PipelineError::Decode(_))));
    assert!(bedrock.requests().await.is_empty());
}

#[tokio::test]
async fn test_pipeline_from_config_with_fs_storage() {
    let bedrock = MockBedrock::start().await;
    bedrock.happy_path().await;

    let root = tempfile::tempdir().unwrap();
    let source = root.path().join(SOURCE_BUCKET).join(SOURCE_KEY);
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, png_bytes(8, 8, [0, 0, 255])).unwrap();

    let config = Config {
        bedrock: bedrock_config(&bedrock.uri()),
        retry: RetryPolicy::none(),
        storage: StorageConfig {
            backend: StorageBackend::Fs,
            root: root.path().to_string_lossy().into_owned(),
            ..StorageConfig::default()
        },
        campaign: campaign(),
        ..Config::default()
    };
    let pipeline = Pipeline::from_config(&config).unwrap();

    let outcome = pipeline.invoke(&request()).await.unwrap();

    let out_dir = root.path().join(OUTPUT_BUCKET);
    assert!(out_dir.join(&outcome.image_key).is_file());
    let email: EmailPayload =
        serde_json::from_slice(&std::fs::read(out_dir.join(&outcome.email_key)).unwrap()).unwrap();
    assert_eq!(email.image_uri, outcome.image_key);
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 2);
}
