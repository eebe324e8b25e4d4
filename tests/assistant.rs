//! End-to-end runs through `VisionAssistant` with a stubbed model
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use vision_assist::image::{ImageNormalizer, NormalizeOptions};
use vision_assist::{
    prompt_for, AnalysisMode, AnalysisResult, FailureKind, InferenceClient, MockLlmClient,
    UploadedImage, VisionAssistant,
};

fn red_square_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn noisy_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x * y) % 256) as u8])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn assistant_with(mock: Arc<MockLlmClient>) -> VisionAssistant {
    VisionAssistant::new(InferenceClient::new(mock))
}

#[tokio::test]
async fn test_red_square_daily_tasks() {
    let mock = Arc::new(MockLlmClient::new().with_response("red square"));
    let assistant = assistant_with(mock.clone());
    let upload = UploadedImage::new(red_square_png(), Some("image/png".to_string()));

    let result = assistant.assist(&upload, AnalysisMode::DailyTasks).await;

    assert_eq!(result.text(), Some("red square"));
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, prompt_for(AnalysisMode::DailyTasks));
    assert_eq!(calls[0].mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_mode_selects_prompt() {
    let mock = Arc::new(MockLlmClient::new());
    let assistant = assistant_with(mock.clone());
    let upload = UploadedImage::new(red_square_png(), None);

    for mode in AnalysisMode::ALL {
        assistant.assist(&upload, mode).await;
    }

    let prompts: Vec<_> = mock.calls().into_iter().map(|c| c.prompt).collect();
    assert_eq!(
        prompts,
        vec![
            prompt_for(AnalysisMode::SafetyNavigation).to_string(),
            prompt_for(AnalysisMode::DailyTasks).to_string(),
        ]
    );
}

#[tokio::test]
async fn test_invalid_upload_is_decode_failure_without_remote_call() {
    let mock = Arc::new(MockLlmClient::new().with_response("should not be used"));
    let assistant = assistant_with(mock.clone());
    let upload = UploadedImage::new(vec![0x10, 0x20, 0x30, 0x40, 0x50], None);

    let result = assistant.assist(&upload, AnalysisMode::SafetyNavigation).await;

    let failure = result.failure_info().expect("should fail");
    assert_eq!(failure.kind, FailureKind::Decode);
    assert!(!failure.message.is_empty());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_remote_failure_surfaces_as_inference_failure() {
    let mock = Arc::new(MockLlmClient::new().failing("API key not valid"));
    let assistant = assistant_with(mock);
    let upload = UploadedImage::new(red_square_png(), None);

    let result = assistant.assist(&upload, AnalysisMode::DailyTasks).await;

    match result {
        AnalysisResult::Failure(failure) => {
            assert_eq!(failure.kind, FailureKind::Inference);
            assert!(failure.message.contains("API key not valid"));
        }
        AnalysisResult::Success { .. } => panic!("expected a failure"),
    }
}

#[tokio::test]
async fn test_custom_normalizer_is_used() {
    let png = noisy_png();
    let low_quality = ImageNormalizer::with_options(NormalizeOptions::new().with_quality(20));
    let expected = low_quality.normalize(&png).unwrap();
    let default_size = ImageNormalizer::new().normalize(&png).unwrap().len();

    let mock = Arc::new(MockLlmClient::new());
    let assistant = assistant_with(mock.clone()).with_normalizer(low_quality);

    assistant
        .assist(&UploadedImage::new(png, None), AnalysisMode::DailyTasks)
        .await;

    assert_eq!(assistant.normalizer().options().jpeg_quality, 20);
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].image_bytes, expected.len());
    assert!(
        calls[0].image_bytes < default_size,
        "quality 20 payload ({} bytes) should be smaller than the default ({} bytes)",
        calls[0].image_bytes,
        default_size
    );
}

#[test]
fn test_result_json_shape() {
    let ok = serde_json::to_value(AnalysisResult::success("red square")).unwrap();
    assert_eq!(ok["status"], "success");
    assert_eq!(ok["text"], "red square");

    let failed = serde_json::to_value(AnalysisResult::failure(FailureKind::Decode, "bad")).unwrap();
    assert_eq!(failed["status"], "failure");
    assert_eq!(failed["kind"], "decode");
    assert_eq!(failed["message"], "bad");
}
