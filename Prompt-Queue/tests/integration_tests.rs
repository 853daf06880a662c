use chrono::Local;
use prompt_queue::imagegen_rs::{data_uri::encode_data_uri, GenerationRequest, ImageGenError};
use prompt_queue::archive::archive_name;
use prompt_queue::storage::LAST_CONFIG_KEY;
use prompt_queue::*;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

enum Outcome {
    Images(Vec<String>),
    Fail(String),
}

/// Replays scripted outcomes in order; once the script runs out every call
/// succeeds with one image per requested count.
#[derive(Default)]
struct ScriptedGenerator {
    script: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl ImageGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> prompt_queue::imagegen_rs::Result<Vec<String>> {
        self.calls.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Outcome::Images(images)) => Ok(images),
            Some(Outcome::Fail(msg)) => Err(ImageGenError::Other(msg)),
            None => Ok(vec![image("px"); request.count as usize]),
        }
    }
}

/// Blocks every call until the test hands out a permit.
struct GatedGenerator {
    gate: Semaphore,
}

impl GatedGenerator {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
        }
    }

    fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }
}

impl ImageGenerator for GatedGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> prompt_queue::imagegen_rs::Result<Vec<String>> {
        self.gate
            .acquire()
            .await
            .map_err(|e| ImageGenError::Other(e.to_string()))?
            .forget();
        Ok(vec![image("gated")])
    }
}

fn image(content: &str) -> String {
    encode_data_uri("image/jpeg", content.as_bytes())
}

fn no_pacing() -> ProcessorConfig {
    ProcessorConfig::builder()
        .with_pacing(Duration::ZERO)
        .build()
}

fn processor(script: Vec<Outcome>) -> QueueProcessor<Arc<ScriptedGenerator>> {
    QueueProcessor::new(Arc::new(ScriptedGenerator::new(script)), no_pacing())
}

fn zip_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

// -- Input parsing --

#[tokio::test]
async fn test_blank_lines_are_dropped() {
    let processor = processor(vec![]);
    let summary = processor
        .submit_batch("cat\n\nfox\n", &BatchConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    let state = processor.snapshot();
    let prompts: Vec<&str> = state.results.iter().map(|r| r.prompt.as_str()).collect();
    assert_eq!(prompts, vec!["cat", "fox"]);
}

#[tokio::test]
async fn test_blank_submission_clears_previous_batch() {
    let processor = processor(vec![]);
    let first = processor
        .submit_batch("cat\nfox\nowl", &BatchConfig::default())
        .await
        .unwrap();
    assert_eq!(processor.snapshot().results.len(), 3);

    let summary = processor
        .submit_batch("   \n\n", &BatchConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.total, 0);
    assert_ne!(summary.batch_id, first.batch_id);

    let state = processor.snapshot();
    assert_eq!(state.total, 0);
    assert_eq!(state.completed, 0);
    assert_eq!(state.current_index, 0);
    assert!(state.results.is_empty());
    assert!(state.is_finished());
    assert_eq!(state.progress_percentage(), 0.0);
    assert_eq!(processor.phase(), ProcessorPhase::Idle);
    // Only the first batch reached the generator.
    assert_eq!(processor.generator().calls().len(), 3);
}

#[tokio::test]
async fn test_bom_prefixed_prompt_is_trimmed() {
    let processor = processor(vec![]);
    processor
        .submit_batch("\u{FEFF}a cat\n\u{FEFF}\na fox", &BatchConfig::default())
        .await
        .unwrap();

    let prompts: Vec<String> = processor
        .snapshot()
        .results
        .into_iter()
        .map(|r| r.prompt)
        .collect();
    assert_eq!(prompts, vec!["a cat", "a fox"]);
}

// -- Request shaping --

#[tokio::test]
async fn test_style_preset_is_appended() {
    let processor = processor(vec![]);
    let config = BatchConfig::builder()
        .with_style_preset("oil painting")
        .build();
    processor.submit_batch("a house", &config).await.unwrap();

    let calls = processor.generator().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "a house, oil painting");
    // The result keeps the prompt as the user wrote it.
    assert_eq!(processor.snapshot().results[0].prompt, "a house");
}

#[tokio::test]
async fn test_request_carries_batch_settings() {
    let processor = processor(vec![]);
    let config = BatchConfig::builder()
        .with_size(ImageSize::pixels(1792, 1024))
        .with_image_count(2)
        .with_model("nano-banana")
        .build();
    processor.submit_batch("a", &config).await.unwrap();

    let call = &processor.generator().calls()[0];
    assert_eq!(call.size, ImageSize::pixels(1792, 1024));
    assert_eq!(call.count, 2);
    assert_eq!(call.model, "nano-banana");
    assert_eq!(processor.snapshot().size, Some(ImageSize::pixels(1792, 1024)));
}

#[tokio::test]
async fn test_image_count_is_clamped() {
    let processor = processor(vec![]);

    let too_many = BatchConfig {
        number_of_images: 7,
        ..Default::default()
    };
    processor.submit_batch("a", &too_many).await.unwrap();

    let nan = BatchConfig::builder()
        .with_image_count_input(f64::NAN)
        .build();
    processor.submit_batch("b", &nan).await.unwrap();

    let calls = processor.generator().calls();
    assert_eq!(calls[0].count, 4);
    assert_eq!(calls[1].count, 1);
}

// -- Per-item outcomes --

#[tokio::test]
async fn test_failure_is_isolated_to_its_prompt() {
    let processor = processor(vec![
        Outcome::Images(vec![image("one")]),
        Outcome::Fail("quota exceeded".into()),
        Outcome::Images(vec![image("three"), image("three-b")]),
    ]);
    let summary = processor
        .submit_batch("one\ntwo\nthree", &BatchConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let state = processor.snapshot();
    assert_eq!(state.completed, 3);
    assert_eq!(state.results[0].status, GenerationStatus::Success);
    assert_eq!(state.results[1].status, GenerationStatus::Error);
    assert_eq!(state.results[1].error.as_deref(), Some("quota exceeded"));
    assert!(state.results[1].images.is_none());
    assert_eq!(state.results[2].status, GenerationStatus::Success);
    assert_eq!(state.results[2].images().len(), 2);
    assert_eq!(processor.generator().calls().len(), 3);
}

#[tokio::test]
async fn test_error_without_message_uses_fallback() {
    let processor = processor(vec![Outcome::Fail(String::new())]);
    processor
        .submit_batch("silent failure", &BatchConfig::default())
        .await
        .unwrap();

    let result = &processor.snapshot().results[0];
    assert_eq!(result.status, GenerationStatus::Error);
    assert_eq!(result.error.as_deref(), Some(UNKNOWN_ERROR));
}

// -- Progress and events --

#[tokio::test]
async fn test_completed_increases_by_one_per_item() {
    let processor = processor(vec![Outcome::Fail("x".into())]);
    let mut events = processor.events();

    processor
        .submit_batch("a\nb\nc\nd", &BatchConfig::default())
        .await
        .unwrap();

    let mut completed = Vec::new();
    let mut started = Vec::new();
    let mut finished_batch = None;
    while let Ok(event) = events.try_recv() {
        match event {
            QueueEvent::BatchStarted(e) => assert_eq!(e.total, 4),
            QueueEvent::ItemStarted(e) => started.push(e.index),
            QueueEvent::ItemFinished(e) => {
                assert_eq!(e.total, 4);
                completed.push(e.completed);
            }
            QueueEvent::BatchCompleted(e) => finished_batch = Some(e.summary),
        }
    }

    assert_eq!(started, vec![1, 2, 3, 4]);
    assert_eq!(completed, vec![1, 2, 3, 4]);
    let summary = finished_batch.unwrap();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.failed, 1);

    let state = processor.snapshot();
    assert_eq!(state.completed, state.total);
    assert_eq!(state.current_index, 4);
    assert_eq!(state.progress_percentage(), 100.0);
    assert!(state.is_finished());
}

#[tokio::test]
async fn test_watch_subscribers_see_progress_in_order() {
    let processor = Arc::new(processor(vec![]));
    let mut rx = processor.subscribe();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            seen.push(state.completed);
            if state.is_finished() {
                break;
            }
        }
        seen
    });

    let handle = processor
        .clone()
        .spawn_batch("a\nb\nc", BatchConfig::default());
    handle.await.unwrap().unwrap();

    let seen = observer.await.unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&3));
}

// -- Batch lifecycle --

#[tokio::test]
async fn test_resubmission_replaces_state() {
    let processor = processor(vec![]);
    let first = processor
        .submit_batch("cat\nfox", &BatchConfig::default())
        .await
        .unwrap();
    let second = processor
        .submit_batch("cat\nfox", &BatchConfig::default())
        .await
        .unwrap();

    assert_ne!(first.batch_id, second.batch_id);
    let state = processor.snapshot();
    assert_eq!(state.batch_id.as_deref(), Some(second.batch_id.as_str()));
    assert_eq!(state.total, 2);
    assert_eq!(state.results.len(), 2);
    assert_eq!(state.completed, 2);
}

#[tokio::test]
async fn test_submit_while_running_is_ignored() {
    let generator = Arc::new(GatedGenerator::new());
    let processor = Arc::new(QueueProcessor::new(generator.clone(), no_pacing()));
    let mut events = processor.events();

    let handle = processor
        .clone()
        .spawn_batch("one\ntwo", BatchConfig::default());

    loop {
        if let QueueEvent::ItemStarted(_) = events.recv().await.unwrap() {
            break;
        }
    }
    assert_eq!(processor.phase(), ProcessorPhase::Running);

    let before = processor.snapshot();
    assert_eq!(before.total, 2);
    assert_eq!(before.results[0].status, GenerationStatus::Loading);

    let rejected = processor
        .submit_batch("three\nfour\nfive", &BatchConfig::default())
        .await;
    assert!(rejected.is_none());
    assert_eq!(processor.snapshot(), before);

    generator.release(2);
    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(processor.phase(), ProcessorPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_pacing_between_requests_only() {
    let processor = QueueProcessor::new(
        Arc::new(ScriptedGenerator::default()),
        ProcessorConfig::default(),
    );

    let start = tokio::time::Instant::now();
    let summary = processor
        .submit_batch("a\nb\nc", &BatchConfig::default())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // Two gaps for three prompts, none after the last one.
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));
    assert!(summary.total_duration_ms >= 2000);

    let start = tokio::time::Instant::now();
    processor
        .submit_batch("solo", &BatchConfig::default())
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}

// -- Archival --

#[tokio::test]
async fn test_archive_contains_successful_images() {
    let processor = processor(vec![
        Outcome::Images(vec![image("cat-1"), image("cat-2")]),
        Outcome::Fail("nope".into()),
        Outcome::Images(vec![image("fox-1")]),
    ]);
    processor
        .submit_batch("A cat!\nbroken\na fox", &BatchConfig::default())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let archiver = ResultArchiver::new();
    let path = archiver
        .save_to_dir(&processor.snapshot().results, dir.path())
        .await
        .unwrap();

    let file_name = path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.starts_with("generated_images_"));
    assert!(file_name.ends_with(".zip"));
    assert!(!archiver.is_zipping());

    let names = zip_names(std::fs::read(&path).unwrap());
    assert_eq!(names, vec!["a_cat_1.jpeg", "a_cat_2.jpeg", "a_fox_1.jpeg"]);

    let mut archive = zip::ZipArchive::new(Cursor::new(std::fs::read(&path).unwrap())).unwrap();
    let mut entry = archive.by_name("a_fox_1.jpeg").unwrap();
    let mut content = String::new();
    std::io::Read::read_to_string(&mut entry, &mut content).unwrap();
    assert_eq!(content, "fox-1");
}

#[tokio::test]
async fn test_archive_with_no_successes_is_empty() {
    let results = vec![PromptResult::failure("a", "e"), PromptResult::loading("b")];
    let dir = tempfile::tempdir().unwrap();

    let before = Local::now();
    let path = ResultArchiver::new()
        .save_to_dir(&results, dir.path())
        .await
        .unwrap();
    let after = Local::now();

    // The minute may roll over while the archive is written.
    let file_name = path.file_name().unwrap().to_str().unwrap();
    assert!(
        file_name == archive_name(&before) || file_name == archive_name(&after),
        "unexpected archive name {}",
        file_name
    );
    assert!(zip_names(std::fs::read(&path).unwrap()).is_empty());
}

#[tokio::test]
async fn test_repeated_exports_keep_earlier_archives() {
    let dir = tempfile::tempdir().unwrap();
    let archiver = ResultArchiver::new();
    let first_results = vec![PromptResult::success("a cat", vec![image("cat")])];
    let second_results = vec![PromptResult::success("a fox", vec![image("fox")])];

    let first = archiver.save_to_dir(&first_results, dir.path()).await.unwrap();
    let second = archiver.save_to_dir(&second_results, dir.path()).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(zip_names(std::fs::read(&first).unwrap()), vec!["a_cat_1.jpeg"]);
    assert_eq!(zip_names(std::fs::read(&second).unwrap()), vec!["a_fox_1.jpeg"]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn test_archive_failure_leaves_no_file() {
    let results = vec![PromptResult::success(
        "bad",
        vec!["data:image/jpeg;base64,%%%".into()],
    )];
    let dir = tempfile::tempdir().unwrap();
    let archiver = ResultArchiver::new();

    assert!(archiver.save_to_dir(&results, dir.path()).await.is_none());
    assert!(!archiver.is_zipping());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_overlapping_archive_requests() {
    let results = vec![PromptResult::success("a cat", vec![image("cat")])];
    let dir = tempfile::tempdir().unwrap();
    let archiver = ResultArchiver::new();

    let (first, second) = tokio::join!(
        archiver.save_to_dir(&results, dir.path()),
        archiver.save_to_dir(&results, dir.path()),
    );
    assert!(first.is_some());
    assert!(second.is_none());
}

#[tokio::test]
async fn test_save_single_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_image(&image("hello"), "Red Panda", 1, dir.path())
        .await
        .unwrap();
    assert_eq!(path.file_name().unwrap(), "red_panda_2.jpeg");
    assert_eq!(std::fs::read(&path).unwrap(), b"hello");

    assert!(save_image("", "x", 0, dir.path()).await.is_err());
}

// -- Local store --

#[test]
fn test_last_config_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("settings.db");
    let config = BatchConfig::builder()
        .with_size(ImageSize::pixels(1024, 1792))
        .with_image_count(3)
        .with_style_preset(STYLE_PRESETS[4].value)
        .with_model("IMAGEN_4")
        .build();

    {
        let store = LocalStore::open(Some(&db_path)).unwrap();
        store.set(LAST_CONFIG_KEY, &config);
    }

    let store = LocalStore::open(Some(&db_path)).unwrap();
    assert!(store.has(LAST_CONFIG_KEY));
    assert_eq!(store.get::<BatchConfig>(LAST_CONFIG_KEY), Some(config));
}
