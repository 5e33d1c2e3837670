use asploader::downloader::{
    AcceptSuggested, Container, DownloadJob, DownloadOrchestrator, DownloadOutcome,
    DownloadProgress, ProcessOutput, ProcessRunner, SaveDialog, ALL_ATTEMPTS_FAILED,
};
use asploader::utils::error::AspError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// What the stub does on one invocation
#[derive(Clone)]
enum Step {
    /// Exit non-zero with this stderr
    Fail(&'static str),
    /// Exit zero after writing the file (plus the usual leftovers)
    Produce(&'static str, &'static [u8]),
    /// Exit zero without writing anything
    Nothing,
    /// The program cannot be started
    SpawnError,
}

struct ScriptedRunner {
    steps: Vec<Step>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

fn scratch_dir_of(args: &[String]) -> PathBuf {
    let template = args
        .iter()
        .position(|a| a == "-o")
        .and_then(|i| args.get(i + 1))
        .expect("output template");
    Path::new(template).parent().unwrap().to_path_buf()
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        _progress: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<ProcessOutput, AspError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(args.to_vec());
            calls.len() - 1
        };

        match self.steps.get(index).cloned().unwrap_or(Step::Fail("unexpected call")) {
            Step::Fail(stderr) => Ok(ProcessOutput::failed(1, format!("{}\n", stderr))),
            Step::Produce(name, contents) => {
                let dir = scratch_dir_of(args);
                std::fs::write(dir.join(name), contents).unwrap();
                let stem = Path::new(name).file_stem().unwrap().to_string_lossy().into_owned();
                std::fs::write(dir.join(format!("{}.webp", stem)), b"thumb").unwrap();
                std::fs::write(dir.join(format!("{}.f137.mp4", stem)), b"video only").unwrap();
                Ok(ProcessOutput::ok())
            }
            Step::Nothing => Ok(ProcessOutput::ok()),
            Step::SpawnError => Err(AspError::Spawn {
                program: program.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
        }
    }
}

struct Dismiss;

#[async_trait]
impl SaveDialog for Dismiss {
    async fn choose_destination(&self, _suggested: &Path) -> Option<PathBuf> {
        None
    }
}

struct ChooseTo(PathBuf);

#[async_trait]
impl SaveDialog for ChooseTo {
    async fn choose_destination(&self, _suggested: &Path) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            temp: TempDir::new().expect("temp dir"),
        }
    }

    fn out_dir(&self) -> PathBuf {
        self.temp.path().join("out")
    }

    fn scratch_root(&self) -> PathBuf {
        self.temp.path().join("scratch")
    }

    fn orchestrator(&self, runner: Arc<ScriptedRunner>) -> DownloadOrchestrator {
        DownloadOrchestrator::new(PathBuf::from("yt-dlp"), runner)
            .with_ffmpeg(Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")))
            .with_scratch_root(self.scratch_root())
    }

    fn job(&self) -> DownloadJob {
        DownloadJob::new("https://www.youtube.com/watch?v=abc", self.out_dir())
    }

    fn scratch_removed(&self, job: &DownloadJob) -> bool {
        !self.scratch_root().join(job.id.to_string()).exists()
    }
}

#[tokio::test]
async fn third_attempt_succeeds_with_audio_only_reencode() {
    let fx = Fixture::new();
    let runner = ScriptedRunner::new(vec![
        Step::Fail("ERROR: Postprocessing: Conversion failed!"),
        Step::Fail("ERROR: Postprocessing: Conversion failed again"),
        Step::Produce("Clip.mp4", b"media"),
    ]);
    let job = fx.job();

    let outcome = fx.orchestrator(runner.clone()).run(&job, &AcceptSuggested).await;

    assert_eq!(outcome, DownloadOutcome::Completed(fx.out_dir().join("Clip.mp4")));
    assert_eq!(std::fs::read(fx.out_dir().join("Clip.mp4")).unwrap(), b"media");

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    // Encoder flags go to the merge step, which yt-dlp never skips for mp4
    assert!(value_after(&calls[0], "--postprocessor-args")
        .unwrap()
        .starts_with("Merger+ffmpeg_o:-c:v libx264 -profile:v baseline"));
    assert!(value_after(&calls[1], "--postprocessor-args")
        .unwrap()
        .starts_with("Merger+ffmpeg_o:-c:v libx264 -profile:v main"));
    assert!(!calls.iter().flatten().any(|a| a == "--recode-video"));

    let last = &calls[2];
    assert_eq!(value_after(last, "--postprocessor-args"), Some("Merger+ffmpeg_o:-c:a aac"));
    assert!(!last.iter().any(|a| a.contains("-c:v")));
    assert_eq!(value_after(last, "--ffmpeg-location"), Some("/opt/ffmpeg/bin/ffmpeg"));

    // Every attempt writes into the same job-scoped directory
    assert!(calls.iter().all(|c| scratch_dir_of(c) == scratch_dir_of(&calls[0])));
    assert!(fx.scratch_removed(&job));
}

#[tokio::test]
async fn exhausted_ladder_reports_failure_and_cleans_up() {
    let fx = Fixture::new();
    let runner = ScriptedRunner::new(vec![
        Step::Fail("first"),
        Step::Fail("second"),
        Step::Fail("third"),
    ]);
    let job = fx.job();

    let outcome = fx.orchestrator(runner.clone()).run(&job, &AcceptSuggested).await;

    match outcome {
        DownloadOutcome::Failed { reason, stderr } => {
            assert_eq!(reason, ALL_ATTEMPTS_FAILED);
            for text in ["first", "second", "third"] {
                assert!(stderr.contains(text), "stderr missing {}: {}", text, stderr);
            }
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(runner.calls().len(), 3);
    assert!(fx.scratch_removed(&job));
}

#[tokio::test]
async fn zero_exit_without_output_moves_to_next_attempt() {
    let fx = Fixture::new();
    let runner = ScriptedRunner::new(vec![Step::Nothing, Step::Produce("Clip.mp4", b"media")]);
    let job = fx.job();

    let outcome = fx.orchestrator(runner.clone()).run(&job, &AcceptSuggested).await;

    assert!(matches!(outcome, DownloadOutcome::Completed(_)));
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn existing_file_is_overwritten() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.out_dir()).unwrap();
    std::fs::write(fx.out_dir().join("Clip.mp4"), b"stale download").unwrap();
    let runner = ScriptedRunner::new(vec![Step::Produce("Clip.mp4", b"fresh")]);

    let outcome = fx.orchestrator(runner).run(&fx.job(), &AcceptSuggested).await;

    assert_eq!(outcome, DownloadOutcome::Completed(fx.out_dir().join("Clip.mp4")));
    assert_eq!(std::fs::read(fx.out_dir().join("Clip.mp4")).unwrap(), b"fresh");
}

#[tokio::test]
async fn dismissed_dialog_cancels_and_discards_the_file() {
    let fx = Fixture::new();
    let runner = ScriptedRunner::new(vec![Step::Produce("Song.mp3", b"audio")]);
    let job = fx.job().container(Container::Mp3).prompt_for_destination(true);

    let outcome = fx.orchestrator(runner).run(&job, &Dismiss).await;

    assert_eq!(outcome, DownloadOutcome::CancelledByUser);
    assert!(!fx.out_dir().join("Song.mp3").exists());
    assert!(fx.scratch_removed(&job));
}

#[tokio::test]
async fn dialog_choice_is_the_destination() {
    let fx = Fixture::new();
    let chosen = fx.temp.path().join("elsewhere").join("Renamed.mp4");
    let runner = ScriptedRunner::new(vec![Step::Produce("Clip.mp4", b"media")]);
    let job = fx.job().prompt_for_destination(true);

    let outcome = fx.orchestrator(runner).run(&job, &ChooseTo(chosen.clone())).await;

    assert_eq!(outcome, DownloadOutcome::Completed(chosen.clone()));
    assert_eq!(std::fs::read(&chosen).unwrap(), b"media");
    assert!(!fx.out_dir().join("Clip.mp4").exists());
}

#[tokio::test]
async fn mp3_has_a_single_attempt() {
    let fx = Fixture::new();
    let runner = ScriptedRunner::new(vec![
        Step::Fail("ERROR: audio conversion failed"),
        Step::Produce("Song.mp3", b"audio"),
    ]);
    let job = fx.job().container(Container::Mp3);

    let outcome = fx.orchestrator(runner.clone()).run(&job, &AcceptSuggested).await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Failed { ref reason, .. } if reason == ALL_ATTEMPTS_FAILED
    ));
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains(&"--extract-audio".to_string()));
    assert_eq!(value_after(&calls[0], "-f"), Some("bestaudio/best"));
}

#[tokio::test]
async fn spawn_failure_stops_the_ladder() {
    let fx = Fixture::new();
    let runner = ScriptedRunner::new(vec![Step::SpawnError, Step::Produce("Clip.mp4", b"media")]);
    let job = fx.job();

    let outcome = fx.orchestrator(runner.clone()).run(&job, &AcceptSuggested).await;

    match outcome {
        DownloadOutcome::Failed { reason, .. } => assert!(reason.contains("yt-dlp"), "{}", reason),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(runner.calls().len(), 1);
    assert!(fx.scratch_removed(&job));
}

#[tokio::test]
async fn unusable_output_directory_fails_before_spawning() {
    let fx = Fixture::new();
    std::fs::write(fx.out_dir(), b"a file, not a directory").unwrap();
    let runner = ScriptedRunner::new(vec![Step::Produce("Clip.mp4", b"media")]);

    let outcome = fx.orchestrator(runner.clone()).run(&fx.job(), &AcceptSuggested).await;

    assert!(matches!(outcome, DownloadOutcome::Failed { .. }));
    assert!(runner.calls().is_empty());
}
