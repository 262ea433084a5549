use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::error::Error;
use crate::limiter::RateLimiter;
use crate::operation::LineOperation;
use crate::output::LineSink;
use crate::stats::{RunStatistics, RunSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Lines admitted per second, 0 = unlimited.
    pub rate_limit: u32,
    /// Codec calls in flight at once, 0 = unlimited.
    pub max_workers: usize,
}

/// Runs a [`LineOperation`] over every line of an input stream.
///
/// Lines are split on `\n` (a trailing `\r` is dropped) and passed on as raw
/// bytes. Each line is rate gated, then waits for a worker slot, then runs on
/// the blocking pool. Successful results go to the sink; failures are only
/// counted. Output order follows completion order, not input order.
pub struct Pipeline<O> {
    operation: Arc<O>,
    config: PipelineConfig,
}

impl<O: LineOperation> Pipeline<O> {
    pub fn new(operation: O, config: PipelineConfig) -> Self {
        Self { operation: Arc::new(operation), config }
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Processes `input` to the end and waits for every dispatched line.
    ///
    /// An I/O error reading `input` or a fatal codec error stops admission of
    /// new lines. Line content is never a read error. Work already dispatched
    /// still finishes and is counted before the error is returned.
    #[tracing::instrument(
        skip_all,
        fields(rate_limit = self.config.rate_limit, max_workers = self.config.max_workers)
    )]
    pub async fn run<R, W>(
        &self,
        input: R,
        sink: Arc<LineSink<W>>,
        stats: Arc<RunStatistics>,
    ) -> Result<RunSummary, Error>
    where
        R: AsyncBufRead + Unpin,
        W: Write + Send + 'static,
    {
        let mut limiter = RateLimiter::new(self.config.rate_limit);
        let max_workers = self.config.max_workers;
        let workers = (max_workers > 0).then(|| Arc::new(Semaphore::new(max_workers)));

        let mut lines = input.split(b'\n');
        let mut tasks = JoinSet::new();

        let admission: Result<(), Error> = 'admit: loop {
            // Reap finished lines so a fatal error stops admission early and
            // the set does not grow with the input.
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = settle(joined) {
                    break 'admit Err(e);
                }
            }

            let mut line = match lines.next_segment().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(Error::Input(e)),
            };

            if line.last() == Some(&b'\r') {
                line.pop();
            }

            limiter.take().await;

            let permit = match &workers {
                Some(workers) => match Arc::clone(workers).acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => break Err(e.into()),
                },
                None => None,
            };

            let operation = Arc::clone(&self.operation);
            let sink = Arc::clone(&sink);
            let stats = Arc::clone(&stats);
            tasks.spawn_blocking(move || {
                let result = process_line(operation.as_ref(), &line, &sink, &stats);
                drop(permit);
                result
            });
        };

        if let Err(e) = &admission {
            warn!(error = %e, outstanding = tasks.len(), "stopped admitting lines");
        }

        let mut outcome = admission;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = settle(joined) {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }

        let flushed = sink.flush();
        outcome?;
        flushed?;

        Ok(stats.summary())
    }
}

fn settle(joined: Result<Result<(), aspnet_hash::Error>, JoinError>) -> Result<(), Error> {
    joined??;
    Ok(())
}

/// Runs one line to completion. Only fatal codec errors escape; everything
/// else ends up in the counters.
fn process_line<O, W>(
    operation: &O,
    line: &[u8],
    sink: &LineSink<W>,
    stats: &RunStatistics,
) -> Result<(), aspnet_hash::Error>
where
    O: LineOperation + ?Sized,
    W: Write,
{
    match operation.apply(line) {
        Ok(output) => match sink.emit(&output) {
            Ok(()) => stats.record_success(),
            Err(e) => {
                warn!(error = %e, "failed to write output line");
                stats.record_error();
            }
        },
        Err(e) if e.is_fatal() => {
            stats.record_error();
            return Err(e);
        }
        Err(e) => {
            debug!(error = %e, "skipping line");
            stats.record_error();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};
    use std::time::{Duration, Instant};

    use aspnet_hash::{HashParameters, HashScheme};
    use tokio::io::{AsyncRead, BufReader, ReadBuf};

    use super::*;
    use crate::operation::Operation;

    const ZERO_BLOB: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==";

    async fn run_input<O, R>(
        pipeline: &Pipeline<O>,
        input: R,
    ) -> (Result<RunSummary, Error>, Arc<RunStatistics>, String)
    where
        O: LineOperation,
        R: AsyncBufRead + Unpin,
    {
        let sink = Arc::new(LineSink::new(Vec::new()));
        let stats = Arc::new(RunStatistics::new());
        let result = pipeline.run(input, Arc::clone(&sink), Arc::clone(&stats)).await;

        let out = Arc::try_unwrap(sink).unwrap().into_inner();
        (result, stats, String::from_utf8_lossy(&out).into_owned())
    }

    async fn run_lines<O: LineOperation>(
        pipeline: &Pipeline<O>,
        input: &[u8],
    ) -> (Result<RunSummary, Error>, Arc<RunStatistics>, String) {
        run_input(pipeline, input).await
    }

    /// Records how many `apply` calls overlap.
    #[derive(Default)]
    struct Tracking {
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl LineOperation for Tracking {
        fn apply(&self, line: &[u8]) -> Result<Vec<u8>, aspnet_hash::Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(line.to_vec())
        }
    }

    /// Remembers the order in which `apply` calls began.
    #[derive(Default)]
    struct StartOrder {
        started: Mutex<Vec<Vec<u8>>>,
    }

    impl LineOperation for StartOrder {
        fn apply(&self, line: &[u8]) -> Result<Vec<u8>, aspnet_hash::Error> {
            self.started.lock().unwrap().push(line.to_vec());
            std::thread::sleep(Duration::from_millis(1));
            Ok(line.to_vec())
        }
    }

    /// Fails like a dead entropy source on the line "boom".
    struct Exploding;

    impl LineOperation for Exploding {
        fn apply(&self, line: &[u8]) -> Result<Vec<u8>, aspnet_hash::Error> {
            if line == b"boom" {
                let err = rand::Error::new(io::Error::other("no entropy"));
                return Err(aspnet_hash::Error::Randomness(err));
            }
            Ok(line.to_vec())
        }
    }

    /// Hands out `data`, then fails every read after it.
    struct BrokenReader {
        data: Option<&'static [u8]>,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::other("device went away"))),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_convert_counts_and_output() {
        let pipeline = Pipeline::new(
            Operation::Convert { delimiter: None, iterations: 1000 },
            PipelineConfig::default(),
        );
        let input = format!("{ZERO_BLOB}\nAAAA\n!!!\n\n  {ZERO_BLOB}  \r\n");
        let (result, _, out) = run_lines(&pipeline, input.as_bytes()).await;

        let summary = result.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errored, 3);

        let expected =
            "sha1:1000:AAAAAAAAAAAAAAAAAAAAAA==:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, [expected, expected]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_convert_with_usernames() {
        let pipeline = Pipeline::new(
            Operation::Convert { delimiter: Some(";".into()), iterations: 2000 },
            PipelineConfig { rate_limit: 0, max_workers: 2 },
        );
        let input = format!("erin;{ZERO_BLOB}\nfrank {ZERO_BLOB}\ngrace;{ZERO_BLOB}\n");
        let (result, _, out) = run_lines(&pipeline, input.as_bytes()).await;

        let summary = result.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errored, 1);

        let users: HashSet<&str> = out.lines().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(users, HashSet::from(["erin", "grace"]));
        assert!(out.lines().all(|l| l.contains(":sha1:2000:")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_every_generated_line_is_emitted() {
        let pipeline = Pipeline::new(
            Operation::Generate { scheme: HashScheme::WebForms, params: HashParameters::default() },
            PipelineConfig { rate_limit: 0, max_workers: 4 },
        );
        let input: String = (0..200).map(|i| format!("password{i}\n")).collect();
        let (result, _, out) = run_lines(&pipeline, input.as_bytes()).await;

        let summary = result.unwrap();
        assert_eq!(summary.processed, 200);
        assert_eq!(summary.errored, 0);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.matches(',').count() == 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_non_utf8_lines_are_processed() {
        let pipeline = Pipeline::new(
            Operation::Generate { scheme: HashScheme::Mvc4, params: HashParameters::default() },
            PipelineConfig::default(),
        );
        let (result, _, out) = run_lines(&pipeline, b"alpha\npassw\xf6rd\nbeta\ngamma\n").await;

        let summary = result.unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.errored, 0);
        assert_eq!(out.lines().count(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lines_are_passed_as_raw_bytes() {
        let pipeline = Pipeline::new(Tracking::default(), PipelineConfig::default());
        let sink = Arc::new(LineSink::new(Vec::new()));
        let stats = Arc::new(RunStatistics::new());
        let input: &[u8] = b"caf\xe9\r\nplain\nlast-without-newline";

        let summary = pipeline.run(input, Arc::clone(&sink), stats).await.unwrap();
        assert_eq!(summary.processed, 3);

        let out = Arc::try_unwrap(sink).unwrap().into_inner();
        let mut lines: Vec<&[u8]> = out.split(|&b| b == b'\n').filter(|l| !l.is_empty()).collect();
        lines.sort();
        let expected: [&[u8]; 3] = [b"caf\xe9", b"last-without-newline", b"plain"];
        assert_eq!(lines, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_ceiling_is_respected() {
        for max_workers in [1, 3, 8] {
            let pipeline =
                Pipeline::new(Tracking::default(), PipelineConfig { rate_limit: 0, max_workers });
            let input: String = (0..64).map(|i| format!("{i}\n")).collect();
            let (result, _, out) = run_lines(&pipeline, input.as_bytes()).await;

            assert_eq!(result.unwrap().processed, 64);
            assert_eq!(out.lines().count(), 64);

            let high_water = pipeline.operation().high_water.load(Ordering::SeqCst);
            assert!(high_water >= 1);
            assert!(high_water <= max_workers, "{high_water} > {max_workers}");
            assert_eq!(pipeline.operation().in_flight.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lines_start_in_input_order() {
        let config = PipelineConfig { rate_limit: 200, max_workers: 1 };
        let pipeline = Pipeline::new(StartOrder::default(), config);
        let lines: Vec<Vec<u8>> = (0..20).map(|i| format!("line-{i}").into_bytes()).collect();
        let input = lines.join(&b'\n');

        let start = Instant::now();
        let (result, _, _) = run_lines(&pipeline, &input).await;

        assert_eq!(result.unwrap().processed, 20);
        assert_eq!(*pipeline.operation().started.lock().unwrap(), lines);
        // 20 slots at 5ms spacing
        assert!(start.elapsed() >= Duration::from_millis(95));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unlimited_workers_run_every_line() {
        let pipeline = Pipeline::new(Tracking::default(), PipelineConfig::default());
        let input: String = (0..64).map(|i| format!("{i}\n")).collect();
        let (result, _, out) = run_lines(&pipeline, input.as_bytes()).await;

        assert_eq!(result.unwrap().processed, 64);
        let seen: HashSet<&str> = out.lines().collect();
        assert_eq!(seen.len(), 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rate_limit_spaces_lines() {
        let pipeline =
            Pipeline::new(Tracking::default(), PipelineConfig { rate_limit: 50, max_workers: 0 });
        let start = Instant::now();
        let (result, _, _) = run_lines(&pipeline, b"a\nb\nc\nd\ne\nf\n").await;

        assert_eq!(result.unwrap().processed, 6);
        // six slots at 20ms spacing
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_empty_input() {
        let pipeline = Pipeline::new(Tracking::default(), PipelineConfig::default());
        let (result, _, out) = run_lines(&pipeline, b"").await;

        let summary = result.unwrap();
        assert_eq!((summary.processed, summary.errored), (0, 0));
        assert!(out.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_read_error_is_fatal_after_draining() {
        let pipeline = Pipeline::new(Tracking::default(), PipelineConfig::default());
        let input = BufReader::new(BrokenReader { data: Some(b"first\nsecond\npartial") });
        let (result, stats, out) = run_input(&pipeline, input).await;

        match result {
            Err(Error::Input(e)) => assert_eq!(e.to_string(), "device went away"),
            other => panic!("expected input error, got {other:?}"),
        }
        // the unterminated tail is never admitted
        let summary = stats.summary();
        assert_eq!((summary.processed, summary.errored), (2, 0));
        let mut lines: Vec<&str> = out.lines().collect();
        lines.sort();
        assert_eq!(lines, ["first", "second"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fatal_codec_error_aborts_run() {
        let pipeline =
            Pipeline::new(Exploding, PipelineConfig { rate_limit: 0, max_workers: 1 });
        let input: String = std::iter::once("boom\n".to_string())
            .chain((0..100).map(|i| format!("{i}\n")))
            .collect();
        let (result, stats, out) = run_lines(&pipeline, input.as_bytes()).await;

        match result {
            Err(Error::Codec(e)) => assert!(e.is_fatal()),
            other => panic!("expected fatal codec error, got {other:?}"),
        }
        assert_eq!(stats.summary().errored, 1);
        assert!(!out.contains("boom"));
    }
}
