//! 抓取调度器 - 编排层
//!
//! 遍历文档列表，为每篇文档调用一次 [`Fetcher`]，收集成功的片段并统计失败数。
//!
//! - 顺序模式：按输入顺序逐篇处理，成功和失败后分别暂停
//! - 并发模式：每篇文档一个 tokio 任务，Semaphore 限制同时进行的请求数；
//!   每个任务完成后通过 channel 发送一条完成消息，由唯一的消费者汇总。
//!   失败后的暂停只发生在消费者一侧，不影响正在运行的任务。
//!
//! 无论哪种模式，每篇文档只处理一次，且 `片段数 + 失败数 == 文档数`。

use crate::clients::Fetcher;
use crate::error::FetchError;
use crate::models::document::{DataType, DocumentRecord, DocumentUri, FetchOutcome, FetchTarget};
use crate::progress::{ProgressEvent, ProgressReporter};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info};

/// 执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// 顺序执行
    Sequential {
        pause_after_success: Duration,
        pause_after_error: Duration,
    },
    /// 并发执行
    Parallel {
        max_workers: usize,
        pause_after_error: Duration,
        /// 结束后按输入顺序重排片段
        sort_by_input: bool,
    },
}

/// 一次运行的汇总结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    /// 成功获取的 Turtle 片段
    pub fragments: Vec<String>,
    /// 失败数量
    pub error_count: usize,
}

impl AggregateResult {
    pub fn success_count(&self) -> usize {
        self.fragments.len()
    }

    /// 已处理的文档数（成功 + 失败）
    pub fn processed(&self) -> usize {
        self.fragments.len() + self.error_count
    }
}

/// 并发任务发回的完成消息
struct Completion {
    index: usize,
    record: DocumentRecord,
    outcome: FetchOutcome,
}

/// 抓取调度器
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    document_uri_template: String,
    progress: Box<dyn ProgressReporter>,
}

impl Dispatcher {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        document_uri_template: impl Into<String>,
        progress: Box<dyn ProgressReporter>,
    ) -> Self {
        Self {
            fetcher,
            document_uri_template: document_uri_template.into(),
            progress,
        }
    }

    /// 处理整个文档列表
    pub async fn run(
        &self,
        documents: &[DocumentRecord],
        data_type: DataType,
        mode: ExecMode,
    ) -> AggregateResult {
        self.progress.report(ProgressEvent::Started {
            data_type,
            total: documents.len(),
        });

        match mode {
            ExecMode::Sequential {
                pause_after_success,
                pause_after_error,
            } => {
                info!("以顺序模式运行");
                self.run_sequential(documents, data_type, pause_after_success, pause_after_error)
                    .await
            }
            ExecMode::Parallel {
                max_workers,
                pause_after_error,
                sort_by_input,
            } => {
                info!("以 {} 个并发运行", max_workers);
                self.run_parallel(
                    documents,
                    data_type,
                    max_workers.max(1),
                    pause_after_error,
                    sort_by_input,
                )
                .await
            }
        }
    }

    async fn run_sequential(
        &self,
        documents: &[DocumentRecord],
        data_type: DataType,
        pause_after_success: Duration,
        pause_after_error: Duration,
    ) -> AggregateResult {
        let total = documents.len();
        let mut result = AggregateResult::default();

        for (index, record) in documents.iter().enumerate() {
            let target = self.build_target(record, data_type);
            match process_document(self.fetcher.as_ref(), record, target).await {
                Ok(fragment) => {
                    debug!(
                        "已记录 {} 数据: 文档 {}, DOI {}",
                        data_type, record.paper_id, record.doi
                    );
                    result.fragments.push(fragment);
                    tokio::time::sleep(pause_after_success).await;
                }
                Err(_) => {
                    result.error_count += 1;
                    tokio::time::sleep(pause_after_error).await;
                }
            }

            self.progress.report(ProgressEvent::Advanced {
                data_type,
                n: index + 1,
                total,
                errors: result.error_count,
            });
        }

        result
    }

    async fn run_parallel(
        &self,
        documents: &[DocumentRecord],
        data_type: DataType,
        max_workers: usize,
        pause_after_error: Duration,
        sort_by_input: bool,
    ) -> AggregateResult {
        let total = documents.len();
        let semaphore = Arc::new(Semaphore::new(max_workers));
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();

        for (index, record) in documents.iter().enumerate() {
            let target = self.build_target(record, data_type);
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let record = record.clone();

            tokio::spawn(
                async move {
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(permit) => {
                            let outcome =
                                process_document(fetcher.as_ref(), &record, target).await;
                            drop(permit);
                            outcome
                        }
                        Err(e) => {
                            let err = FetchError::Other(format!("无法获取并发许可: {}", e));
                            log_unexpected(&record, &err);
                            Err(err)
                        }
                    };
                    // 接收端只会在所有消息处理完之后关闭
                    let _ = tx.send(Completion {
                        index,
                        record,
                        outcome,
                    });
                }
                .with_current_subscriber(),
            );
        }
        drop(tx);

        let mut completed: Vec<(usize, String)> = Vec::with_capacity(total);
        let mut error_count = 0usize;
        let mut received = 0usize;

        while let Some(done) = rx.recv().await {
            received += 1;
            match done.outcome {
                Ok(fragment) => {
                    debug!(
                        "已记录 {} 数据: 文档 {}, DOI {}",
                        data_type, done.record.paper_id, done.record.doi
                    );
                    completed.push((done.index, fragment));
                }
                Err(_) => {
                    error_count += 1;
                    tokio::time::sleep(pause_after_error).await;
                }
            }

            self.progress.report(ProgressEvent::Advanced {
                data_type,
                n: received,
                total,
                errors: error_count,
            });
        }

        if received < total {
            error!(
                "❌ {} 个任务没有返回结果，按失败计数",
                total - received
            );
            error_count += total - received;
        }

        if sort_by_input {
            completed.sort_by_key(|(index, _)| *index);
        }

        AggregateResult {
            fragments: completed.into_iter().map(|(_, fragment)| fragment).collect(),
            error_count,
        }
    }

    /// 由文档记录构建抓取目标，记录不完整时直接返回错误
    fn build_target(
        &self,
        record: &DocumentRecord,
        data_type: DataType,
    ) -> Result<FetchTarget, FetchError> {
        let paper_id = record.paper_id.trim();
        let doi = record.doi.trim();

        if paper_id.is_empty() {
            return Err(FetchError::Other(format!(
                "记录缺少 paper_id (DOI '{}')",
                record.doi
            )));
        }
        if doi.is_empty() {
            return Err(FetchError::Other(format!(
                "记录缺少 DOI (paper_id '{}')",
                record.paper_id
            )));
        }

        Ok(FetchTarget::new(
            data_type,
            DocumentUri::render(&self.document_uri_template, paper_id),
            doi,
        ))
    }
}

/// 处理单篇文档，fetch 过程中的 panic 转换为失败
///
/// Fetcher 自己记录它返回的失败；记录不完整和 panic 在这里记录。
async fn process_document(
    fetcher: &dyn Fetcher,
    record: &DocumentRecord,
    target: Result<FetchTarget, FetchError>,
) -> FetchOutcome {
    let target = match target {
        Ok(target) => target,
        Err(err) => {
            log_unexpected(record, &err);
            return Err(err);
        }
    };
    match AssertUnwindSafe(fetcher.fetch(&target)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let err = FetchError::Other(format!(
                "处理 {} 时发生 panic: {}",
                target,
                panic_message(payload.as_ref())
            ));
            log_unexpected(record, &err);
            Err(err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}

fn log_unexpected(record: &DocumentRecord, err: &FetchError) {
    error!(
        paper_id = %record.paper_id,
        doi = %record.doi,
        error_kind = err.kind(),
        "{}: 处理文档时发生异常 (paper_id {}, DOI {}): {}",
        err.kind(),
        record.paper_id,
        record.doi,
        err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const TEMPLATE: &str = "http://data-issa.example.org/document/{id}";

    /// 按 DOI 决定结果的测试客户端
    ///
    /// - DOI 以 `fail` 开头：返回 HTTP 500
    /// - DOI 以 `panic` 开头：panic
    /// - 其他：返回一个片段
    #[derive(Default)]
    struct ScriptedFetcher {
        calls: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay_ms: u64,
    }

    impl ScriptedFetcher {
        fn with_delay(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                ..Default::default()
            }
        }

        fn calls(&self) -> HashMap<String, usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn fragment_for(doi: &str) -> String {
        format!("@prefix ex: <http://ex.org/> .\n<urn:doi:{}> ex:p ex:o .", doi)
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, target: &FetchTarget) -> FetchOutcome {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(target.doi.clone())
                .or_default() += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.delay_ms > 0 {
                // 越靠后的文档越快完成，打乱完成顺序
                let rank: u64 = target
                    .document_uri
                    .as_str()
                    .rsplit('/')
                    .next()
                    .and_then(|id| id.parse().ok())
                    .unwrap_or(0);
                let delay = self.delay_ms.saturating_sub(rank % self.delay_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if target.doi.starts_with("panic") {
                panic!("scripted panic for {}", target.doi);
            }
            if target.doi.starts_with("fail") {
                return Err(FetchError::Http {
                    status: 500,
                    body: "scripted failure".to_string(),
                });
            }
            Ok(fragment_for(&target.doi))
        }
    }

    fn documents(n: usize) -> Vec<DocumentRecord> {
        (0..n)
            .map(|i| DocumentRecord::new(i.to_string(), format!("10.1000/{}", i)))
            .collect()
    }

    fn dispatcher(fetcher: Arc<ScriptedFetcher>) -> Dispatcher {
        Dispatcher::new(fetcher, TEMPLATE, Box::new(NoProgress))
    }

    fn sequential() -> ExecMode {
        ExecMode::Sequential {
            pause_after_success: Duration::ZERO,
            pause_after_error: Duration::ZERO,
        }
    }

    fn parallel(max_workers: usize) -> ExecMode {
        ExecMode::Parallel {
            max_workers,
            pause_after_error: Duration::ZERO,
            sort_by_input: false,
        }
    }

    #[tokio::test]
    async fn test_sequential_preserves_input_order() {
        let docs = documents(5);
        let fetcher = Arc::new(ScriptedFetcher::default());
        let result = dispatcher(fetcher.clone())
            .run(&docs, DataType::Topics, sequential())
            .await;

        let expected: Vec<String> = docs.iter().map(|d| fragment_for(&d.doi)).collect();
        assert_eq!(result.fragments, expected);
        assert_eq!(result.error_count, 0);
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_counts_failures_and_panics() {
        let docs = vec![
            DocumentRecord::new("1", "10.1000/1"),
            DocumentRecord::new("2", "fail/2"),
            DocumentRecord::new("3", "panic/3"),
            DocumentRecord::new("4", "10.1000/4"),
        ];
        let result = dispatcher(Arc::new(ScriptedFetcher::default()))
            .run(&docs, DataType::Sdgs, sequential())
            .await;

        assert_eq!(
            result.fragments,
            vec![fragment_for("10.1000/1"), fragment_for("10.1000/4")]
        );
        assert_eq!(result.error_count, 2);
        assert_eq!(result.processed(), docs.len());
    }

    #[tokio::test]
    async fn test_malformed_record_is_failure_without_fetch() {
        let docs = vec![
            DocumentRecord::new("1", "  "),
            DocumentRecord::new("", "10.1000/2"),
            DocumentRecord::new("3", "10.1000/3"),
        ];
        let fetcher = Arc::new(ScriptedFetcher::default());
        let result = dispatcher(fetcher.clone())
            .run(&docs, DataType::Authorships, sequential())
            .await;

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.error_count, 2);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_list() {
        for mode in [sequential(), parallel(4)] {
            let result = dispatcher(Arc::new(ScriptedFetcher::default()))
                .run(&[], DataType::Topics, mode)
                .await;
            assert_eq!(result, AggregateResult::default());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_count_invariant_for_worker_counts() {
        let mut docs = documents(20);
        docs[3].doi = "fail/3".to_string();
        docs[11].doi = "panic/11".to_string();
        docs[17].doi = "fail/17".to_string();

        for workers in [1, 4, docs.len()] {
            let fetcher = Arc::new(ScriptedFetcher::with_delay(5));
            let result = dispatcher(fetcher.clone())
                .run(&docs, DataType::Topics, parallel(workers))
                .await;

            assert_eq!(result.processed(), docs.len(), "workers = {}", workers);
            assert_eq!(result.error_count, 3, "workers = {}", workers);
            assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= workers);

            // 每篇文档恰好请求一次
            let calls = fetcher.calls();
            assert_eq!(calls.len(), docs.len());
            assert!(calls.values().all(|&n| n == 1));

            // 成功片段不重复、不遗漏
            let got: HashSet<&String> = result.fragments.iter().collect();
            let expected: Vec<String> = docs
                .iter()
                .filter(|d| !d.doi.starts_with("fail") && !d.doi.starts_with("panic"))
                .map(|d| fragment_for(&d.doi))
                .collect();
            assert_eq!(got.len(), result.fragments.len());
            assert_eq!(got, expected.iter().collect::<HashSet<_>>());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_sort_by_input() {
        let docs = documents(12);
        let mode = ExecMode::Parallel {
            max_workers: 6,
            pause_after_error: Duration::ZERO,
            sort_by_input: true,
        };
        let result = dispatcher(Arc::new(ScriptedFetcher::with_delay(10)))
            .run(&docs, DataType::Sdgs, mode)
            .await;

        let expected: Vec<String> = docs.iter().map(|d| fragment_for(&d.doi)).collect();
        assert_eq!(result.fragments, expected);
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for Arc<RecordingProgress> {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_progress_advances_once_per_document() {
        let progress = Arc::new(RecordingProgress::default());
        let dispatcher = Dispatcher::new(
            Arc::new(ScriptedFetcher::default()),
            TEMPLATE,
            Box::new(progress.clone()),
        );
        let mut docs = documents(3);
        docs[1].doi = "fail/1".to_string();

        dispatcher.run(&docs, DataType::Topics, parallel(2)).await;

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(
            events[0],
            ProgressEvent::Started {
                data_type: DataType::Topics,
                total: 3
            }
        );
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3],
            ProgressEvent::Advanced {
                data_type: DataType::Topics,
                n: 3,
                total: 3,
                errors: 1
            }
        );
    }

    #[tokio::test]
    async fn test_error_pause_does_not_block_workers() {
        let pause = Duration::from_millis(200);
        let docs: Vec<DocumentRecord> = (0..4)
            .map(|i| DocumentRecord::new(i.to_string(), format!("fail/{}", i)))
            .collect();

        for workers in [1, docs.len()] {
            let fetcher = Arc::new(ScriptedFetcher::default());
            let dispatcher = dispatcher(fetcher.clone());
            let mode = ExecMode::Parallel {
                max_workers: workers,
                pause_after_error: pause,
                sort_by_input: false,
            };

            let started = std::time::Instant::now();
            // 在消费者第一次暂停期间采样已发出的请求数
            let sample = async {
                tokio::time::sleep(pause / 2).await;
                fetcher.calls().len()
            };
            let (result, calls_during_first_pause) =
                tokio::join!(dispatcher.run(&docs, DataType::Topics, mode), sample);

            assert_eq!(calls_during_first_pause, docs.len(), "workers = {}", workers);
            assert_eq!(result.error_count, docs.len());
            assert!(started.elapsed() >= pause * docs.len() as u32);
        }
    }

    #[tokio::test]
    async fn test_sequential_pauses_after_each_success() {
        let pause = Duration::from_millis(50);
        let docs = documents(2);
        let mode = ExecMode::Sequential {
            pause_after_success: pause,
            pause_after_error: Duration::ZERO,
        };

        let started = std::time::Instant::now();
        let result = dispatcher(Arc::new(ScriptedFetcher::default()))
            .run(&docs, DataType::Authorships, mode)
            .await;

        assert_eq!(result.success_count(), 2);
        assert!(started.elapsed() >= pause * 2);
    }

    #[tokio::test]
    async fn test_sequential_pauses_after_each_error() {
        let pause = Duration::from_millis(50);
        let docs = vec![
            DocumentRecord::new("1", "fail/1"),
            DocumentRecord::new("2", "panic/2"),
        ];
        let mode = ExecMode::Sequential {
            pause_after_success: Duration::ZERO,
            pause_after_error: pause,
        };

        let started = std::time::Instant::now();
        let result = dispatcher(Arc::new(ScriptedFetcher::default()))
            .run(&docs, DataType::Sdgs, mode)
            .await;

        assert_eq!(result.error_count, 2);
        assert!(started.elapsed() >= pause * 2);
    }
}
