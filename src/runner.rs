//! Bounded-concurrency task runner for per-object raw extraction.
//!
//! Workers share a FIFO task queue and write only to append-only result
//! channels; the controlling thread is the sole consumer and the sole owner
//! of the accumulators. A freed worker admits the next queued task
//! immediately rather than waiting for its whole generation to finish.

use std::collections::{HashSet, VecDeque};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use tracing::{debug, warn};

use crate::errors::ExtractError;
use crate::extractor::extract_raw;
use crate::record::RawRecord;
use crate::source::{ObjectDescriptor, ResourceProvider, RowDecoder};
use crate::types::FileName;
use crate::window::DateTriple;

/// Unit of parallel work: one raw object, consumed by exactly one worker.
#[derive(Clone, Debug)]
pub struct ExtractionTask {
    /// Day the object belongs to.
    pub day: DateTriple,
    /// Object to open and extract.
    pub object: ObjectDescriptor,
    /// When set, the task contributes identity keys only (next window).
    pub only_indexes: bool,
}

/// Descriptor of a task whose extraction failed.
#[derive(Clone, Debug)]
pub struct TaskFailure {
    /// Day of the failed task.
    pub day: DateTriple,
    /// Object of the failed task.
    pub object: ObjectDescriptor,
    /// Failure reason.
    pub reason: String,
}

/// Merged output of one parallel run.
///
/// Failed tasks are surfaced in `failures` instead of silently dropping
/// their contribution; callers decide whether to abort.
#[derive(Debug, Default)]
pub struct TaskHarvest {
    /// Records from all current-window tasks, in task order.
    pub records: Vec<RawRecord>,
    /// Union of identity keys from current-window tasks.
    pub window_keys: HashSet<FileName>,
    /// Union of identity keys from next-window tasks.
    pub next_window_keys: HashSet<FileName>,
    /// Tasks whose contribution is missing from the sets above.
    pub failures: Vec<TaskFailure>,
}

enum WorkerMessage {
    Data {
        task_idx: usize,
        records: Vec<RawRecord>,
        keys: HashSet<FileName>,
    },
    Indexes {
        keys: HashSet<FileName>,
    },
    Failed(TaskFailure),
}

/// Run every task across at most `worker_budget` concurrent workers.
///
/// Ordering across tasks is not guaranteed during execution; record output
/// is re-sorted into task order afterwards and the key sets are plain
/// unions, so worker completion order never affects the result.
pub fn run_tasks(
    provider: &dyn ResourceProvider,
    decoder: &dyn RowDecoder,
    tasks: Vec<ExtractionTask>,
    worker_budget: usize,
    cap: Option<usize>,
) -> TaskHarvest {
    let total = tasks.len();
    let queue: Mutex<VecDeque<(usize, ExtractionTask)>> =
        Mutex::new(tasks.into_iter().enumerate().collect());
    let workers = worker_budget.max(1).min(total);
    let (message_tx, message_rx) = mpsc::channel::<WorkerMessage>();

    thread::scope(|scope| {
        for worker in 0..workers {
            let queue = &queue;
            let message_tx = message_tx.clone();
            scope.spawn(move || loop {
                let next = queue.lock().expect("task queue poisoned").pop_front();
                let Some((task_idx, task)) = next else {
                    break;
                };
                debug!(worker, task_idx, object = %task.object.path, "task started");
                match run_one(provider, decoder, &task, cap) {
                    Ok(harvest) => {
                        let message = if task.only_indexes {
                            WorkerMessage::Indexes { keys: harvest.keys }
                        } else {
                            WorkerMessage::Data {
                                task_idx,
                                records: harvest.records,
                                keys: harvest.keys,
                            }
                        };
                        if message_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(worker, object = %task.object.path, error = %err, "task failed");
                        let failed = WorkerMessage::Failed(TaskFailure {
                            day: task.day,
                            object: task.object,
                            reason: err.to_string(),
                        });
                        if message_tx.send(failed).is_err() {
                            break;
                        }
                    }
                }
            });
        }
        drop(message_tx);

        let mut harvest = TaskHarvest::default();
        let mut data_parts: Vec<(usize, Vec<RawRecord>)> = Vec::new();
        for message in message_rx {
            match message {
                WorkerMessage::Data {
                    task_idx,
                    records,
                    keys,
                } => {
                    data_parts.push((task_idx, records));
                    harvest.window_keys.extend(keys);
                }
                WorkerMessage::Indexes { keys } => {
                    harvest.next_window_keys.extend(keys);
                }
                WorkerMessage::Failed(failure) => harvest.failures.push(failure),
            }
        }
        // Restore task order so parallel runs serialize like sequential ones.
        data_parts.sort_by_key(|(task_idx, _)| *task_idx);
        for (_, records) in data_parts {
            harvest.records.extend(records);
        }
        harvest
    })
}

fn run_one(
    provider: &dyn ResourceProvider,
    decoder: &dyn RowDecoder,
    task: &ExtractionTask,
    cap: Option<usize>,
) -> Result<crate::extractor::DayHarvest, ExtractError> {
    let bytes = provider.open(&task.object)?;
    let rows = decoder.decode(&bytes)?;
    Ok(extract_raw(rows, task.only_indexes, cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemoryProvider, JsonLinesDecoder};

    fn blob(names: &[&str]) -> Vec<u8> {
        names
            .iter()
            .map(|name| {
                format!(
                    r#"{{"FileName":"{name}","SiteName":"T2_IT_Bari","ProcessType":"analysis","FileType":"MINIAOD","NumAccesses":1}}"#
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes()
    }

    fn fixture() -> (InMemoryProvider, Vec<ExtractionTask>) {
        let day_a = DateTriple::new(2018, 5, 27).unwrap();
        let day_b = DateTriple::new(2018, 5, 28).unwrap();
        let next_day = DateTriple::new(2018, 6, 3).unwrap();

        let mut provider = InMemoryProvider::new();
        provider.add_object(day_a, "a/part-0", blob(&["/store/f1.root", "/store/f2.root"]));
        provider.add_object(day_b, "b/part-0", blob(&["/store/f1.root"]));
        provider.add_object(next_day, "n/part-0", blob(&["/store/f2.root", "/store/f3.root"]));

        let tasks = vec![
            ExtractionTask {
                day: day_a,
                object: ObjectDescriptor::new("a/part-0"),
                only_indexes: false,
            },
            ExtractionTask {
                day: day_b,
                object: ObjectDescriptor::new("b/part-0"),
                only_indexes: false,
            },
            ExtractionTask {
                day: next_day,
                object: ObjectDescriptor::new("n/part-0"),
                only_indexes: true,
            },
        ];
        (provider, tasks)
    }

    #[test]
    fn harvest_merges_channels_by_task_kind() {
        let (provider, tasks) = fixture();
        let harvest = run_tasks(&provider, &JsonLinesDecoder, tasks, 2, None);

        assert!(harvest.failures.is_empty());
        assert_eq!(harvest.records.len(), 3);
        assert_eq!(harvest.window_keys.len(), 2);
        assert_eq!(harvest.next_window_keys.len(), 2);
        assert!(harvest.next_window_keys.contains("/store/f3.root"));
        // Records come back in task order.
        assert_eq!(harvest.records[0].file_name, "/store/f1.root");
        assert_eq!(harvest.records[2].file_name, "/store/f1.root");
    }

    #[test]
    fn worker_budget_one_matches_wider_budgets() {
        let (provider, tasks) = fixture();
        let narrow = run_tasks(&provider, &JsonLinesDecoder, tasks.clone(), 1, None);
        let wide = run_tasks(&provider, &JsonLinesDecoder, tasks, 8, None);

        assert_eq!(narrow.records, wide.records);
        assert_eq!(narrow.window_keys, wide.window_keys);
        assert_eq!(narrow.next_window_keys, wide.next_window_keys);
    }

    #[test]
    fn failed_tasks_are_surfaced_not_dropped() {
        let (provider, mut tasks) = fixture();
        tasks.push(ExtractionTask {
            day: DateTriple::new(2018, 5, 29).unwrap(),
            object: ObjectDescriptor::new("missing/part-0"),
            only_indexes: false,
        });
        let harvest = run_tasks(&provider, &JsonLinesDecoder, tasks, 2, None);

        assert_eq!(harvest.failures.len(), 1);
        assert_eq!(harvest.failures[0].object.path, "missing/part-0");
        // Open failures are classed as unavailability, not decode errors.
        assert!(harvest.failures[0].reason.contains("unavailable"));
        // Healthy tasks still contribute in full.
        assert_eq!(harvest.records.len(), 3);
    }

    #[test]
    fn empty_task_list_yields_empty_harvest() {
        let provider = InMemoryProvider::new();
        let harvest = run_tasks(&provider, &JsonLinesDecoder, Vec::new(), 4, None);
        assert!(harvest.records.is_empty());
        assert!(harvest.window_keys.is_empty());
        assert!(harvest.next_window_keys.is_empty());
        assert!(harvest.failures.is_empty());
    }
}
