use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use jsonlayout::destination::ByteDestination;
use jsonlayout::event::{Level, LogEvent};
use jsonlayout::{JsonLayout, LayoutConfig};
use parking_lot::Mutex;
use serde_json::Value;

const THREADS: usize = 8;
const EVENTS: usize = 250;
const POOL_SIZE: usize = 3;

/// Collects documents and panics if `encode` ever lets two writers in at once.
struct DetectingDestination {
    busy: AtomicBool,
    staged: Vec<u8>,
    drained: Vec<u8>,
    capacity: usize,
}

impl DetectingDestination {
    fn new(capacity: usize) -> Self {
        Self {
            busy: AtomicBool::new(false),
            staged: Vec::with_capacity(capacity),
            drained: Vec::new(),
            capacity,
        }
    }

    fn enter(&self) {
        assert!(
            !self.busy.swap(true, Ordering::SeqCst),
            "destination entered concurrently"
        );
    }

    fn leave(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl ByteDestination for DetectingDestination {
    fn remaining(&self) -> usize {
        self.capacity - self.staged.len()
    }

    fn put(&mut self, bytes: &[u8]) {
        self.enter();
        self.staged.extend_from_slice(bytes);
        self.leave();
    }

    fn drain(&mut self) -> io::Result<()> {
        self.enter();
        self.drained.append(&mut self.staged);
        self.leave();
        Ok(())
    }
}

fn layout() -> Arc<JsonLayout> {
    Arc::new(
        JsonLayout::new(
            LayoutConfig::new()
                .with_event_template(
                    r#"{"thread": "${json:mdc:thread}", "seq": "${json:mdc:seq}", "message": "${json:message}"}"#,
                )
                .with_pool_size(POOL_SIZE),
        )
        .unwrap(),
    )
}

fn event(thread: usize, seq: usize) -> LogEvent {
    LogEvent::new(Level::Info, format!("event {} of thread {}", seq, thread))
        .with_context("thread", thread)
        .with_context("seq", seq)
}

#[test]
fn test_threads_outnumbering_the_pool() {
    let layout = layout();
    let destination = Arc::new(Mutex::new(DetectingDestination::new(512)));

    let handles: Vec<_> = (0..THREADS)
        .map(|id| {
            let layout = Arc::clone(&layout);
            let destination = Arc::clone(&destination);
            thread::spawn(move || {
                for seq in 0..EVENTS {
                    layout.encode(&event(id, seq), &*destination).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut destination = destination.lock();
    destination.drain().unwrap();
    let documents: Vec<Value> = serde_json::Deserializer::from_slice(&destination.drained)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(documents.len(), THREADS * EVENTS);

    let mut next_seq = vec![0_u64; THREADS];
    for document in &documents {
        let thread = document["thread"].as_u64().unwrap() as usize;
        let seq = document["seq"].as_u64().unwrap();
        assert_eq!(seq, next_seq[thread], "documents of one thread stay in order");
        assert_eq!(
            document["message"],
            format!("event {} of thread {}", seq, thread)
        );
        next_seq[thread] += 1;
    }

    let snapshot = layout.pool_metrics();
    assert_eq!(snapshot.hits + snapshot.misses, (THREADS * EVENTS) as u64);
    assert_eq!(snapshot.returns + snapshot.drops, (THREADS * EVENTS) as u64);
    assert!(layout.pool().available() <= POOL_SIZE);
}

#[test]
fn test_contexts_are_never_shared() {
    let layout = layout();
    // buffer addresses of the contexts currently held by a render
    let in_use = Arc::new(Mutex::new(HashSet::new()));

    let handles: Vec<_> = (0..THREADS)
        .map(|id| {
            let layout = Arc::clone(&layout);
            let in_use = Arc::clone(&in_use);
            thread::spawn(move || {
                for seq in 0..EVENTS {
                    layout
                        .render_with(&event(id, seq), |bytes| {
                            let address = bytes.as_ptr() as usize;
                            assert!(
                                in_use.lock().insert(address),
                                "context handed to two renders at once"
                            );
                            thread::yield_now();
                            let value: Value = serde_json::from_slice(bytes).unwrap();
                            assert_eq!(value["thread"], id);
                            assert_eq!(value["seq"], seq);
                            in_use.lock().remove(&address);
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(in_use.lock().is_empty());
    assert!(layout.pool().available() <= POOL_SIZE);
}

#[test]
fn test_shared_layout_to_string() {
    let layout = layout();
    let handles: Vec<_> = (0..THREADS)
        .map(|id| {
            let layout = Arc::clone(&layout);
            thread::spawn(move || {
                for seq in 0..EVENTS {
                    let json = layout.to_string(&event(id, seq)).unwrap();
                    let value: Value = serde_json::from_str(&json).unwrap();
                    assert_eq!(value["thread"], id);
                    assert_eq!(value["seq"], seq);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
