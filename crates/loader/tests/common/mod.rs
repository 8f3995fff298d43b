//! Shared fixtures for loader integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use fontreq_core::{
    FamilyStatus, FontFamilyResult, FontInfo, FontProvider, FontRequest, FontStyle, LoaderConfig,
    ProviderError, Typeface,
};
use fontreq_loader::Loader;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A latch the provider blocks on until the test opens it.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

/// What the fake provider answers with.
#[derive(Clone)]
pub enum Answer {
    Fonts,
    Status(FamilyStatus),
    FontCode(i32),
    MissingProvider,
}

/// Scriptable provider that counts calls and records calling threads.
pub struct FakeProvider {
    calls: AtomicUsize,
    threads: Mutex<Vec<Option<String>>>,
    delay: Duration,
    gate: Option<Arc<Gate>>,
    answer: Mutex<Answer>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            gate: None,
            answer: Mutex::new(Answer::Fonts),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn answering(self, answer: Answer) -> Self {
        *self.answer.lock().unwrap() = answer;
        self
    }

    pub fn set_answer(&self, answer: Answer) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn thread_names(&self) -> Vec<Option<String>> {
        self.threads.lock().unwrap().clone()
    }
}

impl FontProvider for FakeProvider {
    fn fetch_fonts(&self, _request: &FontRequest) -> Result<FontFamilyResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.threads
            .lock()
            .unwrap()
            .push(thread::current().name().map(str::to_string));
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let answer = self.answer.lock().unwrap().clone();
        match answer {
            Answer::Fonts => Ok(FontFamilyResult::ok(vec![FontInfo::new("content://fonts/1")])),
            Answer::Status(status) => Ok(FontFamilyResult::failed(status)),
            Answer::FontCode(code) => Ok(FontFamilyResult::ok(vec![
                FontInfo::new("content://fonts/1").with_result_code(code),
            ])),
            Answer::MissingProvider => Err(ProviderError::NotFound("com.example.fonts".into())),
        }
    }

    fn create_typeface(&self, request: &FontRequest, fonts: &[FontInfo], style: FontStyle) -> Option<Typeface> {
        Some(Typeface::new(
            request.query.clone(),
            style,
            fonts.to_vec(),
            Bytes::from_static(b"\x00\x01\x00\x00"),
        ))
    }
}

pub fn request(query: &str) -> FontRequest {
    FontRequest::new("com.example.fonts", "com.example.fonts.provider", query)
}

pub fn loader(provider: &Arc<FakeProvider>, configure: impl FnOnce(&mut LoaderConfig)) -> Loader {
    init_tracing();
    let mut config = LoaderConfig::default();
    configure(&mut config);
    Loader::new(Arc::clone(provider) as Arc<dyn FontProvider>, config)
}

/// Poll `cond` until it holds or [`WAIT`] elapses.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
