//! Page pool behaviour against an in-memory browser.
//!
//! These tests validate:
//! - The pool never holds more live pages than its capacity
//! - Waiters are served in arrival order
//! - Timeouts, closed pages, failed captures and shutdown leave the
//!   bookkeeping consistent
//! - Discarded pages are closed and a crashed browser is relaunched

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pdf_press::config::{PoolConfig, PrintOptions};
use pdf_press::engine::{Engine, RenderOptions, Renderer};
use pdf_press::pool::{BrowserLauncher, BrowserPage, BrowserProcess, PagePool};
use pdf_press::{PressError, Result};

// =====================================================================
// Mock browser
// =====================================================================

#[derive(Default)]
struct MockBrowser {
    launches: AtomicUsize,
    closes: AtomicUsize,
    page_closes: AtomicUsize,
    pages: Mutex<Vec<Arc<AtomicBool>>>,
    /// One "has crashed" flag per launched process.
    processes: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MockBrowser {
    fn opened(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    fn kill_page(&self, index: usize) {
        self.pages.lock().unwrap()[index].store(false, Ordering::SeqCst);
    }

    /// Make the latest process die silently. Like a real driver, nobody
    /// notices until the next call into it fails.
    fn crash(&self) {
        let processes = self.processes.lock().unwrap();
        processes.last().unwrap().store(true, Ordering::SeqCst);
    }
}

struct MockLauncher(Arc<MockBrowser>);

struct MockProcess {
    browser: Arc<MockBrowser>,
    crashed: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

impl MockProcess {
    fn check(&self) -> Result<()> {
        if self.crashed.load(Ordering::SeqCst) {
            self.connected.store(false, Ordering::SeqCst);
            return Err(PressError::Browser("connection is closed".into()));
        }
        Ok(())
    }
}

struct MockPage {
    alive: Arc<AtomicBool>,
    process: Arc<MockProcess>,
    content: Mutex<String>,
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserProcess>> {
        self.0.launches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let crashed = Arc::new(AtomicBool::new(false));
        self.0.processes.lock().unwrap().push(Arc::clone(&crashed));
        Ok(Arc::new(MockProcess {
            browser: Arc::clone(&self.0),
            crashed,
            connected: Arc::new(AtomicBool::new(true)),
        }))
    }
}

#[async_trait]
impl BrowserProcess for MockProcess {
    fn is_alive(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        self.check()?;
        let alive = Arc::new(AtomicBool::new(true));
        self.browser.pages.lock().unwrap().push(Arc::clone(&alive));
        Ok(Box::new(MockPage {
            alive,
            process: Arc::new(MockProcess {
                browser: Arc::clone(&self.browser),
                crashed: Arc::clone(&self.crashed),
                connected: Arc::clone(&self.connected),
            }),
            content: Mutex::new(String::new()),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.browser.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && self.process.is_alive()
    }

    async fn set_content(&self, html: &str) -> Result<()> {
        self.process.check()?;
        *self.content.lock().unwrap() = html.to_string();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        self.process.browser.page_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn print_pdf(&self, _options: &PrintOptions) -> Result<Vec<u8>> {
        let content = self.content.lock().unwrap().clone();
        if content.contains("FAIL") {
            return Err(PressError::Capture("mock capture failure".into()));
        }
        Ok(format!("%PDF-mock {content}").into_bytes())
    }
}

// =====================================================================
// Helper
// =====================================================================

fn mock_pool(capacity: usize, timeout_ms: Option<u64>) -> (PagePool, Arc<MockBrowser>) {
    let browser = Arc::new(MockBrowser::default());
    let config = PoolConfig {
        capacity,
        executable: None,
        acquire_timeout_ms: timeout_ms,
    };
    let pool = PagePool::new(&config, Arc::new(MockLauncher(Arc::clone(&browser))));
    (pool, browser)
}

async fn wait_for_waiters(pool: &PagePool, n: usize) {
    for _ in 0..1000 {
        if pool.stats().waiting == n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {n} waiter(s), stats: {:?}", pool.stats());
}

async fn wait_for_page_closes(browser: &MockBrowser, n: usize) {
    for _ in 0..1000 {
        if browser.page_closes.load(Ordering::SeqCst) == n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "expected {n} closed page(s), saw {}",
        browser.page_closes.load(Ordering::SeqCst)
    );
}

// =====================================================================
// Capacity and fairness
// =====================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capacity_is_never_exceeded() {
    let (pool, browser) = mock_pool(2, None);
    let in_use = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        let in_use = Arc::clone(&in_use);
        let peak = Arc::clone(&peak);
        tasks.push(tokio::spawn(async move {
            let lease = pool.acquire().await.unwrap();
            let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            assert!(pool.stats().live <= 2);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_use.fetch_sub(1, Ordering::SeqCst);
            drop(lease);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(browser.opened() <= 2);
    assert_eq!(browser.launches.load(Ordering::SeqCst), 1);
    let stats = pool.stats();
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.idle, stats.live);
}

#[tokio::test]
async fn waiters_are_served_in_arrival_order() {
    let (pool, _) = mock_pool(1, None);
    let order = Arc::new(Mutex::new(Vec::new()));
    let holder = pool.acquire().await.unwrap();

    let spawn_waiter = |name: &'static str| {
        let pool = pool.clone();
        let order = Arc::clone(&order);
        tokio::spawn(async move {
            let lease = pool.acquire().await.unwrap();
            order.lock().unwrap().push(name);
            tokio::task::yield_now().await;
            drop(lease);
        })
    };

    let a = spawn_waiter("A");
    wait_for_waiters(&pool, 1).await;
    let b = spawn_waiter("B");
    wait_for_waiters(&pool, 2).await;

    drop(holder);
    // Arrives after the release but must still queue behind B.
    let c = spawn_waiter("C");

    a.await.unwrap();
    b.await.unwrap();
    c.await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn prewarmed_pool_serves_concurrent_renders_with_one_launch() {
    let (pool, browser) = mock_pool(2, None);
    pool.prewarm(2).await.unwrap();
    assert_eq!(browser.launches.load(Ordering::SeqCst), 1);
    assert_eq!(pool.stats().idle, 1);

    let renderer = Renderer::with_pool(pool.clone());
    let options = RenderOptions::default();
    let (a, b) = tokio::join!(
        renderer.generate("<p>a</p>", Engine::Pooled, &options),
        renderer.generate("<p>b</p>", Engine::Pooled, &options),
    );
    assert_eq!(a.unwrap(), b"%PDF-mock <p>a</p>".to_vec());
    assert_eq!(b.unwrap(), b"%PDF-mock <p>b</p>".to_vec());

    assert_eq!(browser.launches.load(Ordering::SeqCst), 1);
    assert!(browser.opened() <= 2);
    assert_eq!(pool.stats().idle, pool.stats().live);
}

// =====================================================================
// Timeouts and cancellation
// =====================================================================

#[tokio::test]
async fn timed_out_acquire_leaves_no_waiter() {
    let (pool, _) = mock_pool(1, Some(20));
    let holder = pool.acquire().await.unwrap();

    let err = pool.acquire().await.err().unwrap();
    assert!(matches!(err, PressError::AcquireTimeout(_)), "{err}");
    assert_eq!(pool.stats().waiting, 0);

    drop(holder);
    let lease = pool.acquire().await.unwrap();
    drop(lease);
    assert_eq!(pool.stats().live, 1);
}

#[tokio::test]
async fn cancelled_waiter_does_not_leak_the_page() {
    let (pool, _) = mock_pool(1, None);
    let holder = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
    };
    wait_for_waiters(&pool, 1).await;
    waiter.abort();
    assert!(waiter.await.unwrap_err().is_cancelled());

    drop(holder);
    assert_eq!(pool.stats().idle, 1);
    assert!(pool.acquire().await.is_ok());
}

// =====================================================================
// Page health
// =====================================================================

#[tokio::test]
async fn closed_page_is_discarded_and_replaced() {
    let (pool, browser) = mock_pool(1, None);
    let lease = pool.acquire().await.unwrap();
    let first = lease.id();

    browser.kill_page(0);
    drop(lease);
    assert_eq!(pool.stats().live, 0);

    let lease = pool.acquire().await.unwrap();
    assert_ne!(lease.id(), first);
    assert_eq!(browser.opened(), 2);
}

#[tokio::test]
async fn closed_page_frees_a_slot_for_a_waiter() {
    let (pool, browser) = mock_pool(1, None);
    let holder = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(|lease| lease.id()) })
    };
    wait_for_waiters(&pool, 1).await;

    browser.kill_page(0);
    let dead_id = holder.id();
    drop(holder);

    let new_id = waiter.await.unwrap().unwrap();
    assert_ne!(new_id, dead_id);
    assert_eq!(browser.opened(), 2);
}

#[tokio::test]
async fn discarded_page_is_closed() {
    let (pool, browser) = mock_pool(1, None);
    let lease = pool.acquire().await.unwrap();

    browser.kill_page(0);
    drop(lease);
    wait_for_page_closes(&browser, 1).await;

    // Healthy pages stay open across leases.
    let lease = pool.acquire().await.unwrap();
    drop(lease);
    let lease = pool.acquire().await.unwrap();
    drop(lease);
    tokio::task::yield_now().await;
    assert_eq!(browser.page_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn crashed_browser_is_relaunched() {
    let (pool, browser) = mock_pool(2, None);
    pool.prewarm(2).await.unwrap();
    browser.crash();

    let renderer = Renderer::with_pool(pool.clone());
    let options = RenderOptions::default();
    for i in 0..3 {
        let html = format!("<p>{i}</p>");
        let pdf = renderer.generate(&html, Engine::Pooled, &options).await.unwrap();
        assert_eq!(pdf, format!("%PDF-mock {html}").into_bytes());
    }

    assert_eq!(browser.launches.load(Ordering::SeqCst), 2);
    // The dead browser was closed before the relaunch.
    assert_eq!(browser.closes.load(Ordering::SeqCst), 1);
    let stats = pool.stats();
    assert_eq!((stats.live, stats.idle), (1, 1));
}

#[tokio::test]
async fn failed_capture_still_releases_the_page() {
    let (pool, browser) = mock_pool(1, None);
    let renderer = Renderer::with_pool(pool.clone());
    let options = RenderOptions::default();

    let err = renderer
        .generate("<p>FAIL</p>", Engine::Pooled, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, PressError::Capture(_)));
    assert_eq!(pool.stats().idle, 1);

    let pdf = renderer.generate("<p>ok</p>", Engine::Pooled, &options).await.unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(browser.opened(), 1);
}

// =====================================================================
// Shutdown
// =====================================================================

#[tokio::test]
async fn shutdown_fails_waiters_and_is_idempotent() {
    let (pool, browser) = mock_pool(1, None);
    let holder = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
    };
    wait_for_waiters(&pool, 1).await;

    pool.shutdown().await;
    pool.shutdown().await;
    assert!(matches!(waiter.await.unwrap(), Err(PressError::PoolShutDown)));
    assert_eq!(browser.closes.load(Ordering::SeqCst), 1);

    // A lease from before the shutdown is discarded, not pooled.
    drop(holder);
    let stats = pool.stats();
    assert_eq!((stats.live, stats.idle, stats.waiting), (0, 0, 0));
}

#[tokio::test]
async fn pool_relaunches_after_shutdown() {
    let (pool, browser) = mock_pool(1, None);
    pool.prewarm(1).await.unwrap();
    pool.shutdown().await;
    // The idle page was closed along with the browser.
    assert_eq!(browser.page_closes.load(Ordering::SeqCst), 1);

    let lease = pool.acquire().await.unwrap();
    drop(lease);
    assert_eq!(browser.launches.load(Ordering::SeqCst), 2);
}
