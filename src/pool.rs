//! Bounded pool of reusable browser pages.
//!
//! One browser process is launched lazily and shared by every page, and
//! relaunched if it is found dead on the next launch request. At most
//! `capacity` pages are alive at a time; a caller that finds no idle page and
//! no spare capacity queues up and is served strictly in arrival order.
//!
//! Hand-off is direct: a released page (or the capacity freed by a dead one)
//! is given to the head of the queue under the pool lock, so a caller that
//! arrives later can never overtake a waiter.
//!
//! The browser itself sits behind the [`BrowserLauncher`] / [`BrowserProcess`]
//! / [`BrowserPage`] traits so the pool can be driven by a fake in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! let pool = PagePool::new(&PoolConfig::default(), launcher);
//! pool.prewarm(2).await?;
//!
//! let page = pool.acquire().await?;
//! page.set_content("<p>Hello</p>").await?;
//! let pdf = page.print_pdf(&PrintOptions::a4()).await?;
//! drop(page); // back to the pool
//!
//! pool.shutdown().await;
//! ```

use std::collections::{HashSet, VecDeque};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::{PoolConfig, PrintOptions};
use crate::error::{PressError, Result};

/// Loaded into freshly prewarmed pages.
const BLANK_DOCUMENT: &str = "<html><body></body></html>";

/// Starts the shared browser process.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserProcess>>;
}

/// A running browser that can open pages.
#[async_trait]
pub trait BrowserProcess: Send + Sync {
    /// `false` once the process has exited or its connection dropped.
    fn is_alive(&self) -> bool;

    async fn open_page(&self) -> Result<Box<dyn BrowserPage>>;

    /// Terminate the process. Pages opened from it stop working.
    async fn close(&self) -> Result<()>;
}

/// One browser tab.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// `false` once the page has been closed or its connection is gone.
    fn is_alive(&self) -> bool;

    /// Replace the document with `html` and wait for it to load.
    async fn set_content(&self, html: &str) -> Result<()>;

    async fn print_pdf(&self, options: &PrintOptions) -> Result<Vec<u8>>;

    /// Close the tab. Called when the pool discards the page.
    async fn close(&self) -> Result<()>;
}

/// Snapshot of the pool's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    /// Pages created and not yet discarded, idle or leased.
    pub live: usize,
    pub idle: usize,
    /// Callers queued in `acquire`.
    pub waiting: usize,
}

struct PooledPage {
    id: u64,
    generation: u64,
    page: Box<dyn BrowserPage>,
}

/// What a queued caller is woken with.
enum Grant {
    Page(PooledPage),
    /// Permission to create one page; already counted in `reserved`.
    Slot { generation: u64 },
}

struct PoolState {
    capacity: usize,
    idle: Vec<PooledPage>,
    live: HashSet<u64>,
    /// Pages being created.
    reserved: usize,
    waiters: VecDeque<oneshot::Sender<Grant>>,
    next_id: u64,
    /// Bumped by shutdown; pages and slots of an older generation are void.
    generation: u64,
}

impl PoolState {
    fn has_room(&self) -> bool {
        self.live.len() + self.reserved < self.capacity
    }

    /// Offer `grant` to waiters in arrival order. Returns it if nobody took it.
    fn offer(&mut self, mut grant: Grant) -> Option<Grant> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.send(grant) {
                Ok(()) => return None,
                // Receiver gone (timed out or cancelled): try the next one.
                Err(returned) => grant = returned,
            }
        }
        Some(grant)
    }

    /// Turn spare capacity into creation slots for queued callers.
    fn grant_slots(&mut self) {
        while self.has_room() && !self.waiters.is_empty() {
            self.reserved += 1;
            let generation = self.generation;
            if self.offer(Grant::Slot { generation }).is_some() {
                self.reserved -= 1;
                break;
            }
        }
    }

    fn register(&mut self, page: Box<dyn BrowserPage>) -> PooledPage {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        PooledPage {
            id,
            generation: self.generation,
            page,
        }
    }
}

struct Shared {
    state: Mutex<PoolState>,
    /// Held across the launch so concurrent callers share one process.
    browser: tokio::sync::Mutex<Option<Arc<dyn BrowserProcess>>>,
    launcher: Arc<dyn BrowserLauncher>,
    acquire_timeout: Option<Duration>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn browser(&self) -> Result<Arc<dyn BrowserProcess>> {
        let mut browser = self.browser.lock().await;
        match browser.as_ref() {
            Some(process) if process.is_alive() => return Ok(Arc::clone(process)),
            Some(_) => {
                log::warn!("browser is gone, relaunching");
                if let Some(dead) = browser.take() {
                    if let Err(e) = dead.close().await {
                        log::debug!("dead browser did not close cleanly: {e}");
                    }
                }
            }
            None => {}
        }
        log::info!("launching browser");
        let process = self.launcher.launch().await?;
        *browser = Some(Arc::clone(&process));
        Ok(process)
    }

    fn release_page(&self, pooled: PooledPage) {
        let mut state = self.lock();
        if pooled.generation != state.generation {
            log::debug!("dropping page {} from before shutdown", pooled.id);
            discard(pooled);
            return;
        }
        if !pooled.page.is_alive() {
            log::warn!("page {} is closed, discarding it", pooled.id);
            state.live.remove(&pooled.id);
            state.grant_slots();
            discard(pooled);
            return;
        }
        if let Some(Grant::Page(pooled)) = state.offer(Grant::Page(pooled)) {
            state.idle.push(pooled);
        }
    }

    fn release_slot(&self, generation: u64) {
        let mut state = self.lock();
        if generation != state.generation {
            return;
        }
        state.reserved = state.reserved.saturating_sub(1);
        state.grant_slots();
    }

    fn reclaim(&self, grant: Grant) {
        match grant {
            Grant::Page(pooled) => self.release_page(pooled),
            Grant::Slot { generation } => self.release_slot(generation),
        }
    }
}

/// Close a page the pool no longer tracks. Runs in the background; without a
/// runtime the page is just dropped.
fn discard(pooled: PooledPage) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = pooled.page.close().await {
            log::debug!("page {} did not close: {e}", pooled.id);
        }
    });
}

/// A creation slot that is handed back if page creation does not finish.
struct Reservation {
    shared: Arc<Shared>,
    generation: u64,
    armed: bool,
}

impl Reservation {
    fn new(shared: Arc<Shared>, generation: u64) -> Self {
        Self {
            shared,
            generation,
            armed: true,
        }
    }

    fn fulfil(mut self, page: Box<dyn BrowserPage>) -> Result<PooledPage> {
        self.armed = false;
        let mut state = self.shared.lock();
        if state.generation != self.generation {
            return Err(PressError::PoolShutDown);
        }
        state.reserved = state.reserved.saturating_sub(1);
        Ok(state.register(page))
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            self.shared.release_slot(self.generation);
        }
    }
}

/// A queued `acquire`. Whatever is granted after the caller gave up goes
/// straight back to the pool.
struct Waiter {
    rx: oneshot::Receiver<Grant>,
    shared: Arc<Shared>,
    received: bool,
}

impl Waiter {
    async fn recv(&mut self, timeout: Option<Duration>) -> Result<Grant> {
        let outcome = match timeout {
            None => Ok((&mut self.rx).await),
            Some(limit) => tokio::time::timeout(limit, &mut self.rx).await,
        };
        match outcome {
            Ok(Ok(grant)) => {
                self.received = true;
                Ok(grant)
            }
            // Sender dropped without a grant: the pool was shut down.
            Ok(Err(_)) => Err(PressError::PoolShutDown),
            Err(_) => {
                self.rx.close();
                // A grant may have landed between the deadline and close().
                if let Ok(grant) = self.rx.try_recv() {
                    self.received = true;
                    return Ok(grant);
                }
                self.shared.lock().waiters.retain(|tx| !tx.is_closed());
                Err(PressError::AcquireTimeout(timeout.unwrap_or_default()))
            }
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if self.received {
            return;
        }
        self.rx.close();
        if let Ok(grant) = self.rx.try_recv() {
            self.shared.reclaim(grant);
        }
    }
}

/// A leased page. Dropping the lease returns the page to the pool.
pub struct PageLease {
    shared: Arc<Shared>,
    pooled: Option<PooledPage>,
}

impl PageLease {
    fn new(shared: Arc<Shared>, pooled: PooledPage) -> Self {
        Self {
            shared,
            pooled: Some(pooled),
        }
    }

    /// Pool-unique id of the page, stable across leases.
    pub fn id(&self) -> u64 {
        self.pooled.as_ref().map_or(0, |p| p.id)
    }
}

impl Deref for PageLease {
    type Target = dyn BrowserPage;

    fn deref(&self) -> &Self::Target {
        self.pooled
            .as_ref()
            .map(|p| p.page.as_ref())
            .expect("lease holds its page until dropped")
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            self.shared.release_page(pooled);
        }
    }
}

enum Step {
    Idle(PooledPage),
    Create(u64),
    Wait(oneshot::Receiver<Grant>),
}

/// Bounded, FIFO-fair pool of browser pages. Cheap to clone; clones share
/// the same pool.
#[derive(Clone)]
pub struct PagePool {
    shared: Arc<Shared>,
}

impl PagePool {
    pub fn new(config: &PoolConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    capacity: config.capacity.max(1),
                    idle: Vec::new(),
                    live: HashSet::new(),
                    reserved: 0,
                    waiters: VecDeque::new(),
                    next_id: 1,
                    generation: 0,
                }),
                browser: tokio::sync::Mutex::new(None),
                launcher,
                acquire_timeout: config.acquire_timeout(),
            }),
        }
    }

    /// Pool driven by a local Chrome/Chromium install.
    #[cfg(feature = "chrome")]
    pub fn chrome(config: &PoolConfig) -> Self {
        let launcher = crate::chrome::ChromeLauncher::new(config.executable.clone());
        Self::new(config, Arc::new(launcher))
    }

    /// Set the capacity to `pool_size` (at least 1), launch the browser and,
    /// if the pool has no pages at all, open one blank page. Extra pages are
    /// created on demand up to the capacity.
    pub async fn prewarm(&self, pool_size: usize) -> Result<()> {
        {
            let mut state = self.shared.lock();
            state.capacity = pool_size.max(1);
            state.grant_slots();
        }

        let browser = self.shared.browser().await?;

        let generation = {
            let mut state = self.shared.lock();
            if !state.live.is_empty() || state.reserved > 0 || !state.has_room() {
                return Ok(());
            }
            state.reserved += 1;
            state.generation
        };
        let reservation = Reservation::new(Arc::clone(&self.shared), generation);

        let page = browser.open_page().await?;
        page.set_content(BLANK_DOCUMENT).await?;
        let pooled = reservation.fulfil(page)?;
        log::debug!("prewarmed page {}", pooled.id);
        self.shared.release_page(pooled);
        Ok(())
    }

    /// Lease a page: an idle one if available, a new one while under
    /// capacity, otherwise wait in line for one to be released.
    pub async fn acquire(&self) -> Result<PageLease> {
        let step = {
            let mut state = self.shared.lock();
            self.next_step(&mut state)
        };

        match step {
            Step::Idle(pooled) => {
                log::trace!("reusing page {}", pooled.id);
                Ok(PageLease::new(Arc::clone(&self.shared), pooled))
            }
            Step::Create(generation) => self.create(generation).await,
            Step::Wait(rx) => {
                log::debug!("pool exhausted, waiting for a page");
                let mut waiter = Waiter {
                    rx,
                    shared: Arc::clone(&self.shared),
                    received: false,
                };
                match waiter.recv(self.shared.acquire_timeout).await? {
                    Grant::Page(pooled) => Ok(PageLease::new(Arc::clone(&self.shared), pooled)),
                    Grant::Slot { generation } => self.create(generation).await,
                }
            }
        }
    }

    fn next_step(&self, state: &mut PoolState) -> Step {
        if state.waiters.is_empty() {
            while let Some(pooled) = state.idle.pop() {
                if pooled.page.is_alive() {
                    return Step::Idle(pooled);
                }
                log::warn!("idle page {} is closed, discarding it", pooled.id);
                state.live.remove(&pooled.id);
                discard(pooled);
            }
            if state.has_room() {
                state.reserved += 1;
                return Step::Create(state.generation);
            }
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(tx);
        Step::Wait(rx)
    }

    async fn create(&self, generation: u64) -> Result<PageLease> {
        let reservation = Reservation::new(Arc::clone(&self.shared), generation);
        let browser = self.shared.browser().await?;
        let page = browser.open_page().await?;
        let pooled = reservation.fulfil(page)?;
        log::debug!("opened page {}", pooled.id);
        Ok(PageLease::new(Arc::clone(&self.shared), pooled))
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            capacity: state.capacity,
            live: state.live.len(),
            idle: state.idle.len(),
            waiting: state.waiters.iter().filter(|tx| !tx.is_closed()).count(),
        }
    }

    /// Close the browser and forget every page. Queued callers fail with
    /// [`PressError::PoolShutDown`]; pages still leased are discarded when
    /// their lease drops. Safe to call more than once, and the pool relaunches
    /// on the next `acquire`.
    pub async fn shutdown(&self) {
        let browser = self.shared.browser.lock().await.take();

        let (idle, waiters) = {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.live.clear();
            state.reserved = 0;
            (
                std::mem::take(&mut state.idle),
                std::mem::take(&mut state.waiters),
            )
        };
        if !waiters.is_empty() {
            log::info!("shutdown: failing {} waiting caller(s)", waiters.len());
        }
        drop(waiters);
        for pooled in idle {
            if let Err(e) = pooled.page.close().await {
                log::debug!("page {} did not close: {e}", pooled.id);
            }
        }

        if let Some(browser) = browser {
            log::info!("closing browser");
            if let Err(e) = browser.close().await {
                log::warn!("browser did not close cleanly: {e}");
            }
        }
    }
}

/// Shut `pool` down and exit when the process receives Ctrl-C or SIGTERM.
pub fn spawn_signal_shutdown(pool: PagePool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination().await;
        log::info!("termination signal received");
        pool.shutdown().await;
        std::process::exit(0);
    })
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => log::warn!("cannot listen for SIGTERM: {e}"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
