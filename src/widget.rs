//! Scratch-off widget controller.
//!
//! Owns every per-configuration entity (images, layers, mask, stroke,
//! completion flag) and drives them from three entry points the host calls
//! on its UI thread:
//!
//! * [`Widget::configure`] whenever inputs may have changed,
//! * [`Widget::pointer_move`] / [`Widget::end_stroke`] for input,
//! * [`Widget::frame_tick`] once per animation frame.
//!
//! Image loading runs on a tokio runtime; its result is picked up on the next
//! tick (or by awaiting [`Widget::settle`]). A load that belongs to an older
//! configuration, or to a dropped widget, is cancelled and never reported.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::completion::{self, CompletionDetector};
use crate::compositor::Layers;
use crate::config::{Config, Tuning};
use crate::error::{Error, LoadError};
use crate::frame::FrameScheduler;
use crate::loader::{self, ImageFetcher};
use crate::scratch::{self, Stroke};
use crate::types::{DecodedImage, FrameBuffer};

/// Lifecycle of one widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Uninitialized,
    /// Images are loading; input is ignored and nothing is drawn.
    Configuring,
    Ready,
    Scratching,
    /// Completion fired; the mask is fully revealed and input is ignored.
    Completed,
    /// Loading failed; nothing is drawn until a new configuration arrives.
    Errored,
}

/// Host callbacks. Both run on the thread that drives the widget.
pub struct Callbacks {
    on_fully_scratched: Box<dyn FnMut()>,
    on_loading_error: Box<dyn FnMut(&LoadError)>,
}

impl Callbacks {
    pub fn new(
        on_fully_scratched: impl FnMut() + 'static,
        on_loading_error: impl FnMut(&LoadError) + 'static,
    ) -> Self {
        Self {
            on_fully_scratched: Box::new(on_fully_scratched),
            on_loading_error: Box::new(on_loading_error),
        }
    }

    pub fn noop() -> Self {
        Self::new(|| {}, |_| {})
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callbacks")
    }
}

type LoadResult = Result<(DecodedImage, DecodedImage), LoadError>;

struct PendingLoad {
    generation: u64,
    rx: oneshot::Receiver<LoadResult>,
    cancel: CancellationToken,
}

pub struct Widget<F: ImageFetcher> {
    fetcher: Arc<F>,
    runtime: Handle,
    tuning: Tuning,
    callbacks: Callbacks,

    config: Option<Config>,
    state: WidgetState,
    generation: u64, // bumped on every rebuild; stale loads carry an older value
    pending: Option<PendingLoad>,

    layers: Option<Layers>,
    stroke: Stroke,
    detector: CompletionDetector,
    frames: FrameScheduler,
    draws: u64,
}

impl<F: ImageFetcher> Widget<F> {
    /// Create an unconfigured widget. Loads are spawned on `runtime`.
    pub fn new(fetcher: F, tuning: Tuning, runtime: Handle, callbacks: Callbacks) -> Result<Self, Error> {
        tuning.validate()?;
        Ok(Self {
            fetcher: Arc::new(fetcher),
            runtime,
            tuning,
            callbacks,
            config: None,
            state: WidgetState::Uninitialized,
            generation: 0,
            pending: None,
            layers: None,
            stroke: Stroke::new(),
            detector: CompletionDetector::new(tuning.completion_threshold),
            frames: FrameScheduler::new(),
            draws: 0,
        })
    }

    /// Apply the host's current inputs, diffing them against the previous ones.
    ///
    /// A change in `scratchable`, either URL or `color_outline` rebuilds
    /// everything; a change in `color_scratch` alone only schedules a redraw.
    pub fn configure(&mut self, next: Config) {
        let (rebuild, recolor) = match &self.config {
            None => (true, false),
            Some(prev) => (prev.needs_rebuild(&next), prev.color_scratch != next.color_scratch),
        };
        self.config = Some(next);
        if rebuild {
            self.start_configuring();
        } else if recolor {
            self.frames.request();
        }
    }

    fn start_configuring(&mut self) {
        let Some(cfg) = self.config.as_ref() else { return };

        if let Some(old) = self.pending.take() {
            debug!(generation = old.generation, "abandoning in-flight load");
            old.cancel.cancel();
        }
        self.generation += 1;
        self.layers = None;
        self.stroke.end();
        self.detector = CompletionDetector::new(self.tuning.completion_threshold);
        self.state = WidgetState::Configuring;
        info!(
            generation = self.generation,
            url_map = %cfg.url_map,
            url_flag = %cfg.url_flag,
            scratchable = cfg.scratchable,
            "configuring"
        );

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let (url_map, url_flag) = (cfg.url_map.clone(), cfg.url_flag.clone());
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                res = loader::load(fetcher.as_ref(), &url_map, &url_flag) => {
                    // Receiver gone means the widget moved on; nothing to do.
                    let _ = tx.send(res);
                }
            }
        });
        self.pending = Some(PendingLoad { generation: self.generation, rx, cancel });
    }

    /// Pick up a finished load without blocking.
    fn poll_load(&mut self) {
        let Some(pending) = self.pending.as_mut() else { return };
        let generation = pending.generation;
        let res = match pending.rx.try_recv() {
            Ok(res) => res,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => Err(LoadError::Interrupted),
        };
        self.pending = None;
        self.apply_load(generation, res);
    }

    /// Wait for the in-flight load (if any) and apply it.
    pub async fn settle(&mut self) {
        let Some(pending) = self.pending.take() else { return };
        let res = pending.rx.await.unwrap_or(Err(LoadError::Interrupted));
        self.apply_load(pending.generation, res);
    }

    fn apply_load(&mut self, generation: u64, res: LoadResult) {
        if generation != self.generation {
            trace!(generation, current = self.generation, "dropping stale load result");
            return;
        }
        let Some(cfg) = self.config.as_ref() else { return };
        match res {
            Ok((image_map, image_flag)) => {
                let layers = Layers::build(
                    &image_map,
                    &image_flag,
                    cfg.scratchable,
                    cfg.color_outline,
                    self.tuning.alpha_cutoff,
                );
                debug!(
                    width = image_map.width(),
                    height = image_map.height(),
                    itchy_pixels = layers.itchy_pixel_count(),
                    "layers built"
                );
                self.layers = Some(layers);
                self.state = WidgetState::Ready;
                self.frames.request();
            }
            Err(err) => {
                warn!(error = %err, "image loading failed");
                self.layers = None;
                self.state = WidgetState::Errored;
                (self.callbacks.on_loading_error)(&err);
            }
        }
    }

    /// Feed one pointer position (surface pixels). Positions off the surface
    /// are clamped onto it.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let scratchable = self.config.as_ref().is_some_and(|c| c.scratchable);
        let accepting = matches!(self.state, WidgetState::Ready | WidgetState::Scratching);
        if !(scratchable && accepting) {
            trace!(state = ?self.state, scratchable, "pointer ignored");
            return;
        }
        let Some(layers) = self.layers.as_mut() else { return };

        let (from, to) = self.stroke.advance((x, y));
        self.state = WidgetState::Scratching;
        scratch::erase(layers.mask_mut(), from, to, self.tuning.brush_radius);

        if self.detector.check(layers.mask(), layers.itchy_pixel_count()) {
            info!(generation = self.generation, "scratching complete");
            self.state = WidgetState::Completed;
            (self.callbacks.on_fully_scratched)();
            layers.mask_mut().reveal_all();
        }
        self.frames.request();
    }

    /// Lift the pointer: the next move starts a new dot.
    pub fn end_stroke(&mut self) {
        self.stroke.end();
    }

    /// One animation frame: apply a finished load, then composite if a redraw
    /// was requested. Returns the surface only when it was redrawn.
    pub fn frame_tick(&mut self) -> Option<&FrameBuffer> {
        self.poll_load();
        if !self.frames.take() {
            return None;
        }
        let (Some(layers), Some(cfg)) = (self.layers.as_mut(), self.config.as_ref()) else {
            return None;
        };
        self.draws += 1;
        Some(layers.draw(cfg.color_scratch))
    }

    /// The most recently composited surface, if layers exist.
    pub fn surface(&self) -> Option<&FrameBuffer> {
        self.layers.as_ref().map(Layers::display)
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.layers.as_ref().map(Layers::dimensions)
    }

    pub fn itchy_pixel_count(&self) -> Option<usize> {
        self.layers.as_ref().map(Layers::itchy_pixel_count)
    }

    pub fn covered_pixel_count(&self) -> Option<usize> {
        self.layers.as_ref().map(|l| l.mask().covered_count())
    }

    /// Revealed fraction of the itchy pixels, 0.0..=1.0.
    pub fn progress(&self) -> Option<f64> {
        self.layers
            .as_ref()
            .map(|l| completion::revealed_fraction(l.mask().covered_count(), l.itchy_pixel_count()))
    }

    pub fn is_scratching_complete(&self) -> bool {
        self.detector.is_complete()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of composites performed so far.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }
}

impl<F: ImageFetcher> Drop for Widget<F> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryFetcher;
    use crate::loader::tests::png;
    use crate::types::Color;
    use image::{Rgba, RgbaImage};
    use std::cell::Cell;
    use std::future::Future;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn shape(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))
    }

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with("map", png(&shape(40, 30)))
            .with("flag", png(&RgbaImage::from_pixel(40, 30, Rgba([0, 200, 0, 255]))))
    }

    fn config(scratchable: bool) -> Config {
        Config {
            scratchable,
            url_map: "map".into(),
            url_flag: "flag".into(),
            color_outline: Color::rgb(0, 0, 0),
            color_scratch: Color::rgb(180, 180, 180),
        }
    }

    fn counting() -> (Callbacks, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let done = Rc::new(Cell::new(0));
        let failed = Rc::new(Cell::new(0));
        let (d, e) = (done.clone(), failed.clone());
        let cb = Callbacks::new(move || d.set(d.get() + 1), move |_| e.set(e.get() + 1));
        (cb, done, failed)
    }

    async fn ready_widget(scratchable: bool) -> (Widget<MemoryFetcher>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let (cb, done, failed) = counting();
        let mut w = Widget::new(fetcher(), Tuning::default(), Handle::current(), cb).unwrap();
        assert_eq!(w.state(), WidgetState::Uninitialized);
        w.configure(config(scratchable));
        assert_eq!(w.state(), WidgetState::Configuring);
        w.settle().await;
        (w, done, failed)
    }

    // Sweep the whole surface row by row.
    fn scrub(w: &mut Widget<MemoryFetcher>) {
        let (width, height) = w.dimensions().unwrap();
        for y in (0..height).step_by(10) {
            w.end_stroke();
            w.pointer_move(0.0, y as f32);
            w.pointer_move(width as f32, y as f32);
        }
    }

    #[tokio::test]
    async fn non_scratchable_never_checks_completion() {
        let (mut w, done, _) = ready_widget(false).await;
        assert_eq!(w.state(), WidgetState::Ready);
        assert_eq!(w.covered_pixel_count(), Some(0));
        assert_eq!(w.itchy_pixel_count(), Some(0));
        scrub(&mut w);
        assert_eq!(w.detector.checks(), 0);
        assert_eq!(w.state(), WidgetState::Ready);
        assert_eq!(done.get(), 0);
    }

    #[tokio::test]
    async fn pointer_ignored_while_configuring() {
        let mut w =
            Widget::new(fetcher(), Tuning::default(), Handle::current(), Callbacks::noop()).unwrap();
        w.configure(config(true));
        w.pointer_move(5.0, 5.0);
        assert_eq!(w.state(), WidgetState::Configuring);
        w.settle().await;
        assert_eq!(w.covered_pixel_count(), Some(40 * 30));
    }

    #[tokio::test]
    async fn completion_fires_once_and_reveals_everything() {
        let (mut w, done, _) = ready_widget(true).await;
        w.pointer_move(10.0, 10.0);
        assert_eq!(w.state(), WidgetState::Scratching);
        scrub(&mut w);
        scrub(&mut w);
        assert_eq!(done.get(), 1);
        assert_eq!(w.state(), WidgetState::Completed);
        assert!(w.is_scratching_complete());
        assert_eq!(w.covered_pixel_count(), Some(0));
        assert_eq!(w.progress(), Some(1.0));

        let checks = w.detector.checks();
        w.pointer_move(1.0, 1.0);
        assert_eq!(w.detector.checks(), checks);
        assert_eq!(done.get(), 1);
    }

    #[tokio::test]
    async fn progress_at_threshold_means_complete() {
        let (cb, done, _) = counting();
        let tuning = Tuning { brush_radius: 1.0, completion_threshold: 0.85, ..Tuning::default() };
        let mut w = Widget::new(fetcher(), tuning, Handle::current(), cb).unwrap();
        w.configure(config(true));
        w.settle().await;

        for y in 0..30 {
            w.end_stroke();
            for x in 0..40 {
                w.pointer_move(x as f32, y as f32);
                let progress = w.progress().unwrap();
                assert_eq!(
                    progress >= tuning.completion_threshold,
                    w.is_scratching_complete(),
                    "progress {progress} at ({x}, {y})"
                );
            }
        }
        assert_eq!(done.get(), 1);
        assert_eq!(w.state(), WidgetState::Completed);
    }

    #[tokio::test]
    async fn redraws_coalesce_per_frame() {
        let (mut w, _, _) = ready_widget(true).await;
        assert!(w.frame_tick().is_some()); // initial draw after load
        assert!(w.frame_tick().is_none());

        w.pointer_move(3.0, 3.0);
        w.pointer_move(6.0, 3.0);
        w.pointer_move(9.0, 3.0);
        assert_eq!(w.draw_count(), 1);
        assert!(w.frame_tick().is_some());
        assert_eq!(w.draw_count(), 2);
        assert!(w.frame_tick().is_none());
    }

    #[tokio::test]
    async fn scratch_color_only_redraws() {
        let (mut w, _, _) = ready_widget(true).await;
        w.frame_tick();
        w.pointer_move(5.0, 5.0);
        let covered = w.covered_pixel_count();

        let mut next = config(true);
        next.color_scratch = Color::rgb(1, 2, 3);
        w.configure(next);
        assert_eq!(w.state(), WidgetState::Scratching);
        assert_eq!(w.covered_pixel_count(), covered);
        let fb = w.frame_tick().unwrap();
        // Far from the scratch and off the outline: still covered.
        assert_eq!(fb.get(35, 25), 0xFF01_0203);
    }

    #[tokio::test]
    async fn stale_load_is_ignored() {
        let (cb, _, failed) = counting();
        let fetcher = fetcher().with("small", png(&shape(8, 8)));
        let mut w = Widget::new(fetcher, Tuning::default(), Handle::current(), cb).unwrap();
        w.configure(config(true));
        let mut next = config(true);
        next.url_map = "small".into();
        w.configure(next);
        w.settle().await;
        assert_eq!(w.dimensions(), Some((8, 8)));
        assert_eq!(failed.get(), 0);
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    // Never finishes; records when its fetch future is dropped.
    struct HangingFetcher(Arc<AtomicBool>);

    impl ImageFetcher for HangingFetcher {
        fn fetch(&self, _url: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send {
            let guard = DropFlag(self.0.clone());
            async move {
                let _guard = guard;
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn dropping_the_widget_cancels_the_load() {
        let dropped = Arc::new(AtomicBool::new(false));
        let (cb, _, failed) = counting();
        let mut w =
            Widget::new(HangingFetcher(dropped.clone()), Tuning::default(), Handle::current(), cb)
                .unwrap();
        w.configure(config(true));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(w.is_loading());
        drop(w);
        for _ in 0..50 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(failed.get(), 0);
    }
}
