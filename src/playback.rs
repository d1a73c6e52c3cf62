use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;

use crate::error::TimelineError;
use crate::host::{AudioTransport, HostResult, PlaybackInfo, ShowHost, TickUpdate};

/// The slice of the host the arbiter drives each frame. Blanket-implemented
/// for every `ShowHost`, and small enough for tests to fake directly.
pub trait TransportControl {
    fn pause(&self) -> BoxFuture<'_, HostResult<()>>;
    fn tick(&self, dt: f64) -> BoxFuture<'_, HostResult<Option<TickUpdate>>>;
}

impl<T: ShowHost + ?Sized> TransportControl for T {
    fn pause(&self) -> BoxFuture<'_, HostResult<()>> {
        ShowHost::pause(self)
    }

    fn tick(&self, dt: f64) -> BoxFuture<'_, HostResult<Option<TickUpdate>>> {
        ShowHost::tick(self, dt)
    }
}

/// Reconciles two clocks into the one playhead position the timeline draws.
///
/// When a loaded audio element is playing, its hardware clock wins: it
/// drifts less than anything we could compute, and the lights must stay
/// synchronized to what the speakers emit. The software tick path exists
/// only for silent sequences, where there is no audio clock to anchor to.
#[derive(Debug)]
pub struct ClockArbiter {
    /// Timestamp of the previous frame. Recorded on every frame, including
    /// paused ones, so dt is correct the instant playback resumes.
    last_frame: Option<Instant>,
    displayed_time: f64,
    displayed_playing: bool,
    /// Latch so the region-end pause is issued exactly once, not once per
    /// frame while the audio sits at the boundary.
    region_stop_sent: bool,
}

impl Default for ClockArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockArbiter {
    pub fn new() -> Self {
        Self {
            last_frame: None,
            displayed_time: 0.0,
            displayed_playing: false,
            region_stop_sent: false,
        }
    }

    /// The playhead position to draw this frame.
    pub fn displayed_time(&self) -> f64 {
        self.displayed_time
    }

    pub fn displayed_playing(&self) -> bool {
        self.displayed_playing
    }

    /// Adopt externally refreshed playback state (seeks, transport buttons,
    /// sequence switches).
    pub fn sync(&mut self, info: &PlaybackInfo) {
        self.displayed_time = info.current_time;
        self.displayed_playing = info.playing;
        self.region_stop_sent = false;
    }

    /// Run one frame of the decision tree.
    pub async fn advance<A, H>(
        &mut self,
        now: Instant,
        audio: Option<&A>,
        host: &H,
        playback: &PlaybackInfo,
    ) -> Result<(), TimelineError>
    where
        A: AudioTransport + ?Sized,
        H: TransportControl + ?Sized,
    {
        let prev = self.last_frame.replace(now);

        // 1. A loaded, playing audio element is ground truth.
        if let Some(audio) = audio {
            if audio.ready() && audio.playing() {
                if let Some(time) = audio.current_time() {
                    return self.follow_audio(time, audio, host, playback).await;
                }
            }
        }

        // 2. Not playing: the timestamp above keeps the dt baseline fresh.
        if !playback.playing {
            self.displayed_playing = false;
            return Ok(());
        }

        // 3. Playing with no audio clock: advance the engine's virtual clock.
        let dt = prev.map_or(0.0, |p| now.duration_since(p).as_secs_f64());
        if let Some(update) = host.tick(dt).await? {
            self.displayed_time = update.current_time;
            self.displayed_playing = update.playing;
        }
        Ok(())
    }

    async fn follow_audio<A, H>(
        &mut self,
        time: f64,
        audio: &A,
        host: &H,
        playback: &PlaybackInfo,
    ) -> Result<(), TimelineError>
    where
        A: AudioTransport + ?Sized,
        H: TransportControl + ?Sized,
    {
        self.displayed_playing = true;
        self.displayed_time = time;

        let Some((start, end)) = playback.region else {
            self.region_stop_sent = false;
            return Ok(());
        };

        if time < end {
            self.region_stop_sent = false;
            return Ok(());
        }

        if playback.looping {
            audio.seek(start);
            self.displayed_time = start;
            self.region_stop_sent = false;
            return Ok(());
        }

        // Region end without looping: stop there, exactly once.
        audio.pause();
        self.displayed_time = end;
        self.displayed_playing = false;
        if !self.region_stop_sent {
            self.region_stop_sent = true;
            host.pause().await?;
        }
        Ok(())
    }
}

/// The animation-frame driver: one task, explicitly started and stopped,
/// re-scheduled once per frame. The cancellation flag is checked before
/// every re-schedule, so `stop()` takes effect within one frame and the
/// task never outlives its owner by more than that.
pub struct FrameLoop {
    cancelled: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl FrameLoop {
    /// Spawn the loop at `frame_rate` frames per second. `on_frame` runs to
    /// completion before the next frame is scheduled; a slow frame delays
    /// the loop rather than piling up callbacks.
    pub fn start<F, Fut>(frame_rate: f64, mut on_frame: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let period = Duration::from_secs_f64(1.0 / frame_rate.max(1.0));

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                on_frame().await;
            }
        });

        Self { cancelled, task }
    }

    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True once the task has observed the flag and exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeAudio {
        ready: bool,
        playing: Mutex<bool>,
        time: Mutex<f64>,
        seeks: Mutex<Vec<f64>>,
        pauses: Mutex<usize>,
    }

    impl AudioTransport for FakeAudio {
        fn ready(&self) -> bool {
            self.ready
        }
        fn playing(&self) -> bool {
            *self.playing.lock()
        }
        fn current_time(&self) -> Option<f64> {
            self.ready.then(|| *self.time.lock())
        }
        fn ended(&self) -> bool {
            false
        }
        fn play(&self) {
            *self.playing.lock() = true;
        }
        fn pause(&self) {
            *self.playing.lock() = false;
            *self.pauses.lock() += 1;
        }
        fn seek(&self, time: f64) {
            *self.time.lock() = time;
            self.seeks.lock().push(time);
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        pauses: Mutex<usize>,
        ticks: Mutex<Vec<f64>>,
        tick_reply: Mutex<Option<TickUpdate>>,
    }

    impl TransportControl for FakeTransport {
        fn pause(&self) -> BoxFuture<'_, HostResult<()>> {
            *self.pauses.lock() += 1;
            async { Ok(()) }.boxed()
        }
        fn tick(&self, dt: f64) -> BoxFuture<'_, HostResult<Option<TickUpdate>>> {
            self.ticks.lock().push(dt);
            let reply = *self.tick_reply.lock();
            async move { Ok(reply) }.boxed()
        }
    }

    fn info(playing: bool, region: Option<(f64, f64)>, looping: bool) -> PlaybackInfo {
        PlaybackInfo {
            playing,
            current_time: 0.0,
            duration: 60.0,
            sequence_index: 0,
            region,
            looping,
        }
    }

    #[tokio::test]
    async fn audio_clock_is_authoritative() {
        let audio = FakeAudio {
            ready: true,
            playing: Mutex::new(true),
            time: Mutex::new(4.2),
            ..FakeAudio::default()
        };
        let host = FakeTransport::default();
        let mut arbiter = ClockArbiter::new();

        arbiter
            .advance(Instant::now(), Some(&audio), &host, &info(true, None, false))
            .await
            .unwrap();
        assert_eq!(arbiter.displayed_time(), 4.2);
        assert!(arbiter.displayed_playing());
        // Audio won: the engine's virtual clock was not ticked.
        assert!(host.ticks.lock().is_empty());
    }

    #[tokio::test]
    async fn region_end_pauses_exactly_once() {
        // Approaching [2, 10] without looping: nothing at 9.9, then one
        // pause when the clock passes 10, and no repeat while it sits there.
        let audio = FakeAudio {
            ready: true,
            playing: Mutex::new(true),
            time: Mutex::new(9.9),
            ..FakeAudio::default()
        };
        let host = FakeTransport::default();
        let playback = info(true, Some((2.0, 10.0)), false);
        let mut arbiter = ClockArbiter::new();

        arbiter
            .advance(Instant::now(), Some(&audio), &host, &playback)
            .await
            .unwrap();
        assert_eq!(arbiter.displayed_time(), 9.9);
        assert_eq!(*host.pauses.lock(), 0);

        *audio.time.lock() = 10.02;
        arbiter
            .advance(Instant::now(), Some(&audio), &host, &playback)
            .await
            .unwrap();
        assert_eq!(arbiter.displayed_time(), 10.0);
        assert!(!arbiter.displayed_playing());
        assert_eq!(*audio.pauses.lock(), 1);
        assert_eq!(*host.pauses.lock(), 1);

        // Audio is paused now; further frames take the not-playing branch
        // and must not pause again.
        arbiter
            .advance(Instant::now(), Some(&audio), &host, &info(false, Some((2.0, 10.0)), false))
            .await
            .unwrap();
        assert_eq!(*host.pauses.lock(), 1);
    }

    #[tokio::test]
    async fn looping_region_seeks_back_and_keeps_playing() {
        let audio = FakeAudio {
            ready: true,
            playing: Mutex::new(true),
            time: Mutex::new(10.5),
            ..FakeAudio::default()
        };
        let host = FakeTransport::default();
        let mut arbiter = ClockArbiter::new();

        arbiter
            .advance(
                Instant::now(),
                Some(&audio),
                &host,
                &info(true, Some((2.0, 10.0)), true),
            )
            .await
            .unwrap();
        assert_eq!(audio.seeks.lock().clone(), vec![2.0]);
        assert_eq!(arbiter.displayed_time(), 2.0);
        assert!(arbiter.displayed_playing());
        assert_eq!(*audio.pauses.lock(), 0);
        assert_eq!(*host.pauses.lock(), 0);
    }

    #[tokio::test]
    async fn silent_sequence_ticks_engine_clock() {
        let host = FakeTransport {
            tick_reply: Mutex::new(Some(TickUpdate {
                current_time: 1.25,
                playing: true,
            })),
            ..FakeTransport::default()
        };
        let mut arbiter = ClockArbiter::new();
        let t0 = Instant::now();

        // First frame has no baseline: dt must be 0.
        arbiter
            .advance(t0, None::<&FakeAudio>, &host, &info(true, None, false))
            .await
            .unwrap();
        // Second frame: dt is the gap between the frames.
        arbiter
            .advance(
                t0 + Duration::from_millis(16),
                None::<&FakeAudio>,
                &host,
                &info(true, None, false),
            )
            .await
            .unwrap();

        let ticks = host.ticks.lock().clone();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0], 0.0);
        assert!((ticks[1] - 0.016).abs() < 1e-9);
        assert_eq!(arbiter.displayed_time(), 1.25);
    }

    #[tokio::test]
    async fn paused_frames_keep_dt_baseline_fresh() {
        let host = FakeTransport {
            tick_reply: Mutex::new(Some(TickUpdate {
                current_time: 0.5,
                playing: true,
            })),
            ..FakeTransport::default()
        };
        let mut arbiter = ClockArbiter::new();
        let t0 = Instant::now();

        // A long stretch of paused frames...
        for i in 0..10 {
            arbiter
                .advance(
                    t0 + Duration::from_millis(100 * i),
                    None::<&FakeAudio>,
                    &host,
                    &info(false, None, false),
                )
                .await
                .unwrap();
        }
        assert!(host.ticks.lock().is_empty());

        // ...then play: dt spans only the last frame gap, not the pause.
        arbiter
            .advance(
                t0 + Duration::from_millis(916),
                None::<&FakeAudio>,
                &host,
                &info(true, None, false),
            )
            .await
            .unwrap();
        let ticks = host.ticks.lock().clone();
        assert_eq!(ticks.len(), 1);
        assert!((ticks[0] - 0.016).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_loop_stops_on_cancellation_flag() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let frame_loop = FrameLoop::start(60.0, move || {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let before_stop = count.load(Ordering::SeqCst);
        assert!(before_stop > 0, "loop never fired");

        frame_loop.stop();
        assert!(frame_loop.is_stopped());
        tokio::time::sleep(Duration::from_millis(100)).await;
        let after = count.load(Ordering::SeqCst);
        // At most the frame already in flight when the flag flipped.
        assert!(after <= before_stop + 1);
    }
}
