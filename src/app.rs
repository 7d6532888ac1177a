use color_eyre::Result;
use crossterm::event::{Event, KeyEventKind};
use futures::{Stream, StreamExt};
use std::time::Duration;
use tracing::info;

use crate::controller::{AutoSaveController, ControllerEvent, Flow};
use crate::store::EntryStore;
use crate::ui::Screen;

/// Redraw cadence so the live date heading rolls over at midnight.
const CLOCK_TICK: Duration = Duration::from_secs(30);

/// Runs the page until the user quits, then hands the terminal back. The
/// screen is restored whether the session ends normally or with an error.
pub async fn run<S, V, I>(
    controller: &mut AutoSaveController<S>,
    screen: &mut V,
    input: I,
) -> Result<()>
where
    S: EntryStore,
    V: Screen,
    I: Stream<Item = std::io::Result<Event>> + Unpin,
{
    let result = session(controller, screen, input).await;
    let restored = screen.restore();
    result.and(restored)
}

/// Terminal input and the controller's own timers and save completions all
/// funnel into `dispatch`, one at a time.
async fn session<S, V, I>(
    controller: &mut AutoSaveController<S>,
    screen: &mut V,
    mut input: I,
) -> Result<()>
where
    S: EntryStore,
    V: Screen,
    I: Stream<Item = std::io::Result<Event>> + Unpin,
{
    screen.display(controller.state(), controller.today())?;
    controller.initialize().await;

    let mut clock = tokio::time::interval(CLOCK_TICK);
    loop {
        screen.display(controller.state(), controller.today())?;

        let flow = tokio::select! {
            maybe_input = input.next() => match maybe_input {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match screen.handle_key(key, controller.state(), controller.today()) {
                        Some(event) => controller.dispatch(event).await,
                        None => Flow::Continue,
                    }
                }
                Some(Ok(_)) => Flow::Continue,
                Some(Err(err)) => {
                    controller.flush_on_exit().await;
                    return Err(err.into());
                }
                None => controller.dispatch(ControllerEvent::Exit).await,
            },
            Some(event) = controller.next_event() => controller.dispatch(event).await,
            _ = clock.tick() => Flow::Continue,
        };

        if flow == Flow::Exit {
            info!("exiting");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerSettings;
    use crate::diary_entry::{DiaryEntry, EntryIndex};
    use crate::diary_state::DiaryState;
    use crate::ui::Page;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use color_eyre::eyre::eyre;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[derive(Default)]
    struct MemoryStore {
        loads: Mutex<u32>,
        saves: Mutex<Vec<DiaryEntry>>,
    }

    #[async_trait]
    impl EntryStore for MemoryStore {
        async fn today(&self) -> crate::store::Result<DiaryEntry> {
            *self.loads.lock().unwrap() += 1;
            Ok(DiaryEntry::new(today(), ""))
        }

        async fn entries(&self) -> crate::store::Result<EntryIndex> {
            Ok(EntryIndex {
                entries: vec![today()],
            })
        }

        async fn entry(&self, date: NaiveDate) -> crate::store::Result<DiaryEntry> {
            Ok(DiaryEntry::new(date, ""))
        }

        async fn save(&self, entry: &DiaryEntry) -> crate::store::Result<()> {
            self.saves.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeScreen {
        page: Page,
        broken: bool,
        frames: u32,
        restored: bool,
    }

    impl Screen for FakeScreen {
        fn display(&mut self, state: &DiaryState, today: NaiveDate) -> Result<()> {
            if self.broken {
                return Err(eyre!("terminal is gone"));
            }
            self.frames += 1;
            self.page.sync(state, today);
            Ok(())
        }

        fn handle_key(
            &mut self,
            key: KeyEvent,
            state: &DiaryState,
            today: NaiveDate,
        ) -> Option<ControllerEvent> {
            self.page.handle_key(key, state, today)
        }

        fn restore(&mut self) -> Result<()> {
            self.restored = true;
            Ok(())
        }
    }

    fn controller() -> (AutoSaveController<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let controller = AutoSaveController::new(Arc::clone(&store), ControllerSettings::default())
            .with_today(today);
        (controller, store)
    }

    fn keys(codes: &[KeyCode]) -> Vec<std::io::Result<Event>> {
        codes
            .iter()
            .map(|&code| Ok(Event::Key(KeyEvent::new(code, KeyModifiers::NONE))))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn typed_text_is_saved_when_quitting() {
        let (mut controller, store) = controller();
        let mut screen = FakeScreen::default();
        let input = futures::stream::iter(keys(&[
            KeyCode::Char('h'),
            KeyCode::Char('i'),
            KeyCode::Esc,
        ]));

        run(&mut controller, &mut screen, input).await.unwrap();

        assert!(screen.restored);
        assert_eq!(
            *store.saves.lock().unwrap(),
            vec![DiaryEntry::new(today(), "hi")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_frame_still_restores_terminal() {
        let (mut controller, store) = controller();
        let mut screen = FakeScreen {
            broken: true,
            ..FakeScreen::default()
        };

        let result = run(
            &mut controller,
            &mut screen,
            futures::stream::empty::<std::io::Result<Event>>(),
        )
        .await;

        assert!(result.is_err());
        assert!(screen.restored);
        assert_eq!(screen.frames, 0);
        assert_eq!(*store.loads.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn input_error_flushes_and_restores() {
        let (mut controller, store) = controller();
        let mut screen = FakeScreen::default();
        let mut events = keys(&[KeyCode::Char('x')]);
        events.push(Err(std::io::Error::other("tty lost")));

        let result = run(&mut controller, &mut screen, futures::stream::iter(events)).await;

        assert!(result.is_err());
        assert!(screen.restored);
        assert_eq!(
            *store.saves.lock().unwrap(),
            vec![DiaryEntry::new(today(), "x")]
        );
    }
}
