use async_channel::Receiver;

use crate::display::DisplaySink;
use crate::format::clock_face;
use crate::timer::TimerEvent;

/// Draws the analogue face from the engine's event stream.
pub struct AnalogueRenderer<S> {
    sink: S,
}

impl<S: DisplaySink> AnalogueRenderer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn handle(&mut self, event: &TimerEvent) {
        if let Some(value_ms) = event.displayed_ms() {
            self.sink.show_face(&clock_face(value_ms));
        }
    }

    pub async fn run(mut self, events: Receiver<TimerEvent>) {
        while let Ok(event) = events.recv().await {
            self.handle(&event);
        }
        tracing::debug!("analogue renderer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::testing::RecordingDisplay;
    use crate::timer::Mode;

    #[test]
    fn test_faces_follow_events() {
        let display = RecordingDisplay::default();
        let mut renderer = AnalogueRenderer::new(display.clone());

        renderer.handle(&TimerEvent::Tick {
            mode: Mode::Stopwatch,
            value_ms: 75_000,
        });
        renderer.handle(&TimerEvent::LapsCleared);
        renderer.handle(&TimerEvent::Reset);

        let faces = display.faces();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].label, "01:15");
        assert!((faces[0].fraction_of_minute - 0.25).abs() < 1e-9);
        assert_eq!(faces[1].label, "00:00");
        assert_eq!(faces[1].fraction_of_minute, 0.0);
    }

    #[tokio::test]
    async fn test_run_until_engine_goes_away() {
        let display = RecordingDisplay::default();
        let (tx, rx) = async_channel::unbounded();
        let task = tokio::spawn(AnalogueRenderer::new(display.clone()).run(rx));

        tx.send(TimerEvent::Paused { value_ms: 30_000 }).await.unwrap();
        drop(tx);
        task.await.unwrap();
        assert_eq!(display.faces()[0].label, "00:30");
    }
}
