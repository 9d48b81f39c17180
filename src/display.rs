use crate::format::{ClockFace, Readout};

/// Where rendered time goes. Implementations must not block.
pub trait DisplaySink: Send {
    fn show_readout(&mut self, readout: &Readout);

    fn show_face(&mut self, _face: &ClockFace) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show_readout(&mut self, _readout: &Readout) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Keeps everything it was asked to show. Clones share the recording.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingDisplay {
        readouts: Arc<Mutex<Vec<String>>>,
        faces: Arc<Mutex<Vec<ClockFace>>>,
    }

    impl RecordingDisplay {
        pub(crate) fn readouts(&self) -> Vec<String> {
            self.readouts.lock().unwrap().clone()
        }

        pub(crate) fn last_readout(&self) -> Option<String> {
            self.readouts.lock().unwrap().last().cloned()
        }

        pub(crate) fn faces(&self) -> Vec<ClockFace> {
            self.faces.lock().unwrap().clone()
        }
    }

    impl DisplaySink for RecordingDisplay {
        fn show_readout(&mut self, readout: &Readout) {
            self.readouts.lock().unwrap().push(readout.to_string());
        }

        fn show_face(&mut self, face: &ClockFace) {
            self.faces.lock().unwrap().push(face.clone());
        }
    }
}
