use std::time::Instant;

use anyhow::Result;

use super::batch::Batch;
use super::request::Request;

/// Consumer of request batches.
///
/// A backend owns every GPU object created through the protocol. `submit` must process
/// the pending requests of `batch` in order and leave the batch empty.
pub trait Backend {
    /// Executes all pending requests, presenting any completed recording.
    fn submit(&mut self, batch: &mut Batch) -> Result<()>;

    /// Releases every resource created so far. Called once at teardown.
    fn destroy(&mut self) {}

    /// When the most recent recording was handed to the display, if any was.
    fn last_present(&self) -> Option<Instant> {
        None
    }
}

/// Backend that executes nothing and keeps every submitted request.
///
/// Useful for headless dry runs and for checking the exact command stream a scene emits.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    submissions: Vec<Vec<Request>>,
    destroyed: bool,
    presented: Option<Instant>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All submissions so far, oldest first.
    pub fn submissions(&self) -> &[Vec<Request>] {
        &self.submissions
    }

    /// The most recent submission, if any.
    pub fn last(&self) -> Option<&[Request]> {
        self.submissions.last().map(Vec::as_slice)
    }

    /// Every submitted request, flattened in order.
    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.submissions.iter().flatten()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn clear(&mut self) {
        self.submissions.clear();
    }
}

impl Backend for RecordingBackend {
    fn submit(&mut self, batch: &mut Batch) -> Result<()> {
        let requests = batch.take();
        log::trace!("recording backend: {} requests", requests.len());
        if requests
            .iter()
            .any(|r| matches!(r, Request::RecordEnd { .. }))
        {
            self.presented = Some(Instant::now());
        }
        self.submissions.push(requests);
        Ok(())
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn last_present(&self) -> Option<Instant> {
        self.presented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Id;

    #[test]
    fn only_finished_recordings_count_as_presented() {
        let mut backend = RecordingBackend::new();
        let mut batch = Batch::new();
        batch.create_canvas(10, 10, [0, 0, 0, 255]);
        backend.submit(&mut batch).unwrap();
        assert!(backend.last_present().is_none());
        assert!(batch.is_empty());

        let before = Instant::now();
        batch.record_begin(Id::new(1));
        batch.record_end(Id::new(1));
        backend.submit(&mut batch).unwrap();
        let presented = backend.last_present().unwrap();
        assert!(presented >= before);
        assert_eq!(backend.submissions().len(), 2);
    }
}
