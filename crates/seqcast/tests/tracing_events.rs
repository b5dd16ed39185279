//! Structured log output of sequence mutations.

use parking_lot::Mutex;
use seqcast::{ObservableSequence, SequenceConfig};
use std::io::Write;
use std::sync::Arc;
use tracing::Level;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture(f: impl FnOnce()) -> String {
    let out = Capture::default();
    let writer = out.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    out.text()
}

#[test]
fn mutations_are_logged_with_label() {
    let text = capture(|| {
        let seq = ObservableSequence::with_config(
            vec![1, 2],
            SequenceConfig::new().with_label("scores"),
        );
        seq.append(3).unwrap();
    });
    assert!(text.contains("sequence mutated"), "{text}");
    assert!(text.contains("append"), "{text}");
    assert!(text.contains("scores"), "{text}");
}

#[test]
fn rejections_are_logged() {
    let text = capture(|| {
        let seq = ObservableSequence::new(vec![1]);
        assert!(seq.remove_at(4).is_err());
    });
    assert!(text.contains("sequence mutation rejected"), "{text}");
    assert!(text.contains("index 4 out of range"), "{text}");
}

#[test]
fn disposal_is_logged() {
    let text = capture(|| {
        let seq = ObservableSequence::<u8>::default();
        seq.dispose();
    });
    assert!(text.contains("sequence disposed"), "{text}");
}
