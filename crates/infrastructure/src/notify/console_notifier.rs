//! Terminal notifier.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokenrelay_application::ports::Notifier;
use tokenrelay_domain::{Notice, NoticeSettings};
use tracing::{info, warn};

/// Prints notices to stderr, optionally waiting for Enter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier {
    acknowledge: bool,
}

impl ConsoleNotifier {
    /// Creates a notifier from the notice settings.
    #[must_use]
    pub const fn new(settings: NoticeSettings) -> Self {
        Self {
            acknowledge: settings.acknowledge,
        }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notice: Notice) {
        if notice.is_failure() {
            warn!(?notice, "{}", notice.message());
        } else {
            info!(?notice, "{}", notice.message());
        }

        if !self.acknowledge {
            if let Err(err) = show(notice, false, &mut io::empty(), &mut io::stderr().lock()) {
                warn!(error = %err, "could not show notice");
            }
            return;
        }

        // Blocks a pool thread until Enter; the binary bounds runtime shutdown.
        let shown = tokio::task::spawn_blocking(move || {
            let mut stderr = io::stderr().lock();
            show(notice, true, &mut io::stdin().lock(), &mut stderr)
        })
        .await;

        match shown {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "could not show notice"),
            Err(err) => warn!(error = %err, "notice task failed"),
        }
    }
}

/// Writes `notice` to `out`; with `acknowledge`, blocks until a line is
/// read from `input`.
fn show(
    notice: Notice,
    acknowledge: bool,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "{}", notice.message())?;
    if acknowledge {
        write!(out, "Press Enter to continue...")?;
        out.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
    }
    out.flush()
}
