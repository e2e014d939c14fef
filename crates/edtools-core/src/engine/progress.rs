#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional observer.
///
/// Reporting is a no-op without a callback; worker threads may report
/// concurrently because the callback is `Sync`.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn events_reach_the_callback_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let tag = match event {
                Progress::PhaseStart { name } => name.to_string(),
                Progress::TaskIncrement => "+".to_string(),
                Progress::Message(m) => m,
                _ => "-".to_string(),
            };
            seen.lock().unwrap().push(tag);
        }));
        reporter.report(Progress::PhaseStart { name: "parse" });
        reporter.report(Progress::TaskIncrement);
        reporter.report(Progress::Message("done".to_string()));
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec!["parse", "+", "done"]);
    }

    #[test]
    fn reporter_without_callback_ignores_events() {
        ProgressReporter::new().report(Progress::TaskFinish);
    }
}
