use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RunningUser {
    index: u64,
    cancel: CancellationToken,
    handle: JoinHandle<u64>,
}

/// Running virtual users in spawn order, plus the handles of users that were
/// already told to stop and still need to be awaited.
#[derive(Default)]
pub struct Population {
    active: Vec<RunningUser>,
    retired: Vec<JoinHandle<u64>>,
    stopped: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Users stopped by shrinking so far (not counting the final shutdown).
    pub fn stopped(&self) -> u64 {
        self.stopped
    }

    pub fn push(&mut self, index: u64, cancel: CancellationToken, handle: JoinHandle<u64>) {
        self.active.push(RunningUser {
            index,
            cancel,
            handle,
        });
    }

    /// Cancels the `n` most recently started users and returns their indices,
    /// newest first. The users finish their current request before exiting.
    pub fn stop_newest(&mut self, n: usize) -> Vec<u64> {
        let mut stopped = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(user) = self.active.pop() else { break };
            user.cancel.cancel();
            self.retired.push(user.handle);
            stopped.push(user.index);
        }
        self.stopped += stopped.len() as u64;
        stopped
    }

    /// Every handle, active and retired. Callers cancel first.
    pub fn into_handles(self) -> Vec<JoinHandle<u64>> {
        let mut handles = self.retired;
        handles.extend(self.active.into_iter().map(|u| u.handle));
        handles
    }
}
