//! 由渲染循环轮询的一次性后台任务。
//!
//! 任务运行在独立的具名线程上，结果存入共享槽位。
//! 渲染循环每帧检查一次槽位；丢弃 [`Pending`] 会
//! 分离工作线程，其结果被丢弃。

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

/// 任务的结束方式
#[derive(Debug)]
pub enum Settled<T> {
    Done(T),
    /// 工作线程在写入槽位前 panic
    Lost,
}

pub struct Pending<T> {
    slot: Arc<Mutex<Option<T>>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Pending<T> {
    pub fn spawn<F>(name: &str, job: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&slot);
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = job();
                *shared.lock() = Some(result);
            })?;
        Ok(Self {
            slot,
            worker: Some(worker),
        })
    }

    /// 非阻塞。任务结束后恰好返回一次 `Some`
    pub fn try_take(&mut self) -> Option<Settled<T>> {
        let worker = self.worker.as_ref()?;
        if let Some(result) = self.slot.lock().take() {
            self.worker = None;
            return Some(Settled::Done(result));
        }
        if worker.is_finished() {
            self.worker = None;
            // 线程可能在两次检查之间写入了结果
            return Some(match self.slot.lock().take() {
                Some(result) => Settled::Done(result),
                None => Settled::Lost,
            });
        }
        None
    }

    /// 阻塞直到任务结束
    pub fn wait(mut self) -> Settled<T> {
        let Some(worker) = self.worker.take() else {
            return Settled::Lost;
        };
        let _ = worker.join();
        match self.slot.lock().take() {
            Some(result) => Settled::Done(result),
            None => Settled::Lost,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.worker.is_none()
    }
}
