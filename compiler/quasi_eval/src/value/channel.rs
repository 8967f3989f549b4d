//! Channels.
//!
//! A channel wraps a crossbeam bounded channel (capacity 0 is a rendezvous).
//! Closing drops the stored sender: receivers drain what is buffered and then
//! observe disconnection, which surfaces as `(zero, false)`.

use super::Value;
use crate::errors::{channel_closed, EvalError};
use crate::types::Type;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use quasi_ir::ChanDir;
use std::sync::Arc;

pub struct Channel {
    sender: Mutex<Option<Sender<Value>>>,
    receiver: Receiver<Value>,
    cap: usize,
}

impl Channel {
    pub fn new(cap: usize) -> Arc<Channel> {
        let (tx, rx) = bounded(cap);
        Arc::new(Channel {
            sender: Mutex::new(Some(tx)),
            receiver: rx,
            cap,
        })
    }

    /// A sender handle, or an error if the channel is closed.
    pub fn sender(&self) -> Result<Sender<Value>, EvalError> {
        self.sender
            .lock()
            .clone()
            .ok_or_else(|| channel_closed("send on closed channel"))
    }

    pub fn receiver(&self) -> &Receiver<Value> {
        &self.receiver
    }

    /// Blocking send.
    pub fn send(&self, value: Value) -> Result<(), EvalError> {
        let tx = self.sender()?;
        tx.send(value)
            .map_err(|_| channel_closed("send on closed channel"))
    }

    /// Blocking receive; `None` once closed and drained.
    pub fn recv(&self) -> Option<Value> {
        self.receiver.recv().ok()
    }

    pub fn close(&self) -> Result<(), EvalError> {
        match self.sender.lock().take() {
            Some(_) => Ok(()),
            None => Err(channel_closed("close of closed channel")),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

/// A channel value; `chan` is `None` for a nil channel.
#[derive(Clone)]
pub struct ChanValue {
    pub elem: Type,
    pub dir: ChanDir,
    pub chan: Option<Arc<Channel>>,
}

impl ChanValue {
    pub fn new(elem: Type, cap: usize) -> Self {
        ChanValue {
            elem,
            dir: ChanDir::Both,
            chan: Some(Channel::new(cap)),
        }
    }

    pub fn nil(elem: Type, dir: ChanDir) -> Self {
        ChanValue {
            elem,
            dir,
            chan: None,
        }
    }

    pub fn id(&self) -> usize {
        self.chan.as_ref().map_or(0, |c| Arc::as_ptr(c) as usize)
    }
}
