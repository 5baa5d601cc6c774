//! Ordered byte-to-byte transforms applied to every frame in one direction.
//!
//! A [`Pipeline`] is copy-on-write: registration builds a new chain and
//! swaps it in, so a transaction iterates the [`Chain`] snapshot it took at
//! start and never observes a partially grown sequence. The registration
//! lock serializes writers only and is never held while interceptors run.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::error::{BoxError, CodecError, Direction, Result};

/// A pure transform from one frame to another, or a rejection.
///
/// Must be safe to call repeatedly and concurrently from different
/// transactions.
pub type Interceptor =
    Arc<dyn Fn(Vec<u8>) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync>;

/// Append-only, copy-on-write interceptor sequence for one direction.
pub struct Pipeline {
    direction: Direction,
    chain: ArcSwap<Vec<Interceptor>>,
    register_lock: Mutex<()>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            chain: ArcSwap::from_pointee(Vec::new()),
            register_lock: Mutex::new(()),
        }
    }

    /// Append an interceptor to the end of the chain.
    pub fn register<F>(&self, interceptor: F)
    where
        F: Fn(Vec<u8>) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        self.register_shared(Arc::new(interceptor));
    }

    /// Append an already shared interceptor to the end of the chain.
    pub fn register_shared(&self, interceptor: Interceptor) {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = self
            .register_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.chain.load();
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(interceptor);
        let chain_len = next.len();
        self.chain.store(Arc::new(next));

        debug!(direction = %self.direction, chain_len, "registered interceptor");
    }

    /// Capture the current chain.
    pub fn snapshot(&self) -> Chain {
        Chain {
            direction: self.direction,
            interceptors: self.chain.load_full(),
        }
    }

    /// Number of registered interceptors.
    pub fn len(&self) -> usize {
        self.chain.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for Pipeline {
    /// The clone starts from the current chain but owns its own storage and
    /// registration lock; registering on either side never affects the other.
    fn clone(&self) -> Self {
        Self {
            direction: self.direction,
            chain: ArcSwap::new(self.chain.load_full()),
            register_lock: Mutex::new(()),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("direction", &self.direction)
            .field("len", &self.len())
            .finish()
    }
}

/// Immutable snapshot of a [`Pipeline`].
#[derive(Clone)]
pub struct Chain {
    direction: Direction,
    interceptors: Arc<Vec<Interceptor>>,
}

impl Chain {
    /// Run every interceptor in registration order.
    ///
    /// The first failure stops the chain; later interceptors never run.
    pub fn apply(&self, frame: Vec<u8>) -> Result<Vec<u8>> {
        let mut frame = frame;
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            frame = interceptor(frame).map_err(|source| {
                debug!(direction = %self.direction, index, error = %source, "interceptor rejected frame");
                CodecError::Interceptor {
                    direction: self.direction,
                    index,
                    source,
                }
            })?;
        }
        Ok(frame)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

/// XOR every byte with `mask`. Self-inverse, so the same transform undoes it.
pub fn xor_mask(
    mask: u8,
) -> impl Fn(Vec<u8>) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + Clone + 'static {
    move |mut frame: Vec<u8>| -> std::result::Result<Vec<u8>, BoxError> {
        for byte in frame.iter_mut() {
            *byte ^= mask;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn append(tag: u8) -> impl Fn(Vec<u8>) -> std::result::Result<Vec<u8>, BoxError> {
        move |mut frame: Vec<u8>| -> std::result::Result<Vec<u8>, BoxError> {
            frame.push(tag);
            Ok(frame)
        }
    }

    #[test]
    fn applies_in_registration_order() {
        let pipeline = Pipeline::new(Direction::Send);
        pipeline.register(append(1));
        pipeline.register(append(2));
        pipeline.register(append(3));

        let out = pipeline.snapshot().apply(vec![0]).unwrap();
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_chain_is_identity() {
        let pipeline = Pipeline::new(Direction::Recv);
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.snapshot().apply(vec![5, 6]).unwrap(), vec![5, 6]);
    }

    #[test]
    fn failure_halts_remaining_interceptors() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(Direction::Recv);
        pipeline.register(append(1));
        pipeline.register(|_frame| Err("corrupt frame".into()));
        let counter = Arc::clone(&later_calls);
        pipeline.register(move |frame| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(frame)
        });

        let err = pipeline.snapshot().apply(vec![0]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Interceptor {
                direction: Direction::Recv,
                index: 1,
                ..
            }
        ));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshot_ignores_later_registration() {
        let pipeline = Pipeline::new(Direction::Send);
        pipeline.register(append(1));
        let snapshot = pipeline.snapshot();
        pipeline.register(append(2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.apply(Vec::new()).unwrap(), vec![1]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn registering_from_inside_an_interceptor_does_not_deadlock() {
        let pipeline = Arc::new(Pipeline::new(Direction::Send));
        let inner = Arc::clone(&pipeline);
        pipeline.register(move |frame| {
            inner.register(append(9));
            Ok(frame)
        });

        let out = pipeline.snapshot().apply(vec![0]).unwrap();
        assert_eq!(out, vec![0]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn clone_is_copy_on_write() {
        let original = Pipeline::new(Direction::Send);
        original.register(append(1));

        let clone = original.clone();
        clone.register(append(2));
        original.register(append(3));

        assert_eq!(original.snapshot().apply(Vec::new()).unwrap(), vec![1, 3]);
        assert_eq!(clone.snapshot().apply(Vec::new()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn concurrent_registration_keeps_every_interceptor() {
        let pipeline = Arc::new(Pipeline::new(Direction::Recv));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || {
                    for _ in 0..16 {
                        pipeline.register(|frame| Ok(frame));
                        let snapshot = pipeline.snapshot();
                        assert!(snapshot.apply(vec![1]).is_ok());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pipeline.len(), 128);
    }

    #[test]
    fn xor_mask_is_self_inverse() {
        let mask = xor_mask(0xFF);
        let masked = mask(vec![0x00, 0x0F, 0xFF]).unwrap();
        assert_eq!(masked, vec![0xFF, 0xF0, 0x00]);
        assert_eq!(mask(masked).unwrap(), vec![0x00, 0x0F, 0xFF]);
    }
}
