use tracing::debug;

use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Listener<A> {
    id: u64,
    key: String,
    action: A,
}

#[derive(Debug)]
struct Listeners<A> {
    next_id: u64,
    listeners: Vec<Listener<A>>,
}

/// Global key-press observer.
///
/// Listeners are registered through [`Keyboard::bind`] and stay installed only
/// as long as the returned [`KeyBinding`] is alive.
#[derive(Debug)]
pub struct Keyboard<A> {
    inner: Arc<Mutex<Listeners<A>>>,
}

impl<A> Default for Keyboard<A> {
    fn default() -> Self {
        Keyboard {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<A: Clone + Send + 'static> Keyboard<A> {
    pub fn bind(&self, key: &str, action: A) -> KeyBinding {
        let mut inner = self.inner.lock().expect("Poisoned lock");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            key: key.to_string(),
            action,
        });

        let weak = Arc::downgrade(&self.inner);
        KeyBinding {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock().expect("Poisoned lock");
                    inner.listeners.retain(|listener| listener.id != id);
                }
            })),
        }
    }

    /// Actions bound to `code`, compared case-insensitively, in install order
    pub fn press(&self, code: &str) -> Vec<A> {
        let inner = self.inner.lock().expect("Poisoned lock");
        let actions: Vec<A> = inner
            .listeners
            .iter()
            .filter(|listener| listener.key.eq_ignore_ascii_case(code))
            .map(|listener| listener.action.clone())
            .collect();
        debug!("Key {code} matched {} listeners", actions.len());
        actions
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().expect("Poisoned lock").listeners.len()
    }
}

/// Removes its listener when dropped.
pub struct KeyBinding {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBinding").finish_non_exhaustive()
    }
}

impl Drop for KeyBinding {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}
