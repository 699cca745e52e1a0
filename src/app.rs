use futures::channel::mpsc::UnboundedReceiver;

use std::sync::{Arc, Mutex};

use crate::{
    indexer::MovieIndexer,
    search::SearchState,
    session::{Command, DispatchError, Session},
    store::KeyValueStore,
    view::ViewModel,
};

type SharedSession<I, S> = Arc<Mutex<Session<I, S>>>;

pub struct App<I, S> {
    inner: SharedSession<I, S>,
}

impl<I, S> Clone for App<I, S> {
    fn clone(&self) -> Self {
        App {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: MovieIndexer, S: KeyValueStore> App<I, S> {
    pub fn new(indexer: I, store: S) -> App<I, S> {
        let session = Session::new(Arc::new(indexer), store);
        App {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn view(&self) -> ViewModel {
        let inner = self.inner.lock().expect("Poisoned lock");
        ViewModel::new(&*inner)
    }

    pub fn subscribe_search(&self) -> UnboundedReceiver<SearchState> {
        let inner = self.inner.lock().expect("Poisoned lock");
        inner.search().subscribe()
    }

    /// Applies `command`, waits for any request it started to settle, and
    /// returns the resulting view.
    ///
    /// A newer command may supersede the request while it is in flight, in
    /// which case the returned view reflects whatever is current.
    pub async fn dispatch(&self, command: Command) -> Result<ViewModel, DispatchError> {
        let task = {
            let mut inner = self.inner.lock().expect("Poisoned lock");
            inner.dispatch(command)?
        };

        if let Some(task) = task {
            task.await;
        }

        Ok(self.view())
    }
}
