use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::{
    Binding,
    broadcast::{Broadcast, WeakBroadcast},
};

/// An async view of a binding: the value at creation, then every change.
///
/// Changes are delivered after the binding's observations, in the order they happened.
/// Holding a publisher keeps the binding alive; dropping it ends the subscription.
pub struct Publisher<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    _registration: Registration<T>,
}

struct Registration<T> {
    broadcast: WeakBroadcast<T>,
    id: usize,
    _upstream: Arc<dyn Binding<T>>,
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) { self.broadcast.detach_publisher(self.id); }
}

impl<T: 'static> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").field("binding", &self._registration._upstream.binding_id()).finish()
    }
}

impl<T> Publisher<T>
where T: Clone + Send + Sync + 'static
{
    pub(crate) fn attach(broadcast: &Broadcast<T>, upstream: Arc<dyn Binding<T>>, current: T) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = broadcast.attach_publisher(sender, current);
        Self { receiver, _registration: Registration { broadcast: broadcast.downgrade(), id, _upstream: upstream } }
    }
}

impl<T> Publisher<T> {
    /// The next value, waiting for a change if none is buffered.
    pub async fn recv(&mut self) -> Option<T> { self.receiver.recv().await }

    /// The next buffered value, if any.
    pub fn try_recv(&mut self) -> Option<T> { self.receiver.try_recv().ok() }
}

impl<T> Unpin for Publisher<T> {}

impl<T> Stream for Publisher<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> { self.get_mut().receiver.poll_recv(cx) }
}
