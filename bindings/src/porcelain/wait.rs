use crate::Binding;

/// Waiting on binding values asynchronously
pub trait Wait<T: 'static> {
    /// Wait for the binding to hold `target_value`
    fn wait_value(&self, target_value: T) -> impl std::future::Future<Output = ()> + Send
    where T: PartialEq;

    /// Wait for a value matching the given predicate
    fn wait_for<F, R>(&self, predicate: F) -> impl std::future::Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult;
}

/// Lets `wait_for` predicates return either a plain `bool` or an `Option` carrying a result.
///
/// `result()` returns `Some(output)` to stop waiting with `output`, or `None` to keep
/// waiting for the next change.
pub trait WaitResult {
    type Output;
    fn result(self) -> Option<Self::Output>;
}

// true = stop with (), false = keep waiting
impl WaitResult for bool {
    type Output = ();
    fn result(self) -> Option<Self::Output> { if self { Some(()) } else { None } }
}

impl<T> WaitResult for Option<T> {
    type Output = T;
    fn result(self) -> Option<Self::Output> { self }
}

impl<T, B> Wait<T> for B
where
    B: Binding<T> + ?Sized,
    T: Clone + Send + Sync + 'static,
{
    fn wait_value(&self, target_value: T) -> impl std::future::Future<Output = ()> + Send
    where T: PartialEq {
        self.wait_for(move |value| *value == target_value)
    }

    fn wait_for<F, R>(&self, predicate: F) -> impl std::future::Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult,
    {
        // the publisher yields the current value first, so a value that already matches
        // resolves without waiting for a change
        let mut publisher = self.publisher();
        async move {
            while let Some(value) = publisher.recv().await {
                if let Some(result) = predicate(&value).result() {
                    return result;
                }
            }
            // the publisher keeps the binding alive, so its channel does not close
            std::future::pending().await
        }
    }
}
