//! Ordered middleware layers and the chains built from them.
//!
//! Layers are stored outermost first. A chain is built by folding from the
//! router outward, each layer wrapping what has been built so far.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::error::Error;
use crate::http::{BoxHandler, BoxHttpHandler, Context, Handler, HttpHandler, Request, ResponseWriter};
use crate::middleware::pool::StackPool;
use crate::middleware::Middleware;

/// The context of the request currently inside one http-shaped layer.
/// Every such layer in a chain gets its own slot, so a layer that calls its
/// inner handler more than once always resumes with the context it was
/// entered with.
#[derive(Default)]
struct ContextSlot(Mutex<Option<Context>>);

impl ContextSlot {
    fn set(&self, cx: &Context) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(cx.clone());
    }

    fn get(&self) -> Context {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Entry into an http-shaped layer: remember the context, drop it from the
/// call.
struct EnterHttp {
    slot: Arc<ContextSlot>,
    inner: BoxHttpHandler,
}

impl Handler for EnterHttp {
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        self.slot.set(cx);
        self.inner.serve_http(w, req);
    }
}

/// Exit from an http-shaped layer: pick the remembered context back up.
struct LeaveHttp {
    slot: Arc<ContextSlot>,
    inner: BoxHandler,
}

impl HttpHandler for LeaveHttp {
    fn serve_http(&self, w: &mut ResponseWriter, req: &Request) {
        let cx = self.slot.get();
        self.inner.serve(&cx, w, req);
    }
}

/// An explicit-next layer with its next handler bound.
struct BoundNext {
    layer: Middleware,
    next: BoxHandler,
}

impl Handler for BoundNext {
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        if let Middleware::Next(f) = &self.layer {
            f(cx, w, req, self.next.as_ref());
        }
    }
}

/// One built chain.
pub struct StackInstance {
    chain: BoxHandler,
    slots: Vec<Arc<ContextSlot>>,
    generation: u64,
}

impl StackInstance {
    pub(crate) fn bare(endpoint: BoxHandler, generation: u64) -> Self {
        Self {
            chain: endpoint,
            slots: Vec::new(),
            generation,
        }
    }

    /// Generation of the layer list this chain was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a request context is still parked in the chain.
    pub fn holds_context(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.0.lock().unwrap_or_else(PoisonError::into_inner).is_some())
    }

    fn reset(&self) {
        for slot in &self.slots {
            slot.clear();
        }
    }
}

impl Handler for StackInstance {
    fn serve(&self, cx: &Context, w: &mut ResponseWriter, req: &Request) {
        self.chain.serve(cx, w, req);
    }
}

impl fmt::Debug for StackInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackInstance")
            .field("generation", &self.generation)
            .finish()
    }
}

/// A layer list together with its pool.
struct Generation {
    layers: Vec<Middleware>,
    pool: StackPool,
}

impl Generation {
    fn new(id: u64, layers: Vec<Middleware>) -> Self {
        Self {
            layers,
            pool: StackPool::new(id),
        }
    }

    fn id(&self) -> u64 {
        self.pool.generation()
    }
}

/// Middleware layers in front of an endpoint, with pooled chains.
pub struct MiddlewareStack {
    lock: Mutex<()>,
    current: ArcSwap<Generation>,
    endpoint: BoxHandler,
}

impl MiddlewareStack {
    pub fn new(endpoint: BoxHandler) -> Self {
        Self {
            lock: Mutex::new(()),
            current: ArcSwap::from_pointee(Generation::new(0, Vec::new())),
            endpoint,
        }
    }

    /// Append a layer inside all existing ones.
    pub fn use_layer(&self, layer: Middleware) {
        tracing::debug!(layer = ?layer, "Adding middleware");
        self.update(|layers| layers.push(layer));
    }

    /// Insert `layer` immediately before (outside of) `before`.
    pub fn insert(&self, layer: Middleware, before: &Middleware) -> Result<(), Error> {
        self.mutate(|layers| {
            let at = position(layers, before)?;
            tracing::debug!(layer = ?layer, before = ?before, "Inserting middleware");
            layers.insert(at, layer);
            Ok(())
        })
    }

    /// Remove `layer`.
    pub fn abandon(&self, layer: &Middleware) -> Result<(), Error> {
        self.mutate(|layers| {
            let at = position(layers, layer)?;
            tracing::debug!(layer = ?layer, "Abandoning middleware");
            layers.remove(at);
            Ok(())
        })
    }

    /// Start a new generation without changing the layers, e.g. after the
    /// routes changed.
    pub fn invalidate(&self) {
        self.update(|_| {});
    }

    /// Current layers, outermost first.
    pub fn layers(&self) -> Vec<Middleware> {
        self.current.load().layers.clone()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().id()
    }

    /// Idle chains in the current pool.
    pub fn idle(&self) -> usize {
        self.current.load().pool.idle()
    }

    /// Build a fresh chain from the current layers.
    pub fn new_stack(&self) -> StackInstance {
        self.build(&self.current.load())
    }

    /// Get a chain for one request.
    pub fn alloc(&self) -> StackInstance {
        let generation = self.current.load_full();
        match generation.pool.take() {
            Some(instance) => instance,
            None => self.build(&generation),
        }
    }

    /// Give a chain back after its request finished.
    pub fn release(&self, instance: StackInstance) {
        instance.reset();
        let kept = self.current.load().pool.put(instance);
        if !kept {
            tracing::trace!("Dropped middleware chain instead of pooling it");
        }
    }

    fn build(&self, generation: &Generation) -> StackInstance {
        let mut instance = StackInstance::bare(self.endpoint.clone(), generation.id());

        let mut handler = self.endpoint.clone();
        for layer in generation.layers.iter().rev() {
            handler = match layer {
                Middleware::Http(wrap) => {
                    let slot = Arc::new(ContextSlot::default());
                    instance.slots.push(slot.clone());
                    let leave: BoxHttpHandler = Arc::new(LeaveHttp {
                        slot: slot.clone(),
                        inner: handler,
                    });
                    Arc::new(EnterHttp {
                        slot,
                        inner: wrap(leave),
                    })
                }
                Middleware::Contextual(wrap) => wrap(handler),
                Middleware::Next(_) => Arc::new(BoundNext {
                    layer: layer.clone(),
                    next: handler,
                }),
            };
        }

        instance.chain = handler;
        instance
    }

    /// Apply a change that may be refused. A refused change publishes
    /// nothing.
    fn mutate(
        &self,
        change: impl FnOnce(&mut Vec<Middleware>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut layers = self.current.load().layers.clone();
        change(&mut layers)?;
        self.publish(layers);
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut Vec<Middleware>)) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut layers = self.current.load().layers.clone();
        change(&mut layers);
        self.publish(layers);
    }

    /// Store `layers` as the next generation. Callers hold `lock`.
    fn publish(&self, layers: Vec<Middleware>) {
        let id = self.current.load().id() + 1;
        self.current.store(Arc::new(Generation::new(id, layers)));
        tracing::debug!(generation = id, "Middleware pool invalidated");
    }
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        f.debug_struct("MiddlewareStack")
            .field("layers", &current.layers)
            .field("generation", &current.id())
            .finish()
    }
}

fn position(layers: &[Middleware], wanted: &Middleware) -> Result<usize, Error> {
    layers
        .iter()
        .position(|l| l.same_layer(wanted))
        .ok_or(Error::LayerNotFound)
}
