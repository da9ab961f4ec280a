//! The handler registry: `op_name -> handler` table built once at startup.
//!
//! Label-keyed, `RwLock<HashMap<...>>`, sorted `op_names()` — the same shape
//! as a tower-based command registry, generalized so duplicate registration
//! is a hard startup error rather than a silent replace (spec.md §4.4:
//! "Exactly one handler per `op_name`; duplicates are a startup-time error,
//! not runtime").

use crate::acs_error::AcsErrorKind;
use crate::wire::cancel::CancellationToken;
use crate::wire::envelope::{decode_json_payload, encode_json_payload};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// The three handler classes a registered op may belong to (spec.md §4.4).
///
/// `CommandVoid`/`CommandWithResult` route to the Command Buffer's ordered
/// command lane; `Query` routes to its bounded-parallel query lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpClass {
    CommandVoid,
    CommandWithResult,
    Query,
}

/// Domain code implementing one `op_name`. External to this crate except for
/// this contract: decode payload, do the work, encode the result.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(
        &self,
        payload_bytes: &[u8],
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, AcsErrorKind>;

    fn class(&self) -> OpClass;
}

/// Adapts a typed async function into a [`Handler`] using the JSON-fallback
/// payload encoding (this crate ships no binary schema compiler; an op that
/// has one implements [`Handler`] directly instead of wrapping in this type).
pub struct JsonHandler<Req, Resp, F> {
    op_name: String,
    class: OpClass,
    func: F,
    _marker: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, F, Fut> JsonHandler<Req, Resp, F>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(Req, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, AcsErrorKind>> + Send,
{
    pub fn new(op_name: impl Into<String>, class: OpClass, func: F) -> Self {
        Self { op_name: op_name.into(), class, func, _marker: PhantomData }
    }
}

#[async_trait]
impl<Req, Resp, F, Fut> Handler for JsonHandler<Req, Resp, F>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(Req, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, AcsErrorKind>> + Send,
{
    async fn invoke(
        &self,
        payload_bytes: &[u8],
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, AcsErrorKind> {
        let req: Req = decode_json_payload(&self.op_name, payload_bytes)?;
        let resp = (self.func)(req, cancel).await?;
        Ok(encode_json_payload(&resp))
    }

    fn class(&self) -> OpClass {
        self.class
    }
}

/// Registration conflict, raised at startup — never at request time.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate handler registration for op {op_name:?}")]
pub struct RegistryError {
    pub op_name: String,
}

/// `op_name -> handler` table. Built once at Worker startup; read by every
/// request thereafter (single-writer-many-readers, like the teacher's
/// `CommandRegistry`).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: RwLock::new(HashMap::new()) }
    }

    /// Register a handler for `op_name`. Fails if one is already registered —
    /// registration conflicts are a startup bug, never resolved by last-write-wins.
    pub fn register(
        &self,
        op_name: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistryError> {
        let op_name = op_name.into();
        let mut guard = self.handlers.write().expect("handler registry lock poisoned");
        if guard.contains_key(&op_name) {
            return Err(RegistryError { op_name });
        }
        guard.insert(op_name, handler);
        Ok(())
    }

    pub fn get(&self, op_name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.read().expect("handler registry lock poisoned").get(op_name).cloned()
    }

    /// Registered op names, sorted for deterministic diagnostics/tests.
    pub fn op_names(&self) -> Vec<String> {
        let guard = self.handlers.read().expect("handler registry lock poisoned");
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_handler() -> Arc<dyn Handler> {
        Arc::new(JsonHandler::new(
            "test.echo",
            OpClass::Query,
            |req: String, _cancel: CancellationToken| async move { Ok(req) },
        ))
    }

    #[tokio::test]
    async fn registers_and_dispatches() {
        let registry = HandlerRegistry::new();
        registry.register("test.echo", echo_handler()).unwrap();

        let handler = registry.get("test.echo").expect("handler present");
        let payload = encode_json_payload(&"hello".to_string());
        let result = handler.invoke(&payload, CancellationToken::new()).await.unwrap();
        let decoded: String = decode_json_payload("test.echo", &result).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let registry = HandlerRegistry::new();
        registry.register("test.echo", echo_handler()).unwrap();
        let err = registry.register("test.echo", echo_handler()).unwrap_err();
        assert_eq!(err.op_name, "test.echo");
    }

    #[test]
    fn unknown_op_is_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn op_names_are_sorted() {
        let registry = HandlerRegistry::new();
        registry.register("zeta.op", echo_handler()).unwrap();
        registry.register("alpha.op", echo_handler()).unwrap();
        assert_eq!(registry.op_names(), vec!["alpha.op".to_string(), "zeta.op".to_string()]);
    }
}
