use acsd::buffer::CommandBuffer;
use acsd::config::{AdmissionPolicy, BufferConfig};
use acsd::wire::{
    decode_json_payload, encode_json_payload, CancellationToken, Dispatcher, Envelope, Handler,
    HandlerRegistry, JsonHandler, OpClass,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn command_buffer_config(capacity: usize, query_concurrency: usize) -> BufferConfig {
    BufferConfig { capacity, query_concurrency, admission_policy: AdmissionPolicy::Block }
}

fn order_tracking_registry(next_expected: Arc<AtomicUsize>) -> Arc<HandlerRegistry> {
    let registry = HandlerRegistry::new();
    let handler: Arc<dyn Handler> = Arc::new(JsonHandler::<usize, bool, _>::new(
        "cmd.order",
        OpClass::CommandWithResult,
        move |index, _cancel| {
            let next_expected = next_expected.clone();
            async move {
                let expected = next_expected.fetch_add(1, Ordering::SeqCst);
                Ok(index == expected)
            }
        },
    ));
    registry.register("cmd.order", handler).unwrap();
    Arc::new(registry)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // P2 (per-tenant command order): for commands admitted to the same
    // tenant by the same caller, completion order follows admission order.
    #[test]
    fn per_tenant_commands_complete_in_admission_order(count in 2usize..12) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let next_expected = Arc::new(AtomicUsize::new(0));
            let registry = order_tracking_registry(next_expected);
            let buffer =
                Arc::new(CommandBuffer::new(command_buffer_config(count, 1), registry));

            let mut handles = Vec::with_capacity(count);
            for i in 0..count {
                let buffer = buffer.clone();
                let envelope = Envelope::new("cmd.order", encode_json_payload(&i), format!("c{i}"));
                handles.push(tokio::spawn(async move {
                    buffer.dispatch_envelope(envelope, CancellationToken::new()).await
                }));
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }

            for handle in handles {
                let reply = handle.await.unwrap();
                assert!(reply.success, "command failed: {}", reply.error_message);
                let completed_in_order: bool =
                    decode_json_payload("cmd.order", &reply.result_bytes).unwrap();
                assert!(completed_in_order, "command completed out of admission order");
            }
        });
    }

    // P6 (envelope round-trip): for any registered op and valid payload,
    // decode(reply.result_bytes) matches the handler's output and the reply
    // echoes the request's correlation id exactly.
    #[test]
    fn envelope_round_trips_arbitrary_payload_and_correlation_id(
        payload in ".{0,64}",
        correlation_id in ".{0,32}",
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let registry = HandlerRegistry::new();
            let handler: Arc<dyn Handler> = Arc::new(JsonHandler::<String, String, _>::new(
                "echo",
                OpClass::Query,
                |req, _cancel| async move { Ok(req) },
            ));
            registry.register("echo", handler).unwrap();
            let dispatcher = Dispatcher::new(Arc::new(registry));

            let envelope = Envelope::new("echo", encode_json_payload(&payload), correlation_id.clone());
            let reply = dispatcher.dispatch(envelope, CancellationToken::new()).await;

            assert!(reply.success);
            assert_eq!(reply.correlation_id, correlation_id);
            let decoded: String = decode_json_payload("echo", &reply.result_bytes).unwrap();
            assert_eq!(decoded, payload);
        });
    }
}
