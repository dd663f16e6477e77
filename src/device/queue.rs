use std::sync::Arc;
use log::{debug, info};
use tokio::spawn;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use crate::device::constants::OPERATION_QUEUE_CAPACITY;
use crate::device::relay::StatusRelay;
use crate::device::transport::Link;
use crate::device::types::{DeviceEvent, GattRequest, OperationKind, OperationOutcome, RequestId};
use crate::error::DeviceError;

struct QueuedOperation {
    request: GattRequest,
    reply: oneshot::Sender<OperationOutcome>,
}

/// Resolves to the outcome of exactly one request.
#[derive(Debug)]
pub struct OperationHandle {
    request: GattRequest,
    receiver: oneshot::Receiver<OperationOutcome>,
}

impl OperationHandle {
    pub fn id(&self) -> RequestId {
        self.request.id
    }

    pub async fn wait(self) -> OperationOutcome {
        match self.receiver.await {
            Ok(outcome) => outcome,
            // the worker went away before getting to this request
            Err(_) => OperationOutcome::new(&self.request, Err(DeviceError::SessionClosed)),
        }
    }
}

/// Runs the GATT operations of one connection, one at a time, in the order they were queued.
pub struct OperationQueue {
    sender: mpsc::Sender<QueuedOperation>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl OperationQueue {
    pub fn start(link: Arc<dyn Link>, relay: StatusRelay, deadline: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(OPERATION_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        let handle = spawn(run_queue(cancel.clone(), link, relay, deadline, receiver));

        OperationQueue { sender, cancel, handle }
    }

    /// Waits for room in the queue, then queues the request.
    pub async fn push(&self, request: GattRequest) -> Result<OperationHandle, DeviceError> {
        let (reply, receiver) = oneshot::channel();

        self.sender.send(QueuedOperation { request: request.clone(), reply })
            .await
            .map_err(|_| DeviceError::SessionClosed)?;

        Ok(OperationHandle { request, receiver })
    }

    /// Stops the worker. The operation in flight is abandoned and queued requests resolve as closed.
    pub async fn close(self) {
        self.cancel.cancel();
        drop(self.sender);

        if let Err(err) = self.handle.await {
            debug!("Operation queue task ended abnormally: {:?}", err);
        }
    }
}

async fn execute(link: &dyn Link, request: &GattRequest, deadline: Duration) -> Result<Vec<u8>, DeviceError> {
    let characteristic = request.characteristic;

    let result = match request.kind {
        OperationKind::Read => {
            timeout(deadline, link.read(request.service, characteristic)).await
        },
        OperationKind::Write => {
            timeout(deadline, link.write(request.service, characteristic, &request.payload))
                .await
                .map(|result| result.map(|_| request.payload.clone()))
        },
    };

    match result {
        Err(_) => Err(DeviceError::Timeout { characteristic }),
        Ok(result) => result,
    }
}

async fn run_queue(
    cancel: CancellationToken,
    link: Arc<dyn Link>,
    relay: StatusRelay,
    deadline: Duration,
    mut receiver: mpsc::Receiver<QueuedOperation>,
) {
    'mainloop: loop {
        let operation = tokio::select! {
            _ = cancel.cancelled() => break 'mainloop,
            operation = receiver.recv() => match operation {
                Some(operation) => operation,
                None => break 'mainloop,
            },
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => break 'mainloop,
            result = execute(link.as_ref(), &operation.request, deadline) => result,
        };

        let outcome = OperationOutcome::new(&operation.request, result);
        relay.publish(DeviceEvent::Completed(outcome.clone()));

        // the caller may have dropped its handle
        let _ = operation.reply.send(outcome);
    }

    receiver.close();
    info!("Operation queue stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::constants::{make_uuid, DEVICE_CONFIG_SERVICE, DISPLAY_BRIGHT, NETWORK_SERVICE, TIME_ZONE};
    use crate::device::fake::{FakeOp, FakeTransport};
    use crate::device::types::OperationKind;

    fn request(id: u64, kind: OperationKind, service: &str, characteristic: &str, payload: &[u8]) -> GattRequest {
        GattRequest {
            id: RequestId(id),
            kind,
            service: make_uuid(service),
            characteristic: make_uuid(characteristic),
            payload: payload.to_vec(),
        }
    }

    #[tokio::test]
    async fn outcomes_match_their_requests() {
        let fake = FakeTransport::with_clock();
        fake.set_value(DISPLAY_BRIGHT, b"80");
        let queue = OperationQueue::start(fake.link(), StatusRelay::new(), Duration::from_secs(1));

        let write = queue.push(request(1, OperationKind::Write, NETWORK_SERVICE, TIME_ZONE, b"UTC")).await.unwrap();
        let read = queue.push(request(2, OperationKind::Read, DEVICE_CONFIG_SERVICE, DISPLAY_BRIGHT, b"")).await.unwrap();
        let read_back = queue.push(request(3, OperationKind::Read, NETWORK_SERVICE, TIME_ZONE, b"")).await.unwrap();

        let write = write.wait().await;
        assert_eq!(write.request, RequestId(1));
        assert_eq!(write.result.unwrap(), b"UTC".to_vec());

        let read = read.wait().await;
        assert_eq!(read.request, RequestId(2));
        assert_eq!(read.result.unwrap(), b"80".to_vec());

        // executed strictly in order, so the read sees the write
        assert_eq!(read_back.wait().await.result.unwrap(), b"UTC".to_vec());

        assert_eq!(fake.operations(), vec![
            FakeOp::Write { characteristic: make_uuid(TIME_ZONE), value: b"UTC".to_vec(), without_response: false },
            FakeOp::Read { characteristic: make_uuid(DISPLAY_BRIGHT) },
            FakeOp::Read { characteristic: make_uuid(TIME_ZONE) },
        ]);

        queue.close().await;
    }

    #[tokio::test]
    async fn failures_are_reported_per_request() {
        let fake = FakeTransport::with_clock();
        fake.reject_writes();
        let queue = OperationQueue::start(fake.link(), StatusRelay::new(), Duration::from_secs(1));

        let missing = queue.push(request(1, OperationKind::Read, DEVICE_CONFIG_SERVICE, TIME_ZONE, b"")).await.unwrap();
        let rejected = queue.push(request(2, OperationKind::Write, NETWORK_SERVICE, TIME_ZONE, b"UTC")).await.unwrap();

        assert!(matches!(
            missing.wait().await.result,
            Err(DeviceError::CharacteristicNotFound { characteristic }) if characteristic == make_uuid(TIME_ZONE)
        ));
        assert!(matches!(rejected.wait().await.result, Err(DeviceError::WriteRejected { .. })));

        queue.close().await;
    }

    #[tokio::test]
    async fn slow_operation_times_out() {
        let fake = FakeTransport::with_clock();
        fake.stall_reads();
        let queue = OperationQueue::start(fake.link(), StatusRelay::new(), Duration::from_millis(20));

        let read = queue.push(request(1, OperationKind::Read, DEVICE_CONFIG_SERVICE, DISPLAY_BRIGHT, b"")).await.unwrap();

        assert!(matches!(read.wait().await.result, Err(DeviceError::Timeout { .. })));
        queue.close().await;
    }

    #[tokio::test]
    async fn closing_resolves_pending_requests() {
        let fake = FakeTransport::with_clock();
        fake.stall_reads();
        let queue = OperationQueue::start(fake.link(), StatusRelay::new(), Duration::from_secs(60));

        let first = queue.push(request(1, OperationKind::Read, DEVICE_CONFIG_SERVICE, DISPLAY_BRIGHT, b"")).await.unwrap();
        let second = queue.push(request(2, OperationKind::Read, NETWORK_SERVICE, TIME_ZONE, b"")).await.unwrap();

        queue.close().await;

        assert!(matches!(first.wait().await.result, Err(DeviceError::SessionClosed)));
        assert!(matches!(second.wait().await.result, Err(DeviceError::SessionClosed)));
    }

    #[tokio::test]
    async fn completions_are_published() {
        let fake = FakeTransport::with_clock();
        fake.set_value(DISPLAY_BRIGHT, b"12");
        let relay = StatusRelay::new();
        let mut subscriber = relay.subscribe();
        let queue = OperationQueue::start(fake.link(), relay, Duration::from_secs(1));

        let read = queue.push(request(9, OperationKind::Read, DEVICE_CONFIG_SERVICE, DISPLAY_BRIGHT, b"")).await.unwrap();
        read.wait().await;

        match subscriber.next().await {
            Some(DeviceEvent::Completed(outcome)) => assert_eq!(outcome.request, RequestId(9)),
            other => panic!("unexpected event {:?}", other),
        }

        queue.close().await;
    }
}
