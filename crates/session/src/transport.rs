//! Device transport
//!
//! The session needs exactly three things from a transport: open a
//! subscription, read the next frame, close. `SubscribeTransport` /
//! `FrameStream` capture that seam; `GrpcTransport` is the tonic-backed
//! implementation, and tests substitute scripted doubles.

use std::time::Duration;

use async_trait::async_trait;
use gtel_proto::gnmi;
use gtel_proto::gnmi::g_nmi_client::GNmiClient;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Certificate, ClientTlsConfig, Endpoint};
use tonic::{Request, Streaming};

use crate::error::TransportError;
use crate::spec::SubscriptionSpec;

/// Channel establishment timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP keep-alive probe interval on the device channel
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Request-stream buffer; holds the initial subscribe plus pending polls
const REQUEST_BUFFER: usize = 4;

/// One inbound frame from the device
#[derive(Debug, Clone)]
pub enum Frame {
    /// A notification carrying one or more path/value updates
    Notification(gnmi::Notification),

    /// The initial full-state dump (or a poll snapshot) is complete
    SyncResponse,
}

/// Inbound side of an open subscription
#[async_trait]
pub trait FrameStream: Send {
    /// Read the next frame
    ///
    /// Blocks until a frame arrives; this blocking read is what lets the
    /// protocol's flow control throttle the device when gtel falls behind.
    /// `Ok(None)` means the device ended the stream.
    async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError>;

    /// Request one snapshot on a POLL subscription
    async fn request_poll(&mut self) -> Result<(), TransportError>;

    /// Release the transport
    async fn close(&mut self);
}

/// Factory for subscription streams
#[async_trait]
pub trait SubscribeTransport: Send + 'static {
    type Stream: FrameStream + 'static;

    /// Open the channel and send the subscribe request
    async fn open(&mut self, spec: &SubscriptionSpec) -> Result<Self::Stream, TransportError>;
}

/// Build the initial SubscribeRequest for a spec
///
/// Sample and heartbeat intervals go on the wire in nanoseconds.
pub fn build_subscribe_request(spec: &SubscriptionSpec) -> gnmi::SubscribeRequest {
    let subscriptions = spec
        .paths
        .iter()
        .map(|path| gnmi::Subscription {
            path: Some(path.to_wire()),
            mode: spec.stream_mode.to_wire() as i32,
            sample_interval: spec
                .sample_interval
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
            suppress_redundant: false,
            heartbeat_interval: spec
                .heartbeat_interval
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
        })
        .collect();

    gnmi::SubscribeRequest {
        request: Some(gnmi::subscribe_request::Request::Subscribe(
            gnmi::SubscriptionList {
                prefix: None,
                subscription: subscriptions,
                mode: spec.mode.to_wire() as i32,
                encoding: spec.encoding.to_wire() as i32,
                updates_only: false,
            },
        )),
    }
}

/// tonic-backed gNMI transport
///
/// Stateless: everything needed to open a subscription lives in the spec,
/// so reconnects cannot drift from the original request.
#[derive(Debug, Default)]
pub struct GrpcTransport;

impl GrpcTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_endpoint(spec: &SubscriptionSpec) -> Result<Endpoint, TransportError> {
        let scheme = if spec.tls.is_some() { "https" } else { "http" };
        let uri = format!("{scheme}://{}", spec.address);

        let mut endpoint = Endpoint::from_shared(uri)
            .map_err(|source| TransportError::InvalidEndpoint {
                address: spec.address.clone(),
                source,
            })?
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(Some(TCP_KEEPALIVE));

        if let Some(tls) = &spec.tls {
            let mut tls_config =
                ClientTlsConfig::new().ca_certificate(Certificate::from_pem(&tls.ca_pem));
            if let Some(name) = &tls.server_name {
                tls_config = tls_config.domain_name(name.clone());
            }
            endpoint = endpoint
                .tls_config(tls_config)
                .map_err(TransportError::Connect)?;
        }

        Ok(endpoint)
    }
}

#[async_trait]
impl SubscribeTransport for GrpcTransport {
    type Stream = GrpcStream;

    async fn open(&mut self, spec: &SubscriptionSpec) -> Result<GrpcStream, TransportError> {
        let endpoint = Self::build_endpoint(spec)?;
        let channel = endpoint.connect().await.map_err(TransportError::Connect)?;
        let mut client = GNmiClient::new(channel);

        let (requests, receiver) = mpsc::channel(REQUEST_BUFFER);
        // The buffer is empty here, so the initial subscribe cannot block.
        requests
            .send(build_subscribe_request(spec))
            .await
            .map_err(|_| TransportError::Closed)?;

        let mut request = Request::new(ReceiverStream::new(receiver));
        let metadata = request.metadata_mut();
        metadata.insert("username", ascii_value(&spec.credentials.username)?);
        metadata.insert("password", ascii_value(&spec.credentials.password)?);

        let inbound = client
            .subscribe(request)
            .await
            .map_err(TransportError::Subscribe)?
            .into_inner();

        Ok(GrpcStream {
            requests: Some(requests),
            inbound,
        })
    }
}

fn ascii_value(value: &str) -> Result<MetadataValue<Ascii>, TransportError> {
    value.parse().map_err(|_| TransportError::Credentials)
}

/// An open gNMI subscription over tonic
pub struct GrpcStream {
    /// Request-stream sender; dropping it half-closes the RPC
    requests: Option<mpsc::Sender<gnmi::SubscribeRequest>>,

    /// Inbound response stream
    inbound: Streaming<gnmi::SubscribeResponse>,
}

#[async_trait]
impl FrameStream for GrpcStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            match self.inbound.message().await {
                Ok(Some(response)) => match response.response {
                    Some(gnmi::subscribe_response::Response::Update(notification)) => {
                        return Ok(Some(Frame::Notification(notification)));
                    }
                    Some(gnmi::subscribe_response::Response::SyncResponse(true)) => {
                        return Ok(Some(Frame::SyncResponse));
                    }
                    // A false sync marker or an empty response carries nothing.
                    Some(gnmi::subscribe_response::Response::SyncResponse(false)) | None => {
                        continue;
                    }
                },
                Ok(None) => return Ok(None),
                Err(status) => return Err(TransportError::Read(status)),
            }
        }
    }

    async fn request_poll(&mut self) -> Result<(), TransportError> {
        let Some(requests) = &self.requests else {
            return Err(TransportError::Closed);
        };
        requests
            .send(gnmi::SubscribeRequest {
                request: Some(gnmi::subscribe_request::Request::Poll(gnmi::Poll {})),
            })
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.requests.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Credentials;
    use gtel_protocol::{Encoding, StreamMode, SubscribeMode};

    fn spec() -> SubscriptionSpec {
        SubscriptionSpec {
            device: "core1".into(),
            address: "10.0.0.1:57400".into(),
            credentials: Credentials {
                username: "telemetry".into(),
                password: "secret".into(),
            },
            tls: None,
            paths: vec![
                "/interfaces/interface[name=Gi0/0/0]/state/counters"
                    .parse()
                    .unwrap(),
            ],
            mode: SubscribeMode::Stream,
            stream_mode: StreamMode::Sample,
            sample_interval: Some(Duration::from_secs(30)),
            heartbeat_interval: None,
            encoding: Encoding::JsonIetf,
            max_connect_retries: 5,
        }
    }

    #[test]
    fn test_subscribe_request_wire_values() {
        let request = build_subscribe_request(&spec());

        let Some(gnmi::subscribe_request::Request::Subscribe(list)) = request.request else {
            panic!("expected subscription list");
        };
        assert_eq!(list.mode, gnmi::subscription_list::Mode::Stream as i32);
        assert_eq!(list.encoding, gnmi::Encoding::JsonIetf as i32);
        assert_eq!(list.subscription.len(), 1);

        let sub = &list.subscription[0];
        assert_eq!(sub.mode, gnmi::SubscriptionMode::Sample as i32);
        // 30s on the wire in nanoseconds
        assert_eq!(sub.sample_interval, 30_000_000_000);
        assert_eq!(sub.heartbeat_interval, 0);

        let path = sub.path.as_ref().unwrap();
        assert_eq!(path.elem.len(), 4);
        assert_eq!(path.elem[1].name, "interface");
    }

    #[test]
    fn test_subscribe_request_once_mode() {
        let mut once = spec();
        once.mode = SubscribeMode::Once;
        once.sample_interval = None;

        let request = build_subscribe_request(&once);
        let Some(gnmi::subscribe_request::Request::Subscribe(list)) = request.request else {
            panic!("expected subscription list");
        };
        assert_eq!(list.mode, gnmi::subscription_list::Mode::Once as i32);
        assert_eq!(list.subscription[0].sample_interval, 0);
    }

    #[test]
    fn test_build_endpoint_rejects_garbage() {
        let mut bad = spec();
        bad.address = "not a uri at all\u{0}".into();
        assert!(matches!(
            GrpcTransport::build_endpoint(&bad),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }
}
