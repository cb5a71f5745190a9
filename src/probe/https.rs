use super::reader::{parse_status_code, HeaderReader};
use super::resolver::resolve;
use super::Prober;
use crate::error::ProbeError;
use crate::model::{
    CapabilityPolicy, NegotiatedVersion, ProbeResult, TlsSession, TlsVersion,
    DEFAULT_RESOLVE_TIMEOUT,
};
use anyhow::Context;
use async_trait::async_trait;
use openssl::ssl::{SslConnector, SslMethod, SslRef, SslVerifyMode, SslVersion};
use openssl::x509::X509VerifyResult;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_openssl::SslStream;
use tracing::debug;
use url::{Host, Url};

const USER_AGENT: &str = concat!("sni-fetch/", env!("CARGO_PKG_VERSION"));
const MAX_HEADER_BYTES: usize = 16 * 1024;

const ALPN_H2_AND_HTTP11: &[u8] = b"\x02h2\x08http/1.1";
const ALPN_HTTP11: &[u8] = b"\x08http/1.1";

/// Probes `https://` URLs with one GET each. The TLS connector is built once
/// from the policy and shared by every probe.
pub struct HttpsProber {
    connector: SslConnector,
    policy: Arc<CapabilityPolicy>,
    resolve_timeout: Duration,
}

impl HttpsProber {
    pub fn new(policy: Arc<CapabilityPolicy>) -> anyhow::Result<Self> {
        Self::with_resolve_timeout(policy, DEFAULT_RESOLVE_TIMEOUT)
    }

    pub fn with_resolve_timeout(
        policy: Arc<CapabilityPolicy>,
        resolve_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let connector = build_connector(&policy)?;
        Ok(Self {
            connector,
            policy,
            resolve_timeout,
        })
    }

    async fn exchange(&self, url: &Url) -> Result<ProbeResult, ProbeError> {
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(ProbeError::Encoding {
                    host: url.to_string(),
                    reason: "URL has no host".into(),
                })
            }
        };
        let port = url.port_or_known_default().unwrap_or(443);

        let resolved = resolve(&host, port, self.resolve_timeout).await?;
        let tcp = TcpStream::connect(&resolved.addrs[..])
            .await
            .map_err(ProbeError::Connect)?;

        let ssl = self
            .connector
            .configure()
            .map_err(tls_error)?
            .into_ssl(&host)
            .map_err(tls_error)?;
        let mut stream = SslStream::new(ssl, tcp).map_err(tls_error)?;
        Pin::new(&mut stream).connect().await.map_err(tls_error)?;

        let session = tls_session(stream.ssl());
        let http2 = stream.ssl().selected_alpn_protocol() == Some(b"h2".as_slice());
        debug!(
            host = %host,
            version = stream.ssl().version_str(),
            verify = %stream.ssl().verify_result().error_string(),
            http2,
            "tls established"
        );

        let status = if http2 {
            http2_status(stream, url).await?
        } else {
            http1_status(&mut stream, url).await?
        };

        Ok(ProbeResult {
            available: true,
            http_status_ok: status == 200,
            resolved_addresses: resolved.ips,
            http2_negotiated: http2,
            tls: Some(session),
        })
    }
}

#[async_trait]
impl Prober for HttpsProber {
    fn name(&self) -> &'static str {
        "https"
    }

    async fn probe(&self, url: &Url) -> Result<ProbeResult, ProbeError> {
        match timeout(self.policy.timeout(), self.exchange(url)).await {
            Ok(res) => res,
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

fn build_connector(policy: &CapabilityPolicy) -> anyhow::Result<SslConnector> {
    let mut builder =
        SslConnector::builder(SslMethod::tls()).context("failed to create TLS connector")?;
    builder
        .set_min_proto_version(Some(ssl_version(policy.min_tls())))
        .context("failed to set minimum TLS version")?;
    builder
        .set_max_proto_version(Some(ssl_version(policy.max_tls())))
        .context("failed to set maximum TLS version")?;
    if policy.min_tls() < TlsVersion::Tls12 {
        // OpenSSL 3 refuses TLS 1.0/1.1 above security level 0.
        builder
            .set_cipher_list("DEFAULT:@SECLEVEL=0")
            .context("failed to relax cipher security level")?;
    }
    // The chain is still checked against the default trust store; the result
    // is read back after the handshake instead of failing it.
    builder.set_verify(SslVerifyMode::NONE);
    let alpn = if policy.allow_http2() {
        ALPN_H2_AND_HTTP11
    } else {
        ALPN_HTTP11
    };
    builder
        .set_alpn_protos(alpn)
        .context("failed to set ALPN protocols")?;
    Ok(builder.build())
}

fn ssl_version(version: TlsVersion) -> SslVersion {
    match version {
        TlsVersion::Tls10 => SslVersion::TLS1,
        TlsVersion::Tls11 => SslVersion::TLS1_1,
        TlsVersion::Tls12 => SslVersion::TLS1_2,
        TlsVersion::Tls13 => SslVersion::TLS1_3,
    }
}

fn tls_session(ssl: &SslRef) -> TlsSession {
    let version = match ssl.version2() {
        Some(v) if v == SslVersion::TLS1 => NegotiatedVersion::Known(TlsVersion::Tls10),
        Some(v) if v == SslVersion::TLS1_1 => NegotiatedVersion::Known(TlsVersion::Tls11),
        Some(v) if v == SslVersion::TLS1_2 => NegotiatedVersion::Known(TlsVersion::Tls12),
        Some(v) if v == SslVersion::TLS1_3 => NegotiatedVersion::Known(TlsVersion::Tls13),
        _ => NegotiatedVersion::Unrecognized(ssl.version_str().to_string()),
    };
    TlsSession {
        version,
        verified: ssl.verify_result() == X509VerifyResult::OK,
    }
}

fn tls_error(err: impl Display) -> ProbeError {
    ProbeError::TlsHandshake(err.to_string())
}

fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

async fn http1_status<S>(stream: &mut S, url: &Url) -> Result<u16, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {USER_AGENT}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
        request_target(url),
        authority(url),
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(ProbeError::Io)?;

    let head = HeaderReader::new(MAX_HEADER_BYTES)
        .read(stream)
        .await
        .map_err(ProbeError::Io)?;
    parse_status_code(&head).ok_or_else(|| {
        let first_line = String::from_utf8_lossy(&head)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        ProbeError::Protocol(format!("no HTTP status line in {first_line:?}"))
    })
}

async fn http2_status<S>(stream: S, url: &Url) -> Result<u16, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (client, connection) = h2::client::handshake(stream).await.map_err(h2_error)?;
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!(error = %err, "http2 connection closed");
        }
    });

    let status = async {
        let mut client = client.ready().await.map_err(h2_error)?;
        let request = http::Request::get(url.as_str())
            .header(http::header::USER_AGENT, USER_AGENT)
            .body(())
            .map_err(|err| ProbeError::Protocol(err.to_string()))?;
        let (response, _) = client.send_request(request, true).map_err(h2_error)?;
        let response = response.await.map_err(h2_error)?;
        Ok(response.status().as_u16())
    }
    .await;

    driver.abort();
    status
}

fn h2_error(err: h2::Error) -> ProbeError {
    if err.is_io() {
        if let Some(io) = err.into_io() {
            return ProbeError::Io(io);
        }
        return ProbeError::Protocol("http2 I/O failure".into());
    }
    ProbeError::Protocol(err.to_string())
}
