//! Runs in its own test binary: the trust store comes from `SSL_CERT_FILE`,
//! which is process-wide.

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::ssl::{Ssl, SslAcceptor, SslMethod};
use openssl::x509::{X509NameBuilder, X509};
use sni_fetch::classify::{classify, format_line};
use sni_fetch::model::{CapabilityPolicy, NegotiatedVersion, TlsVersion};
use sni_fetch::probe::{HttpsProber, Prober};
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_openssl::SslStream;
use url::Url;

fn localhost_cert() -> (X509, PKey<openssl::pkey::Private>) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(7).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (builder.build(), key)
}

#[tokio::test]
async fn trusted_certificate_is_reported_verified() {
    let (cert, key) = localhost_cert();

    let mut pem = tempfile::NamedTempFile::new().unwrap();
    pem.write_all(&cert.to_pem().unwrap()).unwrap();
    pem.flush().unwrap();
    // Read when the connector loads its default verify paths.
    std::env::set_var("SSL_CERT_FILE", pem.path());

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    builder.set_private_key(&key).unwrap();
    builder.set_certificate(&cert).unwrap();
    let acceptor = builder.build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let Ok((tcp, _)) = listener.accept().await else {
            return;
        };
        let ssl = Ssl::new(acceptor.context()).unwrap();
        let mut stream = SslStream::new(ssl, tcp).unwrap();
        if Pin::new(&mut stream).accept().await.is_err() {
            return;
        }
        let mut buf = vec![0u8; 4096];
        let mut read = 0;
        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf[read..]).await {
                Ok(0) | Err(_) => return,
                Ok(n) => read += n,
            }
        }
        let _ = stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
            .await;
        let _ = stream.shutdown().await;
    });

    let policy = CapabilityPolicy::new(
        false,
        TlsVersion::Tls12,
        TlsVersion::Tls13,
        Duration::from_secs(5),
    )
    .unwrap();
    let prober = HttpsProber::new(Arc::new(policy)).unwrap();
    let url = Url::parse(&format!("https://localhost:{port}/")).unwrap();

    let result = prober.probe(&url).await.unwrap();
    assert!(result.available);
    assert!(result.tls_verified());
    assert_eq!(
        result.tls_version(),
        Some(&NegotiatedVersion::Known(TlsVersion::Tls13))
    );

    let subnet = "127.0.0.0/8".parse().unwrap();
    let line = format_line("localhost", &classify(&result, &subnet, false));
    assert_eq!(line, "localhost: tls1.3");
}
