//! TLS credential and QUIC server configuration.

use std::sync::Arc;
use std::time::Duration;

use kon_proto::ALPN_PROTOCOL;
use quinn::crypto::rustls::QuicServerConfig;
use quinn::{TransportConfig, VarInt};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::error::TransportError;

/// Validity period of the generated certificate.
pub const CERT_VALIDITY_DAYS: i64 = 365;

/// Per-connection limit on concurrently open streams of each direction.
pub const MAX_CONCURRENT_STREAMS: u32 = 1000;

/// Keep-alive interval for agent connections.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// A self-signed certificate and its private key.
#[derive(Debug)]
pub struct SelfSignedCert {
    pub cert: CertificateDer<'static>,
    pub key: PrivatePkcs8KeyDer<'static>,
}

/// Generate an ECDSA P-256 certificate for `localhost`.
pub fn generate_self_signed() -> Result<SelfSignedCert, TransportError> {
    let mut params = CertificateParams::new(vec!["localhost".to_owned()])?;

    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, "localhost");
    name.push(DnType::OrganizationName, "Kon-Agent");
    params.distinguished_name = name;

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(CERT_VALIDITY_DAYS);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.is_ca = IsCa::ExplicitNoCa;

    let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
    let cert = params.self_signed(&key_pair)?;

    Ok(SelfSignedCert {
        cert: cert.der().clone(),
        key: PrivatePkcs8KeyDer::from(key_pair.serialize_der()),
    })
}

/// Build the QUIC server configuration: TLS 1.3 only, `kon-agent` ALPN.
pub fn server_config(credential: &SelfSignedCert) -> Result<quinn::ServerConfig, TransportError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut crypto = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_no_client_auth()
        .with_single_cert(
            vec![credential.cert.clone()],
            PrivateKeyDer::Pkcs8(credential.key.clone_key()),
        )?;
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let mut transport = TransportConfig::default();
    transport
        .max_concurrent_uni_streams(VarInt::from_u32(MAX_CONCURRENT_STREAMS))
        .max_concurrent_bidi_streams(VarInt::from_u32(MAX_CONCURRENT_STREAMS))
        .keep_alive_interval(Some(KEEP_ALIVE_INTERVAL));

    let crypto = QuicServerConfig::try_from(crypto)?;
    let mut config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
    config.transport_config(Arc::new(transport));
    Ok(config)
}
