use std::sync::Arc;

use anyhow::Result;
use rustls::pki_types::PrivatePkcs8KeyDer;

/// ALPN identifier the spec requires on the datagram transport (spec §6).
pub const ALPN: &[u8] = b"starbit-quic";

/// Generates a throwaway self-signed certificate and wraps it in a quinn
/// server config advertising the `starbit-quic` ALPN identifier. This is not
/// a trust boundary: clients are expected to skip verification.
pub fn build_server_config() -> Result<quinn::ServerConfig> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
    let cert_der = cert.cert.der().clone();
    let key_der = PrivatePkcs8KeyDer::from(cert.signing_key.serialize_der());

    let mut rustls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der.into())?;
    rustls_config.alpn_protocols = vec![ALPN.to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicServerConfig::try_from(rustls_config)?;
    Ok(quinn::ServerConfig::with_crypto(Arc::new(quic_crypto)))
}
