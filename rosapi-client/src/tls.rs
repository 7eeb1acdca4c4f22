//! TLS connector construction.
//!
//! Certificate verification is on by default. The `insecure` option
//! reproduces the posture of historical API clients (no verification, to
//! interoperate with self-signed device certificates) and must be enabled
//! explicitly; using it is logged with a warning.

use crate::config::TlsOptions;
use crate::error::ClientError;
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::RootCertStore;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsConnector;

/// Builds the connector and SNI name for a connection to `host`.
pub(crate) fn connector(
    opts: &TlsOptions,
    host: &str,
) -> Result<(TlsConnector, ServerName<'static>), ClientError> {
    if opts.insecure {
        tracing::warn!("TLS certificate verification disabled; connection can be intercepted");
        return insecure_connector(opts, host);
    }

    let root_store = if let Some(ref ca_path) = opts.ca_cert_path {
        let certs = load_certs(ca_path)?;
        let mut store = RootCertStore::empty();
        for cert in certs {
            store
                .add(cert)
                .map_err(|e| ClientError::TlsConfig(format!("invalid CA cert: {}", e)))?;
        }
        store
    } else {
        let mut store = RootCertStore::empty();
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        store
    };

    let client_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(client_config));
    Ok((connector, server_name(opts, host)?))
}

/// Connector that accepts any server certificate.
fn insecure_connector(
    opts: &TlsOptions,
    host: &str,
) -> Result<(TlsConnector, ServerName<'static>), ClientError> {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::pki_types::UnixTime;
    use rustls::DigitallySignedStruct;

    #[derive(Debug)]
    struct AcceptAnyCert;

    impl ServerCertVerifier for AcceptAnyCert {
        fn verify_server_cert(
            &self,
            _: &CertificateDer<'_>,
            _: &[CertificateDer<'_>],
            _: &ServerName<'_>,
            _: &[u8],
            _: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _: &[u8],
            _: &CertificateDer<'_>,
            _: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _: &[u8],
            _: &CertificateDer<'_>,
            _: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            vec![
                rustls::SignatureScheme::RSA_PKCS1_SHA256,
                rustls::SignatureScheme::RSA_PKCS1_SHA384,
                rustls::SignatureScheme::RSA_PKCS1_SHA512,
                rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
                rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
                rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
                rustls::SignatureScheme::RSA_PSS_SHA256,
                rustls::SignatureScheme::RSA_PSS_SHA384,
                rustls::SignatureScheme::RSA_PSS_SHA512,
                rustls::SignatureScheme::ED25519,
            ]
        }
    }

    let client_config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(client_config));
    Ok((connector, server_name(opts, host)?))
}

fn server_name(opts: &TlsOptions, host: &str) -> Result<ServerName<'static>, ClientError> {
    let name = opts.server_name.as_deref().unwrap_or(host);
    ServerName::try_from(name.to_string())
        .map_err(|_| ClientError::TlsConfig(format!("invalid server name: {}", name)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ClientError> {
    let file = File::open(path)
        .map_err(|e| ClientError::TlsConfig(format!("cannot open cert file {:?}: {}", path, e)))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<_> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|e| ClientError::TlsConfig(format!("invalid cert file {:?}: {}", path, e)))?;

    if certs.is_empty() {
        return Err(ClientError::TlsConfig(format!(
            "no certificates found in {:?}",
            path
        )));
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_cert_file() {
        let result = load_certs(Path::new("/nonexistent/cert.pem"));
        assert!(matches!(result, Err(ClientError::TlsConfig(ref msg)) if msg.contains("cannot open")));
    }

    #[test]
    fn test_load_cert_file_without_certs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a pem file").unwrap();

        let result = load_certs(file.path());
        assert!(
            matches!(result, Err(ClientError::TlsConfig(ref msg)) if msg.contains("no certificates"))
        );
    }

    #[test]
    fn test_server_name_defaults_to_host() {
        let opts = TlsOptions::default();
        assert!(server_name(&opts, "router.lan").is_ok());
        // IP addresses are legal server names too.
        assert!(server_name(&opts, "192.168.88.1").is_ok());
    }

    #[test]
    fn test_server_name_override() {
        let opts = TlsOptions {
            server_name: Some("device.example".to_string()),
            ..Default::default()
        };
        let name = server_name(&opts, "10.0.0.1").unwrap();
        assert!(matches!(name, ServerName::DnsName(_)));
    }

    #[test]
    fn test_invalid_server_name() {
        let opts = TlsOptions {
            server_name: Some("bad name with spaces".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            server_name(&opts, "host"),
            Err(ClientError::TlsConfig(_))
        ));
    }

    #[test]
    fn test_insecure_connector_builds() {
        let opts = TlsOptions {
            insecure: true,
            ..Default::default()
        };
        assert!(connector(&opts, "192.168.88.1").is_ok());
    }

    #[test]
    fn test_default_connector_builds_with_system_roots() {
        let opts = TlsOptions::default();
        assert!(connector(&opts, "router.lan").is_ok());
    }
}
